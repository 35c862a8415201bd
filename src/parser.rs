//! Incremental, line-fed HTTP/1.0-or-1.1 request-line-and-header parser.
//!
//! The caller feeds one complete line (including its trailing `\r\n`) at a
//! time via [`Parser::feed_line`]. Each call reports what just happened:
//! [`Line::Request`], [`Line::Header`], [`Line::Error`], or [`Line::Other`],
//! never more than one request-line's worth of state per parser instance.

/// What a single fed line told the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Line {
    /// The request-line was just recognised; `METHOD`/`URI`/`PATH`/`HOST`/
    /// `PORT` may now be retrieved (subject to what the request-line and
    /// any `Host:` header seen so far provide).
    Request,
    /// One header line was consumed and is available from the header
    /// cursor.
    Header,
    /// The line was malformed for the parser's current state. Terminal:
    /// the handler must treat this request as unrecoverable.
    Error,
    /// Benign: a blank terminator or continuation line with no new field.
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    AwaitingRequestLine,
    AwaitingHeaders,
    Done,
    Errored,
}

/// Per-request parse state. Created at the start of a request, destroyed
/// before the handler returns.
#[derive(Debug)]
pub struct Parser {
    phase: Phase,
    method: Option<String>,
    uri: Option<String>,
    path: Option<String>,
    uri_host: Option<String>,
    uri_port: Option<String>,
    header_host: Option<String>,
    header_port: Option<String>,
    headers: Vec<(String, String)>,
    header_cursor: usize,
}

impl Parser {
    pub fn new() -> Self {
        Self {
            phase: Phase::AwaitingRequestLine,
            method: None,
            uri: None,
            path: None,
            uri_host: None,
            uri_port: None,
            header_host: None,
            header_port: None,
            headers: Vec::new(),
            header_cursor: 0,
        }
    }

    /// Feeds one line, including its trailing `\r\n`, into the state
    /// machine.
    pub fn feed_line(&mut self, line: &str) -> Line {
        match self.phase {
            Phase::Errored | Phase::Done => Line::Other,
            Phase::AwaitingRequestLine => self.feed_request_line(line),
            Phase::AwaitingHeaders => self.feed_header_line(line),
        }
    }

    fn feed_request_line(&mut self, line: &str) -> Line {
        let trimmed = line.trim_end_matches(['\r', '\n']);
        let mut parts = trimmed.split(' ').filter(|s| !s.is_empty());
        let (Some(method), Some(target), Some(version)) =
            (parts.next(), parts.next(), parts.next())
        else {
            self.phase = Phase::Errored;
            return Line::Error;
        };
        if parts.next().is_some() || !version.starts_with("HTTP/") {
            self.phase = Phase::Errored;
            return Line::Error;
        }

        match parse_target(target) {
            Some((path, host, port)) => {
                self.method = Some(method.to_string());
                self.uri = Some(target.to_string());
                self.path = Some(path);
                self.uri_host = host;
                self.uri_port = port;
                self.phase = Phase::AwaitingHeaders;
                Line::Request
            }
            None => {
                self.phase = Phase::Errored;
                Line::Error
            }
        }
    }

    fn feed_header_line(&mut self, line: &str) -> Line {
        let trimmed = line.trim_end_matches(['\r', '\n']);
        if trimmed.is_empty() {
            self.phase = Phase::Done;
            return Line::Other;
        }
        let Some((name, value)) = trimmed.split_once(':') else {
            self.phase = Phase::Errored;
            return Line::Error;
        };
        let name = name.trim().to_string();
        let value = value.trim().to_string();

        if name.eq_ignore_ascii_case("host") {
            let (host, port) = split_host_port(&value);
            self.header_host = Some(host);
            self.header_port = port;
        }

        self.headers.push((name, value));
        Line::Header
    }

    pub fn method(&self) -> Option<&str> {
        self.method.as_deref()
    }

    pub fn uri(&self) -> Option<&str> {
        self.uri.as_deref()
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn host(&self) -> Option<&str> {
        self.uri_host.as_deref().or(self.header_host.as_deref())
    }

    /// Defaults to `"80"` when no explicit port was observed anywhere.
    pub fn port(&self) -> &str {
        self.uri_port
            .as_deref()
            .or(self.header_port.as_deref())
            .unwrap_or("80")
    }

    /// Yields each remaining unread header once, in the order the client
    /// sent them.
    pub fn next_header(&mut self) -> Option<(&str, &str)> {
        let (name, value) = self.headers.get(self.header_cursor)?;
        self.header_cursor += 1;
        Some((name.as_str(), value.as_str()))
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

/// Splits a request target into `(path, host, port)`. Accepts absolute-form
/// (`http://host[:port]/path`) and origin-form (`/path`); for origin-form,
/// `host`/`port` are `None` and must come from a later `Host:` header.
fn parse_target(target: &str) -> Option<(String, Option<String>, Option<String>)> {
    if let Some(rest) = strip_scheme(target) {
        let (authority, path) = match rest.find('/') {
            Some(idx) => (&rest[..idx], rest[idx..].to_string()),
            None => (rest, "/".to_string()),
        };
        if authority.is_empty() {
            return None;
        }
        let (host, port) = split_host_port(authority);
        Some((path, Some(host), port))
    } else if target.starts_with('/') {
        Some((target.to_string(), None, None))
    } else {
        None
    }
}

fn strip_scheme(target: &str) -> Option<&str> {
    target
        .strip_prefix("http://")
        .or_else(|| target.strip_prefix("HTTP://"))
}

fn split_host_port(authority: &str) -> (String, Option<String>) {
    match authority.rsplit_once(':') {
        Some((host, port)) if !port.is_empty() && port.chars().all(|c| c.is_ascii_digit()) => {
            (host.to_string(), Some(port.to_string()))
        }
        _ => (authority.to_string(), None),
    }
}
