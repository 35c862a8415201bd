//! Builds the outbound, origin-bound HTTP/1.0 request text.

use crate::error::{ProxyError, ProxyResult};
use crate::cache::MAXLINE;

pub const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:3.10.0) Gecko/20230411 Firefox/63.0.1";

/// Header names the rewriter never forwards verbatim. It emits its own
/// versions of `Host`, `Connection`, `Proxy-Connection`, and `User-Agent`.
const FILTERED: [&str; 4] = ["host", "connection", "proxy-connection", "user-agent"];

/// Accumulates the rewritten request into a buffer bounded by [`MAXLINE`].
pub struct Rewriter {
    buf: String,
}

impl Rewriter {
    /// Starts a new rewrite with the mandatory request-line and headers.
    pub fn new(host: &str, path: &str, port: &str) -> ProxyResult<Self> {
        let mut buf = String::with_capacity(MAXLINE);
        buf.push_str(&format!("GET {path} HTTP/1.0\r\n"));
        buf.push_str(&format!("Host: {host}:{port}\r\n"));
        buf.push_str(&format!("User-Agent: {USER_AGENT}\r\n"));
        buf.push_str("Connection: close\r\n");
        buf.push_str("Proxy-Connection: close\r\n");
        if buf.len() > MAXLINE {
            return Err(ProxyError::RequestTooLarge);
        }
        Ok(Self { buf })
    }

    /// Appends a client header unless its name matches one the rewriter
    /// already emits itself.
    pub fn add_header(&mut self, name: &str, value: &str) -> ProxyResult<()> {
        if FILTERED.iter().any(|f| name.eq_ignore_ascii_case(f)) {
            return Ok(());
        }
        let line = format!("{name}: {value}\r\n");
        if self.buf.len() + line.len() > MAXLINE {
            return Err(ProxyError::RequestTooLarge);
        }
        self.buf.push_str(&line);
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Terminates the request with the blank line and returns the finished
    /// text.
    pub fn finish(mut self) -> ProxyResult<String> {
        if self.buf.len() + 2 > MAXLINE {
            return Err(ProxyError::RequestTooLarge);
        }
        self.buf.push_str("\r\n");
        Ok(self.buf)
    }
}
