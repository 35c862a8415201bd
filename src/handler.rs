//! The per-connection request-handling pipeline (parse → cache lookup →
//! origin fetch → stream back → maybe cache).

use std::net::SocketAddr;

use bytes::Bytes;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

use crate::cache::{Cache, Insert, MAXLINE, MAX_OBJECT_SIZE};
use crate::io::{write_all, LineReader};
use crate::parser::{Line, Parser};
use crate::responder::client_error;
use crate::rewriter::Rewriter;

/// Drives one accepted client connection end to end. Every exit path closes
/// the client connection on return (the caller owns the `TcpStream` and
/// drops it); the origin connection, when opened, is closed when this
/// function returns.
pub async fn handle_connection(client: TcpStream, peer: SocketAddr, cache: Cache) {
    info!(%peer, "accepted connection");

    let (client_read, mut client_write) = client.into_split();
    let mut reader = LineReader::new(client_read);
    let mut parser = Parser::new();

    let mut key: Option<String> = None;
    let mut origin: Option<TcpStream> = None;
    let mut rewriter: Option<Rewriter> = None;

    loop {
        let line = match reader.read_line(MAXLINE).await {
            Ok(line) => line,
            Err(e) => {
                warn!(%peer, "client read error: {e}");
                return;
            }
        };
        if line.is_empty() || line == b"\r\n" {
            break;
        }
        let line = String::from_utf8_lossy(&line).into_owned();

        match parser.feed_line(&line) {
            Line::Error => {
                client_error(
                    &mut client_write,
                    "400",
                    "Bad Request",
                    "Proxy received a malformed request",
                )
                .await;
                return;
            }
            Line::Request => {
                let Some(method) = parser.method() else {
                    client_error(
                        &mut client_write,
                        "400",
                        "Bad Request",
                        "Proxy received a malformed request",
                    )
                    .await;
                    return;
                };
                if method != "GET" {
                    client_error(
                        &mut client_write,
                        "501",
                        "Not Implemented",
                        "Proxy does not implement this method",
                    )
                    .await;
                    return;
                }
                let Some(uri) = parser.uri() else {
                    client_error(
                        &mut client_write,
                        "400",
                        "Bad Request",
                        "Proxy received a malformed request",
                    )
                    .await;
                    return;
                };
                let uri = uri.to_string();

                if let Some(cached) = cache.lookup(&uri).await {
                    debug!(%peer, %uri, "cache hit");
                    let _ = write_all(&mut client_write, &cached).await;
                    return;
                }
                debug!(%peer, %uri, "cache miss");
                key = Some(uri);

                let path = parser.path().map(str::to_owned);
                let host = parser.host().map(str::to_owned);
                let (Some(path), Some(host)) = (path, host) else {
                    client_error(
                        &mut client_write,
                        "400",
                        "Bad Request",
                        "Proxy received a malformed request",
                    )
                    .await;
                    return;
                };
                let port = parser.port().to_string();

                let port_num: u16 = port.parse().unwrap_or(80);
                match TcpStream::connect((host.as_str(), port_num)).await {
                    Ok(stream) => origin = Some(stream),
                    Err(e) => {
                        warn!(%peer, %host, "failed to connect to origin: {e}");
                        return;
                    }
                }

                match Rewriter::new(&host, &path, &port) {
                    Ok(r) => rewriter = Some(r),
                    Err(_) => {
                        client_error(
                            &mut client_write,
                            "400",
                            "Bad Request",
                            "Proxy received a malformed request",
                        )
                        .await;
                        return;
                    }
                }
            }
            Line::Header => {
                if let Some(r) = rewriter.as_mut() {
                    while let Some((name, value)) = parser.next_header() {
                        if r.add_header(name, value).is_err() {
                            client_error(
                                &mut client_write,
                                "400",
                                "Bad Request",
                                "Proxy received a malformed request",
                            )
                            .await;
                            return;
                        }
                    }
                }
            }
            Line::Other => {}
        }
    }

    let Some(rewriter) = rewriter else {
        client_error(
            &mut client_write,
            "400",
            "Bad Request",
            "Proxy received a malformed request",
        )
        .await;
        return;
    };
    if rewriter.is_empty() {
        client_error(
            &mut client_write,
            "400",
            "Bad Request",
            "Proxy received a malformed request",
        )
        .await;
        return;
    }
    let request_text = match rewriter.finish() {
        Ok(text) => text,
        Err(_) => {
            client_error(
                &mut client_write,
                "400",
                "Bad Request",
                "Proxy received a malformed request",
            )
            .await;
            return;
        }
    };

    let Some(mut origin) = origin else {
        return;
    };
    if let Err(e) = origin.write_all(request_text.as_bytes()).await {
        warn!("failed to forward request to origin: {e}");
        return;
    }

    let (origin_read, _origin_write) = origin.into_split();
    let mut origin_reader = LineReader::new(origin_read);
    let mut staging: Vec<u8> = Vec::new();
    let mut total: usize = 0;

    loop {
        let chunk = match origin_reader.read_n(MAXLINE).await {
            Ok(chunk) => chunk,
            Err(e) => {
                warn!("error reading from origin: {e}");
                break;
            }
        };
        if chunk.is_empty() {
            break;
        }
        if let Err(e) = write_all(&mut client_write, &chunk).await {
            warn!("error writing to client: {e}");
            return;
        }
        if total < MAX_OBJECT_SIZE {
            let room = MAX_OBJECT_SIZE - total;
            let take = chunk.len().min(room);
            staging.extend_from_slice(&chunk[..take]);
        }
        total += chunk.len();
    }

    if let Some(key) = key {
        if total <= MAX_OBJECT_SIZE {
            match cache.insert(key, Bytes::from(staging), total).await {
                Insert::Inserted => debug!("cached {total} bytes"),
                Insert::Duplicate => {}
                Insert::TooLarge => {}
            }
        }
    }
}
