//! Emits a well-formed HTTP/1.0 error reply with a minimal HTML body.

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::warn;

use crate::cache::MAXLINE;

/// Bound on the rendered error body; mirrors the scratch-buffer bound the
/// source gives `clienterror`'s body buffer.
const MAXBUF: usize = 8192;

/// Writes `HTTP/1.0 <code> <short>` with a `Content-Length`-terminated
/// HTML body to `writer`. If either the status line or the body would
/// overflow its buffer, the write is aborted silently. The caller's
/// connection will simply be closed with nothing sent.
pub async fn client_error<W: AsyncWrite + Unpin>(
    writer: &mut W,
    code: &str,
    short: &str,
    long: &str,
) {
    let body = format!(
        "<!DOCTYPE html>\r\n\
         <html>\r\n\
         <head><title>Proxy Error</title></head>\r\n\
         <body bgcolor=\"ffffff\">\r\n\
         <h1>{code}: {short}</h1>\r\n\
         <p>{long}</p>\r\n\
         <hr /><em>The Proxy Web server</em>\r\n\
         </body></html>\r\n"
    );
    if body.len() >= MAXBUF {
        return;
    }

    let header = format!(
        "HTTP/1.0 {code} {short}\r\n\
         Content-Type: text/html\r\n\
         Content-Length: {}\r\n\r\n",
        body.len()
    );
    if header.len() >= MAXLINE {
        return;
    }

    if let Err(e) = writer.write_all(header.as_bytes()).await {
        warn!("error writing error response headers to client: {e}");
        return;
    }
    if let Err(e) = writer.write_all(body.as_bytes()).await {
        warn!("error writing error response body to client: {e}");
    }
}
