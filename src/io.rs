//! Buffered, read-side-only byte I/O over an async byte-stream endpoint.
//!
//! Mirrors the source's `rio_readlineb`/`rio_readnb`/`rio_writen` trio:
//! short reads from the OS are stitched together internally, and the two
//! read methods below are safe to use independently over the client-side
//! and origin-side halves of a connection within the same worker. A
//! signal-induced restartable read (`EINTR`) has no surface here: tokio's
//! runtime already retries it below the `AsyncRead` abstraction.

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Read-buffered wrapper around one half of a byte stream.
pub struct LineReader<R> {
    inner: R,
    buf: BytesMut,
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(4096),
        }
    }

    /// Returns up to `max` bytes ending at and including the first `\n`
    /// found, or fewer at EOF.
    pub async fn read_line(&mut self, max: usize) -> std::io::Result<Vec<u8>> {
        loop {
            if let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
                let take = (pos + 1).min(max);
                return Ok(self.buf.split_to(take).to_vec());
            }
            if self.buf.len() >= max {
                return Ok(self.buf.split_to(max).to_vec());
            }

            let mut chunk = [0u8; 512];
            let n = self.inner.read(&mut chunk).await?;
            if n == 0 {
                let take = self.buf.len().min(max);
                return Ok(self.buf.split_to(take).to_vec());
            }
            self.buf.extend_from_slice(&chunk[..n]);
        }
    }

    /// Returns exactly `n` bytes, or fewer only at EOF.
    pub async fn read_n(&mut self, n: usize) -> std::io::Result<Vec<u8>> {
        while self.buf.len() < n {
            let mut chunk = [0u8; 4096];
            let read = self.inner.read(&mut chunk).await?;
            if read == 0 {
                break;
            }
            self.buf.extend_from_slice(&chunk[..read]);
        }
        let take = self.buf.len().min(n);
        Ok(self.buf.split_to(take).to_vec())
    }
}

/// Writes every byte of `buf`, resuming on short writes. A peer that reset
/// the connection surfaces as an `io::Error` (`BrokenPipe` or
/// `ConnectionReset`) rather than terminating the process.
pub async fn write_all<W: AsyncWrite + Unpin>(writer: &mut W, buf: &[u8]) -> std::io::Result<()> {
    writer.write_all(buf).await
}
