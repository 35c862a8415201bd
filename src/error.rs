//! Error types shared across the proxy's request-handling pipeline.

use thiserror::Error;

/// Failure modes a single connection's handling can hit.
///
/// Every variant is scoped to the worker that produced it: the acceptor
/// never exits because a handler returned one of these, and the cache never
/// exits because an insert was rejected.
#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("malformed request")]
    Parse,

    #[error("unsupported method: {0}")]
    MethodUnsupported(String),

    #[error("failed to connect to origin: {0}")]
    UpstreamConnect(#[source] std::io::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("rewritten request exceeds MAXLINE")]
    RequestTooLarge,
}

pub type ProxyResult<T> = Result<T, ProxyError>;
