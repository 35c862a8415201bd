//! Concurrent, caching HTTP/1.0 forward proxy.
//!
//! See [`cache`] for the shared LRU store, [`parser`] for the incremental
//! request parser, [`rewriter`] for outbound request construction, [`io`]
//! for buffered socket I/O, and [`handler`] for the per-connection pipeline
//! that ties them together.

pub mod cache;
pub mod error;
pub mod handler;
pub mod io;
pub mod parser;
pub mod responder;
pub mod rewriter;

pub use cache::{Cache, Insert, MAXLINE, MAX_CACHE_SIZE, MAX_OBJECT_SIZE};
pub use error::{ProxyError, ProxyResult};
pub use handler::handle_connection;
