//! Error types for the ferry core.

use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;

use hickory_proto::error::ProtoError;
use thiserror::Error;

/// Errors reported by a cache backend.
#[derive(Debug, Error)]
pub enum CacheError {
    /// A writer panicked while holding the table lock.
    #[error("cache lock poisoned")]
    Poisoned,

    /// The backing store rejected or failed the operation.
    #[error("cache backend error: {0}")]
    Backend(String),
}

/// Errors produced while forwarding a request upstream.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("DNS protocol error: {0}")]
    Proto(#[from] ProtoError),

    #[error("upstream {0} timed out")]
    Timeout(SocketAddr),

    #[error("upstream {0} answered SERVFAIL")]
    ServerFailure(SocketAddr),

    #[error("message of {0} bytes does not fit a length-prefixed frame")]
    MessageTooLarge(usize),

    #[error("no upstream servers configured")]
    NoUpstreams,
}

/// Construction-time configuration errors. These are fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid cache backend: {0}")]
    UnknownBackend(String),

    #[error("failed to read hosts file {path}: {source}")]
    Hosts {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid record type: {0}")]
    InvalidRecordType(String),
}
