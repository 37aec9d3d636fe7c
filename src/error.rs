//! Error types for mtls-gate

use std::io;

use thiserror::Error;

/// Result type alias for mtls-gate
pub type Result<T> = std::result::Result<T, Error>;

/// mtls-gate errors
///
/// These cover startup and tooling paths only.  A bad client certificate is
/// never an `Error`: the validator absorbs every failure mode and surfaces a
/// plain `false` plus a log line, so a malformed certificate can reject a
/// request but never destabilize the process.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error (bad config file, TLS material, pinned identifier)
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
