//! Crate-level error type.
//!
//! Each module keeps its own error enum next to the code that raises it.
//! `ClientError` is what the connection, the query client and the facade
//! return, with `From` conversions so `?` works across the seams.

use crate::config::ConfigError;
use crate::crypto::keys::KeyError;
use crate::network::envelope::MessageError;
use crate::transaction::TransactionError;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Key material failed to decode or had the wrong length. Not retried.
    #[error("invalid key: {0}")]
    InvalidKey(#[from] KeyError),

    /// `connect()` did not reach `Ready` in time.
    #[error("handshake did not complete within {timeout_ms} ms")]
    HandshakeTimeout { timeout_ms: u64 },

    /// Socket-level failure.
    #[error("connection error: {0}")]
    Connection(String),

    /// Send attempted while the socket is not open (or, for transactions,
    /// while the handshake is not complete).
    #[error("not connected")]
    NotConnected,

    #[error(transparent)]
    MalformedTransaction(#[from] TransactionError),

    #[error(transparent)]
    MalformedMessage(#[from] MessageError),

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// The query endpoint answered, but not with something we understand.
    #[error("query failed: {0}")]
    Query(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The connection driver task has exited.
    #[error("connection driver has shut down")]
    Shutdown,
}

pub type Result<T> = std::result::Result<T, ClientError>;
