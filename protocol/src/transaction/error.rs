//! Error type for transaction encoding and decoding.

use thiserror::Error;

/// Failures raised by the transaction codec.
///
/// Decode failures are local to the call that hit them. The router reports
/// them and carries on with the next frame.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransactionError {
    /// The input does not describe a well-formed transaction: truncated,
    /// unknown enum byte, stray trailing bytes, or a JSON shape mismatch.
    #[error("malformed transaction: {0}")]
    Malformed(String),

    /// The transaction cannot be represented in the wire format (a count or
    /// the data length does not fit in 32 bits).
    #[error("transaction encoding failed: {0}")]
    Encoding(String),
}
