//! The wire envelope: `{"request": <tag>, "data": <payload>}`.
//!
//! Every frame on the socket, in either direction, is one JSON envelope. The
//! tag decides where the payload goes; the payload itself is left as a raw
//! [`serde_json::Value`] so nothing is coerced before the right decoder sees
//! it.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Request tags with fixed meaning on the wire.
pub mod tags {
    pub const HANDSHAKE: &str = "handshake";
    pub const TRANSACTION: &str = "transaction";
    pub const BLOCK: &str = "block";
}

/// Structural problems with an inbound frame.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MessageError {
    #[error("malformed message: {0}")]
    Malformed(String),
}

/// One framed message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub request: String,
    #[serde(default)]
    pub data: Value,
}

impl Envelope {
    pub fn new(request: impl Into<String>, data: Value) -> Self {
        Self {
            request: request.into(),
            data,
        }
    }

    /// Parses one text frame. Missing `request`, a non-string `request` or
    /// invalid JSON are all [`MessageError::Malformed`].
    pub fn decode(frame: &str) -> Result<Self, MessageError> {
        serde_json::from_str(frame).map_err(|e| MessageError::Malformed(e.to_string()))
    }

    pub fn encode(&self) -> Result<String, MessageError> {
        serde_json::to_string(self).map_err(|e| MessageError::Malformed(e.to_string()))
    }
}
