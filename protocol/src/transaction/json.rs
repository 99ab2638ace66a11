//! JSON representation of transactions.
//!
//! Used where binary framing is awkward, e.g. inside JSON envelopes next to
//! handshake traffic. JavaScript peers lose precision above 2^53, so every
//! 64-bit quantity (amounts, timestamps, block ids, ordinals) is written as a
//! decimal string. On input both strings and JSON integers are accepted, and
//! anything that is not an exact u64 (negative, fractional, exponent form,
//! too large) is rejected instead of being rounded.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serializer};
use std::fmt;

use super::builder::Transaction;
use super::error::TransactionError;

/// Serde adapter for 64-bit amounts in Nolan (and other u64 counters).
pub mod nolan {
    use super::*;

    /// Wrapper that carries the exact-integer visitor.
    pub(crate) struct Exact(pub u64);

    struct ExactVisitor;

    impl<'de> Visitor<'de> for ExactVisitor {
        type Value = Exact;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "an unsigned 64-bit integer or its decimal string")
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Exact, E> {
            Ok(Exact(v))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Exact, E> {
            u64::try_from(v)
                .map(Exact)
                .map_err(|_| E::custom(format!("negative value {}", v)))
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<Exact, E> {
            Err(E::custom(format!(
                "{} is not an exact unsigned 64-bit integer",
                v
            )))
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Exact, E> {
            if v.is_empty() || !v.bytes().all(|b| b.is_ascii_digit()) {
                return Err(E::custom(format!("`{}` is not a decimal integer", v)));
            }
            v.parse::<u64>()
                .map(Exact)
                .map_err(|_| E::custom(format!("`{}` overflows 64 bits", v)))
        }
    }

    impl<'de> Deserialize<'de> for Exact {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            deserializer.deserialize_any(ExactVisitor)
        }
    }

    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        Exact::deserialize(deserializer).map(|e| e.0)
    }

    /// The same adapter for optional fields.
    pub mod option {
        use super::*;

        pub fn serialize<S: Serializer>(
            value: &Option<u64>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(v) => serializer.collect_str(v),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<u64>, D::Error> {
            Ok(Option::<Exact>::deserialize(deserializer)?.map(|e| e.0))
        }
    }
}

/// Serde adapter for opaque byte strings, hex-encoded.
pub mod hex_bytes {
    use super::*;

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(&s).map_err(de::Error::custom)
    }
}

impl Transaction {
    /// The JSON form as a `serde_json::Value`.
    pub fn to_json(&self) -> Result<serde_json::Value, TransactionError> {
        serde_json::to_value(self).map_err(|e| TransactionError::Encoding(e.to_string()))
    }

    /// Parse the JSON form.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, TransactionError> {
        <Self as Deserialize>::deserialize(value)
            .map_err(|e| TransactionError::Malformed(e.to_string()))
    }

    /// The JSON form as a string.
    pub fn to_json_string(&self) -> Result<String, TransactionError> {
        serde_json::to_string(self).map_err(|e| TransactionError::Encoding(e.to_string()))
    }

    /// Parse the JSON form from a string.
    pub fn from_json_str(s: &str) -> Result<Self, TransactionError> {
        serde_json::from_str(s).map_err(|e| TransactionError::Malformed(e.to_string()))
    }
}
