//! Core type definitions for transactions and slips.
//!
//! Both enums are a single byte on the wire, and the byte values are fixed
//! by the remote peer. They travel as the same integers in JSON.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

// ---------------------------------------------------------------------------
// TransactionType
// ---------------------------------------------------------------------------

/// What kind of transaction this is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum TransactionType {
    /// Ordinary value transfer.
    #[default]
    Normal,
    /// Carries a mining solution.
    GoldenTicket,
    /// Fee transaction created by a block producer.
    Fee,
    /// Token issuance.
    Issuance,
    /// Automatic transaction rebroadcast.
    Atr,
}

impl TransactionType {
    pub const ALL: [TransactionType; 5] = [
        Self::Normal,
        Self::GoldenTicket,
        Self::Fee,
        Self::Issuance,
        Self::Atr,
    ];

    /// Wire byte.
    pub fn as_byte(self) -> u8 {
        match self {
            Self::Normal => 0,
            Self::GoldenTicket => 1,
            Self::Fee => 2,
            Self::Issuance => 3,
            Self::Atr => 4,
        }
    }

    /// Inverse of [`as_byte`](Self::as_byte). `None` for unknown bytes.
    pub fn from_byte(byte: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_byte() == byte)
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Normal => write!(f, "Normal"),
            Self::GoldenTicket => write!(f, "GoldenTicket"),
            Self::Fee => write!(f, "Fee"),
            Self::Issuance => write!(f, "Issuance"),
            Self::Atr => write!(f, "ATR"),
        }
    }
}

impl Serialize for TransactionType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.as_byte())
    }
}

impl<'de> Deserialize<'de> for TransactionType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let byte = u8::deserialize(deserializer)?;
        Self::from_byte(byte)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown transaction type {}", byte)))
    }
}

// ---------------------------------------------------------------------------
// SlipType
// ---------------------------------------------------------------------------

/// What role a slip plays inside its transaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SlipType {
    #[default]
    Normal,
    Atr,
    VipInput,
    VipOutput,
    MinerInput,
    MinerOutput,
    RouterInput,
    RouterOutput,
}

impl SlipType {
    pub const ALL: [SlipType; 8] = [
        Self::Normal,
        Self::Atr,
        Self::VipInput,
        Self::VipOutput,
        Self::MinerInput,
        Self::MinerOutput,
        Self::RouterInput,
        Self::RouterOutput,
    ];

    /// Wire byte.
    pub fn as_byte(self) -> u8 {
        match self {
            Self::Normal => 0,
            Self::Atr => 1,
            Self::VipInput => 2,
            Self::VipOutput => 3,
            Self::MinerInput => 4,
            Self::MinerOutput => 5,
            Self::RouterInput => 6,
            Self::RouterOutput => 7,
        }
    }

    /// Inverse of [`as_byte`](Self::as_byte). `None` for unknown bytes.
    pub fn from_byte(byte: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_byte() == byte)
    }
}

impl fmt::Display for SlipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Normal => write!(f, "Normal"),
            Self::Atr => write!(f, "ATR"),
            Self::VipInput => write!(f, "VipInput"),
            Self::VipOutput => write!(f, "VipOutput"),
            Self::MinerInput => write!(f, "MinerInput"),
            Self::MinerOutput => write!(f, "MinerOutput"),
            Self::RouterInput => write!(f, "RouterInput"),
            Self::RouterOutput => write!(f, "RouterOutput"),
        }
    }
}

impl Serialize for SlipType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.as_byte())
    }
}

impl<'de> Deserialize<'de> for SlipType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let byte = u8::deserialize(deserializer)?;
        Self::from_byte(byte)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown slip type {}", byte)))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
