//! # Transaction Module
//!
//! Construction, binary encoding, JSON encoding and signing of the
//! transactions exchanged with the remote peer.
//!
//! ## Architecture
//!
//! ```text
//! types.rs    — TransactionType and SlipType, one wire byte each
//! slip.rs     — Slip: public key, amount in Nolan, type, optional locators
//! builder.rs  — Transaction and its by-value fluent construction methods
//! codec.rs    — serialize(include_signature) / deserialize, big-endian
//! signing.rs  — sign over serialize(false), signature checks
//! json.rs     — lossless JSON form (u64 quantities as decimal strings)
//! error.rs    — TransactionError
//! ```
//!
//! ## Lifecycle
//!
//! 1. **Build** — `Transaction::new().add_from(..).add_to(..).set_data(..)`.
//! 2. **Sign** — [`Transaction::sign`] with a [`Wallet`](crate::wallet::Wallet).
//! 3. **Send** — `serialize(true)` goes out through the connection.
//!
//! The codec does not validate economics (inputs covering outputs, UTXO
//! existence). The remote peer owns those rules.

pub mod builder;
pub mod codec;
pub mod error;
pub mod json;
pub mod signing;
pub mod slip;
pub mod types;

pub use builder::Transaction;
pub use error::TransactionError;
pub use signing::sign_transaction;
pub use slip::Slip;
pub use types::{SlipType, TransactionType};
