//! The [`Transaction`] value and its fluent construction methods.
//!
//! Construction is by value: every builder call consumes the transaction and
//! hands it back, so there is never a second alias to mutate behind the
//! caller's back.
//!
//! ```rust
//! use wirepeer_protocol::crypto::keys::Keypair;
//! use wirepeer_protocol::transaction::{Slip, Transaction};
//!
//! let alice = Keypair::generate().public_key();
//! let bob = Keypair::generate().public_key();
//!
//! let tx = Transaction::new()
//!     .add_from(Slip::new(alice, 1_000))
//!     .add_to(Slip::new(bob, 1_000))
//!     .set_data(b"lunch".to_vec());
//! assert!(!tx.is_signed());
//! ```
//!
//! Any mutation after signing drops the signature. A stale signature would
//! no longer cover the bytes it claims to cover.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::json::{hex_bytes, nolan};
use super::slip::Slip;
use super::types::TransactionType;
use crate::crypto::keys::Signature;

/// A transaction as exchanged with the remote peer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Creation time, milliseconds since the Unix epoch.
    #[serde(with = "nolan")]
    pub timestamp: u64,

    /// Inputs, in order.
    #[serde(default)]
    pub from: Vec<Slip>,

    /// Outputs, in order.
    #[serde(default)]
    pub to: Vec<Slip>,

    /// Opaque application payload.
    #[serde(default, with = "hex_bytes")]
    pub data: Vec<u8>,

    /// Ed25519 signature over `serialize(false)`. `None` until signed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<Signature>,

    #[serde(rename = "type", default)]
    pub tx_type: TransactionType,

    /// How many times this transaction has been replaced by the sender.
    #[serde(default)]
    pub txs_replacements: u32,
}

impl Transaction {
    /// An empty `Normal` transaction stamped with the current time.
    pub fn new() -> Self {
        Self::default().with_timestamp(Utc::now().timestamp_millis().max(0) as u64)
    }

    /// Append an input slip.
    pub fn add_from(mut self, slip: Slip) -> Self {
        self.signature = None;
        self.from.push(slip);
        self
    }

    /// Append an output slip.
    pub fn add_to(mut self, slip: Slip) -> Self {
        self.signature = None;
        self.to.push(slip);
        self
    }

    /// Replace the opaque payload.
    pub fn set_data(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.signature = None;
        self.data = data.into();
        self
    }

    pub fn with_timestamp(mut self, timestamp: u64) -> Self {
        self.signature = None;
        self.timestamp = timestamp;
        self
    }

    pub fn with_type(mut self, tx_type: TransactionType) -> Self {
        self.signature = None;
        self.tx_type = tx_type;
        self
    }

    /// Not part of the binary frame, so the signature survives.
    pub fn with_replacements(mut self, txs_replacements: u32) -> Self {
        self.txs_replacements = txs_replacements;
        self
    }

    pub fn is_signed(&self) -> bool {
        self.signature.is_some()
    }

}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::Keypair;
    use crate::wallet::Wallet;

    #[test]
    fn new_is_empty_and_timestamped() {
        let tx = Transaction::new();
        assert!(tx.from.is_empty());
        assert!(tx.to.is_empty());
        assert!(tx.data.is_empty());
        assert!(tx.timestamp > 1_600_000_000_000);
        assert_eq!(tx.tx_type, TransactionType::Normal);
    }

    #[test]
    fn builder_preserves_slip_order() {
        let keys: Vec<_> = (0..3).map(|_| Keypair::generate().public_key()).collect();
        let tx = keys
            .iter()
            .enumerate()
            .fold(Transaction::new(), |tx, (i, pk)| {
                tx.add_to(Slip::new(*pk, i as u64))
            });
        let amounts: Vec<u64> = tx.to.iter().map(|s| s.amount).collect();
        assert_eq!(amounts, vec![0, 1, 2]);
    }

    #[test]
    fn mutation_after_signing_drops_signature() {
        let wallet = Wallet::generate();
        let mut tx = Transaction::new().add_from(Slip::new(wallet.public_key(), 5));
        tx.sign(&wallet).unwrap();
        assert!(tx.is_signed());

        let tx = tx.set_data(b"changed".to_vec());
        assert!(!tx.is_signed());
    }

    #[test]
    fn replacements_do_not_invalidate_signature() {
        let wallet = Wallet::generate();
        let mut tx = Transaction::new().add_from(Slip::new(wallet.public_key(), 5));
        tx.sign(&wallet).unwrap();
        let tx = tx.with_replacements(2);
        assert!(tx.is_signed());
        assert!(tx.verify_signature());
    }
}
