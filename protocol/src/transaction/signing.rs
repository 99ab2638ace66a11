//! Transaction signing and signature checks.
//!
//! The signing payload is always `serialize(false)`: every wire field except
//! the signature itself. Signing is a separate step from building so a
//! transaction can be assembled before the wallet is at hand.

use super::builder::Transaction;
use super::error::TransactionError;
use crate::crypto::keys::PublicKey;
use crate::wallet::Wallet;

impl Transaction {
    /// Sign in place with `wallet`, overwriting any previous signature.
    pub fn sign(&mut self, wallet: &Wallet) -> Result<&Self, TransactionError> {
        let payload = self.serialize(false)?;
        self.signature = Some(wallet.sign(&payload));
        Ok(self)
    }

    /// Check the signature against the first input's public key, which is
    /// the spender. `false` if unsigned or there are no inputs.
    pub fn verify_signature(&self) -> bool {
        match self.from.first() {
            Some(slip) => self.verify_signature_with(&slip.public_key),
            None => false,
        }
    }

    /// Check the signature against an explicit public key.
    pub fn verify_signature_with(&self, public_key: &PublicKey) -> bool {
        let Some(signature) = &self.signature else {
            return false;
        };
        match self.serialize(false) {
            Ok(payload) => public_key.verify(&payload, signature),
            Err(_) => false,
        }
    }
}

/// Signs `tx` in place. Free-function form of [`Transaction::sign`].
pub fn sign_transaction<'a>(
    tx: &'a mut Transaction,
    wallet: &Wallet,
) -> Result<&'a Transaction, TransactionError> {
    tx.sign(wallet)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
