//! # Wallet
//!
//! A [`Wallet`] owns exactly one [`Keypair`] and hands out signatures, never
//! the private key. Everything that needs to prove "this came from us" (the
//! handshake challenge, outgoing transactions) goes through
//! [`Wallet::sign`].
//!
//! ## Persistence
//!
//! The JSON form is `{"publicKey": <hex>, "privateKey": <hex>}` and
//! round-trips losslessly. Loading re-derives the public key from the
//! private key and refuses files where the two disagree.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::crypto::keys::{KeyError, Keypair, PublicKey, Signature};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from restoring or persisting a wallet.
#[derive(Debug, Error)]
pub enum WalletError {
    /// The key material itself is unusable.
    #[error("invalid key: {0}")]
    InvalidKey(#[from] KeyError),

    /// The stored public key is not the one derived from the private key.
    #[error("stored public key does not match the private key")]
    PublicKeyMismatch,

    /// The JSON document is not a wallet.
    #[error("wallet json: {0}")]
    Json(#[from] serde_json::Error),

    /// Reading or writing the wallet file failed.
    #[error("wallet io: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Wallet
// ---------------------------------------------------------------------------

/// Serialized wallet form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletJson {
    pub public_key: String,
    pub private_key: String,
}

/// A single-identity wallet.
#[derive(Clone, PartialEq, Eq)]
pub struct Wallet {
    keypair: Keypair,
}

impl Wallet {
    /// A wallet with a freshly generated keypair.
    pub fn generate() -> Self {
        Self {
            keypair: Keypair::generate(),
        }
    }

    /// Wraps an existing keypair.
    pub fn from_keypair(keypair: Keypair) -> Self {
        Self { keypair }
    }

    /// Restores a wallet from a hex-encoded 64-byte private key.
    ///
    /// Validation happens here, not on first use: empty input, non-hex
    /// input, any decoded length other than 64, or a public half that does
    /// not match the seed all fail with a [`KeyError`].
    pub fn from_private_key(hex_str: &str) -> Result<Self, KeyError> {
        Ok(Self {
            keypair: Keypair::from_private_key_hex(hex_str)?,
        })
    }

    pub fn public_key(&self) -> PublicKey {
        self.keypair.public_key()
    }

    pub fn public_key_hex(&self) -> String {
        self.keypair.public_key().to_hex()
    }

    /// Sign `message` with the wallet's key.
    pub fn sign(&self, message: &[u8]) -> Signature {
        self.keypair.sign(message)
    }

    /// Verify a signature against the wallet's public key.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> bool {
        self.keypair.verify(message, signature)
    }

    /// Lossless JSON form, including the private key.
    pub fn to_json(&self) -> WalletJson {
        WalletJson {
            public_key: self.public_key_hex(),
            private_key: self.keypair.private_key_hex(),
        }
    }

    /// Restores a wallet from its JSON form.
    pub fn from_json(json: &WalletJson) -> Result<Self, WalletError> {
        let wallet = Self::from_private_key(&json.private_key)?;
        let stored = PublicKey::from_hex(&json.public_key)?;
        if stored != wallet.public_key() {
            return Err(WalletError::PublicKeyMismatch);
        }
        Ok(wallet)
    }

    /// Serialize to a JSON string.
    pub fn to_json_string(&self) -> Result<String, WalletError> {
        Ok(serde_json::to_string_pretty(&self.to_json())?)
    }

    /// Parse from a JSON string.
    pub fn from_json_str(s: &str) -> Result<Self, WalletError> {
        let json: WalletJson = serde_json::from_str(s)?;
        Self::from_json(&json)
    }

    /// Write the wallet JSON to `path`, owner-readable only on Unix.
    pub fn save(&self, path: &Path) -> Result<(), WalletError> {
        std::fs::write(path, self.to_json_string()?)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        }

        Ok(())
    }

    /// Read a wallet previously written by [`Wallet::save`].
    pub fn load(path: &Path) -> Result<Self, WalletError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }
}

impl fmt::Debug for Wallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Wallet(pub={})", self.public_key_hex())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_hex_is_invalid_key() {
        assert!(matches!(
            Wallet::from_private_key("invalid-key"),
            Err(KeyError::InvalidEncoding)
        ));
    }

    #[test]
    fn empty_private_key_is_invalid_key() {
        assert!(matches!(
            Wallet::from_private_key(""),
            Err(KeyError::InvalidLength {
                expected: 64,
                actual: 0
            })
        ));
    }

    #[test]
    fn seed_length_key_is_rejected() {
        let hex_seed = "11".repeat(32);
        assert!(Wallet::from_private_key(&hex_seed).is_err());
    }

    #[test]
    fn from_private_key_restores_identity() {
        let wallet = Wallet::generate();
        let restored = Wallet::from_private_key(&wallet.to_json().private_key).unwrap();
        assert_eq!(wallet.public_key(), restored.public_key());
    }

    #[test]
    fn json_roundtrip_is_lossless() {
        let wallet = Wallet::generate();
        let json = wallet.to_json_string().unwrap();
        let restored = Wallet::from_json_str(&json).unwrap();
        assert_eq!(restored.to_json(), wallet.to_json());
    }

    #[test]
    fn json_field_names_are_camel_case() {
        let wallet = Wallet::generate();
        let value = serde_json::to_value(wallet.to_json()).unwrap();
        assert!(value.get("publicKey").is_some());
        assert!(value.get("privateKey").is_some());
    }

    #[test]
    fn json_with_foreign_public_key_is_rejected() {
        let wallet = Wallet::generate();
        let mut json = wallet.to_json();
        json.public_key = Wallet::generate().public_key_hex();
        assert!(matches!(
            Wallet::from_json(&json),
            Err(WalletError::PublicKeyMismatch)
        ));
    }

    #[test]
    fn sign_verifies_under_wallet_key() {
        let wallet = Wallet::generate();
        let sig = wallet.sign(b"12345");
        assert!(wallet.public_key().verify(b"12345", &sig));
    }

    #[test]
    fn save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wallet.json");
        let wallet = Wallet::generate();
        wallet.save(&path).unwrap();
        let loaded = Wallet::load(&path).unwrap();
        assert_eq!(loaded, wallet);
    }

    #[test]
    fn debug_shows_only_public_key() {
        let wallet = Wallet::generate();
        let debug_str = format!("{:?}", wallet);
        assert!(debug_str.contains(&wallet.public_key_hex()));
        assert!(!debug_str.contains(&wallet.to_json().private_key[..64]));
    }
}
