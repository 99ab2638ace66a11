//! # Key Management
//!
//! Ed25519 keypairs in the byte layout the remote peer expects.
//!
//! The peer speaks NaCl: a private key is 64 bytes, the 32-byte seed
//! followed by the 32-byte public key. `ed25519-dalek` calls that layout
//! "keypair bytes", and we lean on it for both directions so the public half
//! is always re-derived from the seed rather than trusted.
//!
//! ## Security considerations
//!
//! - Signing keys are zeroized on drop (ed25519-dalek does this for us).
//! - Generation uses `OsRng`.
//! - Key bytes are never logged, and `Debug` only ever prints the public key.

use ed25519_dalek::{Signature as DalekSignature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::hash::{Hash, Hasher};
use thiserror::Error;

use crate::config::{PRIVATE_KEY_LENGTH, PUBLIC_KEY_LENGTH, SEED_LENGTH, SIGNATURE_LENGTH};

/// Errors raised while decoding or validating key material.
///
/// Deliberately terse: an error message is not the place to echo key bytes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("invalid key encoding: not valid hex")]
    InvalidEncoding,

    #[error("invalid key length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("keypair validation failed: public key does not match private key")]
    KeypairMismatch,
}

/// Decodes a hex string and checks the decoded length.
pub(crate) fn decode_hex_exact(input: &str, expected: usize) -> Result<Vec<u8>, KeyError> {
    let bytes = hex::decode(input.trim()).map_err(|_| KeyError::InvalidEncoding)?;
    if bytes.len() != expected {
        return Err(KeyError::InvalidLength {
            expected,
            actual: bytes.len(),
        });
    }
    Ok(bytes)
}

// ---------------------------------------------------------------------------
// Keypair
// ---------------------------------------------------------------------------

/// An Ed25519 keypair with a 32-byte public key and a 64-byte private key.
///
/// Does not implement `Serialize`. Exporting a private key goes through
/// [`Keypair::private_key_bytes`] or the wallet's JSON form, on purpose.
///
/// # Examples
///
/// ```
/// use wirepeer_protocol::crypto::keys::Keypair;
///
/// let kp = Keypair::generate();
/// let sig = kp.sign(b"hello peer");
/// assert!(kp.public_key().verify(b"hello peer", &sig));
/// assert_eq!(kp.private_key_bytes().len(), 64);
/// ```
pub struct Keypair {
    signing_key: SigningKey,
}

impl Keypair {
    /// Generate a fresh keypair from the OS RNG.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Builds a keypair from a 32-byte seed.
    pub fn from_seed(seed: &[u8; SEED_LENGTH]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// Reconstructs a keypair from a 64-byte private key.
    ///
    /// Fails if the length is wrong or the trailing public half does not
    /// match the key derived from the seed.
    pub fn from_private_key_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        let arr: [u8; PRIVATE_KEY_LENGTH] =
            bytes.try_into().map_err(|_| KeyError::InvalidLength {
                expected: PRIVATE_KEY_LENGTH,
                actual: bytes.len(),
            })?;
        let signing_key =
            SigningKey::from_keypair_bytes(&arr).map_err(|_| KeyError::KeypairMismatch)?;
        Ok(Self { signing_key })
    }

    /// Reconstructs a keypair from a hex-encoded 64-byte private key.
    pub fn from_private_key_hex(hex_str: &str) -> Result<Self, KeyError> {
        let bytes = decode_hex_exact(hex_str, PRIVATE_KEY_LENGTH)?;
        Self::from_private_key_bytes(&bytes)
    }

    /// The public half.
    pub fn public_key(&self) -> PublicKey {
        PublicKey {
            bytes: self.signing_key.verifying_key().to_bytes(),
        }
    }

    /// The 64-byte private key: seed ‖ public key.
    ///
    /// Handle with care. Don't log it, don't ship it anywhere in plaintext.
    pub fn private_key_bytes(&self) -> [u8; PRIVATE_KEY_LENGTH] {
        self.signing_key.to_keypair_bytes()
    }

    /// Hex-encoded private key. Same warnings apply.
    pub fn private_key_hex(&self) -> String {
        hex::encode(self.private_key_bytes())
    }

    /// Sign a message. Deterministic for a given key and message.
    pub fn sign(&self, message: &[u8]) -> Signature {
        Signature {
            bytes: self.signing_key.sign(message).to_bytes(),
        }
    }

    /// Verify a signature against this keypair's public key.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> bool {
        self.public_key().verify(message, signature)
    }
}

impl Clone for Keypair {
    fn clone(&self) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(&self.signing_key.to_bytes()),
        }
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Keypair(pub={})", self.public_key().to_hex())
    }
}

impl PartialEq for Keypair {
    /// Keypairs compare by public key; secret bytes are never compared.
    fn eq(&self, other: &Self) -> bool {
        self.public_key() == other.public_key()
    }
}

impl Eq for Keypair {}

// ---------------------------------------------------------------------------
// PublicKey
// ---------------------------------------------------------------------------

/// A 32-byte Ed25519 public key. Travels as hex in JSON.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PublicKey {
    bytes: [u8; PUBLIC_KEY_LENGTH],
}

impl PublicKey {
    /// Wrap raw bytes. No curve validation, matching the peer's own checks.
    pub fn from_bytes(bytes: [u8; PUBLIC_KEY_LENGTH]) -> Self {
        Self { bytes }
    }

    /// Length-checked construction from a slice.
    pub fn try_from_slice(slice: &[u8]) -> Result<Self, KeyError> {
        let bytes = slice.try_into().map_err(|_| KeyError::InvalidLength {
            expected: PUBLIC_KEY_LENGTH,
            actual: slice.len(),
        })?;
        Ok(Self { bytes })
    }

    /// Parse a hex-encoded public key.
    pub fn from_hex(s: &str) -> Result<Self, KeyError> {
        let bytes = decode_hex_exact(s, PUBLIC_KEY_LENGTH)?;
        Self::try_from_slice(&bytes)
    }

    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_LENGTH] {
        &self.bytes
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }

    /// Verify `signature` over `message`. Invalid points yield `false`.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> bool {
        let Ok(verifying_key) = VerifyingKey::from_bytes(&self.bytes) else {
            return false;
        };
        let dalek_sig = DalekSignature::from_bytes(&signature.bytes);
        verifying_key.verify(message, &dalek_sig).is_ok()
    }
}

impl Hash for PublicKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bytes.hash(state);
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", &self.to_hex()[..16])
    }
}

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Signature
// ---------------------------------------------------------------------------

/// A 64-byte Ed25519 signature. Travels as hex in JSON.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature {
    bytes: [u8; SIGNATURE_LENGTH],
}

impl Signature {
    pub fn from_bytes(bytes: [u8; SIGNATURE_LENGTH]) -> Self {
        Self { bytes }
    }

    /// Length-checked construction from a slice.
    pub fn try_from_slice(slice: &[u8]) -> Result<Self, KeyError> {
        let bytes = slice.try_into().map_err(|_| KeyError::InvalidLength {
            expected: SIGNATURE_LENGTH,
            actual: slice.len(),
        })?;
        Ok(Self { bytes })
    }

    pub fn from_hex(s: &str) -> Result<Self, KeyError> {
        let bytes = decode_hex_exact(s, SIGNATURE_LENGTH)?;
        Self::try_from_slice(&bytes)
    }

    pub fn as_bytes(&self) -> &[u8; SIGNATURE_LENGTH] {
        &self.bytes
    }

    /// 128 hex characters.
    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex_str = self.to_hex();
        write!(f, "Signature({}...{})", &hex_str[..8], &hex_str[120..])
    }
}

impl Serialize for Signature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
