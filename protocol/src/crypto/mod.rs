//! # Cryptographic Primitives
//!
//! Ed25519 is the only primitive the peer protocol needs: it signs
//! transactions and it answers the handshake challenge. Everything here is a
//! thin, typed wrapper around `ed25519-dalek`.
//!
//! - [`keys`] — [`Keypair`], [`PublicKey`], [`Signature`] and [`KeyError`].
//! - [`signatures`] — raw-byte helpers (`derive_public_key`, `sign`,
//!   `verify`, validity checks).

pub mod keys;
pub mod signatures;

pub use keys::{KeyError, Keypair, PublicKey, Signature};
pub use signatures::{derive_public_key, is_valid_private_key, is_valid_public_key, sign, verify};
