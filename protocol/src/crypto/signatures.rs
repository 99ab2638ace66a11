//! # Raw-Byte Signing Helpers
//!
//! The "key manager" surface: free functions over raw byte slices and hex
//! strings, for callers that hold key material as bytes off the wire rather
//! than as a [`Keypair`].
//!
//! `verify` answers yes or no and never errors. A malformed key or a
//! signature of the wrong length is just a "no".

use ed25519_dalek::SigningKey;

use super::keys::{decode_hex_exact, KeyError, Keypair, PublicKey, Signature};
use crate::config::{PRIVATE_KEY_LENGTH, PUBLIC_KEY_LENGTH, SEED_LENGTH};

/// Generate a fresh keypair.
pub fn generate() -> Keypair {
    Keypair::generate()
}

/// Derive the 32-byte public key from a 64-byte private key.
///
/// Derivation uses the seed half only, so it is a pure function of the
/// input. The trailing half is not consulted here; use
/// [`Keypair::from_private_key_bytes`] to check consistency.
pub fn derive_public_key(private_key: &[u8]) -> Result<[u8; PUBLIC_KEY_LENGTH], KeyError> {
    if private_key.len() != PRIVATE_KEY_LENGTH {
        return Err(KeyError::InvalidLength {
            expected: PRIVATE_KEY_LENGTH,
            actual: private_key.len(),
        });
    }
    let mut seed = [0u8; SEED_LENGTH];
    seed.copy_from_slice(&private_key[..SEED_LENGTH]);
    Ok(SigningKey::from_bytes(&seed).verifying_key().to_bytes())
}

/// Sign `data` with a raw 64-byte private key.
pub fn sign(data: &[u8], private_key: &[u8]) -> Result<Signature, KeyError> {
    if private_key.len() != PRIVATE_KEY_LENGTH {
        return Err(KeyError::InvalidLength {
            expected: PRIVATE_KEY_LENGTH,
            actual: private_key.len(),
        });
    }
    let mut seed = [0u8; SEED_LENGTH];
    seed.copy_from_slice(&private_key[..SEED_LENGTH]);
    Ok(Keypair::from_seed(&seed).sign(data))
}

/// Verify a detached signature from raw bytes.
pub fn verify(data: &[u8], signature: &[u8], public_key: &[u8]) -> bool {
    let Ok(signature) = Signature::try_from_slice(signature) else {
        return false;
    };
    let Ok(public_key) = PublicKey::try_from_slice(public_key) else {
        return false;
    };
    public_key.verify(data, &signature)
}

/// `true` if `hex_str` decodes to exactly 32 bytes.
pub fn is_valid_public_key(hex_str: &str) -> bool {
    decode_hex_exact(hex_str, PUBLIC_KEY_LENGTH).is_ok()
}

/// `true` if `hex_str` decodes to exactly 64 bytes.
pub fn is_valid_private_key(hex_str: &str) -> bool {
    decode_hex_exact(hex_str, PRIVATE_KEY_LENGTH).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_matches_generated_public_key() {
        let kp = generate();
        let derived = derive_public_key(&kp.private_key_bytes()).unwrap();
        assert_eq!(&derived, kp.public_key().as_bytes());
    }

    #[test]
    fn derive_is_pure() {
        let kp = generate();
        let private = kp.private_key_bytes();
        assert_eq!(
            derive_public_key(&private).unwrap(),
            derive_public_key(&private).unwrap()
        );
    }

    #[test]
    fn derive_rejects_wrong_lengths() {
        for len in [0usize, 32, 63, 65] {
            let err = derive_public_key(&vec![1u8; len]).unwrap_err();
            assert_eq!(
                err,
                KeyError::InvalidLength {
                    expected: 64,
                    actual: len
                }
            );
        }
    }

    #[test]
    fn raw_sign_is_deterministic_and_verifies() {
        let kp = generate();
        let private = kp.private_key_bytes();
        let sig1 = sign(b"payload", &private).unwrap();
        let sig2 = sign(b"payload", &private).unwrap();
        assert_eq!(sig1, sig2);
        assert!(verify(
            b"payload",
            sig1.as_bytes(),
            kp.public_key().as_bytes()
        ));
    }

    #[test]
    fn raw_sign_rejects_short_key() {
        assert!(sign(b"payload", &[0u8; 32]).is_err());
    }

    #[test]
    fn verify_never_errors_on_malformed_input() {
        let kp = generate();
        let sig = kp.sign(b"data");
        let pk = kp.public_key();
        assert!(!verify(b"data", &sig.as_bytes()[..63], pk.as_bytes()));
        assert!(!verify(b"data", sig.as_bytes(), &pk.as_bytes()[..31]));
        assert!(!verify(b"data", &[], &[]));
        assert!(!verify(b"other", sig.as_bytes(), pk.as_bytes()));
    }

    #[test]
    fn validity_checks_are_length_only() {
        let kp = generate();
        assert!(is_valid_public_key(&kp.public_key().to_hex()));
        assert!(is_valid_private_key(&kp.private_key_hex()));
        // Any 32 bytes pass, curve membership is not checked.
        assert!(is_valid_public_key(&"ff".repeat(32)));
        assert!(!is_valid_public_key(&kp.private_key_hex()));
        assert!(!is_valid_private_key(&kp.public_key().to_hex()));
        assert!(!is_valid_private_key("zz"));
        assert!(!is_valid_private_key(""));
    }
}
