//! Binary wire format for transactions.
//!
//! ```text
//! offset  size   field
//! 0       8      timestamp (u64, big-endian)
//! 8       4      from-count (u32)
//! 12      41*n   from-slips: public key (32) | amount (u64) | type (u8)
//! ..      4      to-count (u32)
//! ..      41*m   to-slips
//! ..      4      data-length (u32)
//! ..      len    data
//! ..      1      transaction type
//! ..      64     signature, only when requested and present
//! ```
//!
//! The signature is never zero-padded: an unsigned transaction, or one
//! serialized for signing, simply ends after the type byte.

use super::builder::Transaction;
use super::error::TransactionError;
use super::slip::Slip;
use super::types::{SlipType, TransactionType};
use crate::config::{PUBLIC_KEY_LENGTH, SIGNATURE_LENGTH, SLIP_SIZE, TX_FIXED_SIZE};
use crate::crypto::keys::{PublicKey, Signature};

fn length_prefix(len: usize, what: &str) -> Result<[u8; 4], TransactionError> {
    u32::try_from(len)
        .map(u32::to_be_bytes)
        .map_err(|_| TransactionError::Encoding(format!("{} {} exceeds u32", what, len)))
}

fn write_slip(buf: &mut Vec<u8>, slip: &Slip) {
    buf.extend_from_slice(slip.public_key.as_bytes());
    buf.extend_from_slice(&slip.amount.to_be_bytes());
    buf.push(slip.slip_type.as_byte());
}

impl Transaction {
    /// Exact size of [`serialize`](Self::serialize) output.
    pub fn serialized_len(&self, include_signature: bool) -> usize {
        let sig = if include_signature && self.signature.is_some() {
            SIGNATURE_LENGTH
        } else {
            0
        };
        TX_FIXED_SIZE + (self.from.len() + self.to.len()) * SLIP_SIZE + self.data.len() + sig
    }

    /// Encode to the wire format.
    ///
    /// With `include_signature == false` this is the signing payload.
    pub fn serialize(&self, include_signature: bool) -> Result<Vec<u8>, TransactionError> {
        let mut buf = Vec::with_capacity(self.serialized_len(include_signature));

        buf.extend_from_slice(&self.timestamp.to_be_bytes());

        buf.extend_from_slice(&length_prefix(self.from.len(), "from-count")?);
        for slip in &self.from {
            write_slip(&mut buf, slip);
        }

        buf.extend_from_slice(&length_prefix(self.to.len(), "to-count")?);
        for slip in &self.to {
            write_slip(&mut buf, slip);
        }

        buf.extend_from_slice(&length_prefix(self.data.len(), "data-length")?);
        buf.extend_from_slice(&self.data);

        buf.push(self.tx_type.as_byte());

        if include_signature {
            if let Some(sig) = &self.signature {
                buf.extend_from_slice(sig.as_bytes());
            }
        }

        Ok(buf)
    }

    /// Decode the wire format.
    ///
    /// Rejects truncated input before reading past the end, unknown type
    /// bytes, and trailing bytes that are neither absent nor exactly one
    /// signature. `txs_replacements` is not on the wire and decodes as 0.
    pub fn deserialize(bytes: &[u8]) -> Result<Self, TransactionError> {
        let mut r = Reader::new(bytes);

        let timestamp = r.u64("timestamp")?;
        let from = r.slips("from")?;
        let to = r.slips("to")?;

        let data_len = r.u32("data-length")? as usize;
        let data = r.take(data_len, "data")?.to_vec();

        let type_byte = r.u8("type")?;
        let tx_type = TransactionType::from_byte(type_byte).ok_or_else(|| {
            TransactionError::Malformed(format!("unknown transaction type {}", type_byte))
        })?;

        let signature = match r.remaining() {
            0 => None,
            SIGNATURE_LENGTH => {
                let raw = r.take(SIGNATURE_LENGTH, "signature")?;
                Some(
                    Signature::try_from_slice(raw)
                        .map_err(|e| TransactionError::Malformed(e.to_string()))?,
                )
            }
            n => {
                return Err(TransactionError::Malformed(format!(
                    "{} trailing bytes after type, expected 0 or {}",
                    n, SIGNATURE_LENGTH
                )))
            }
        };

        Ok(Self {
            timestamp,
            from,
            to,
            data,
            signature,
            tx_type,
            txs_replacements: 0,
        })
    }
}

// ---------------------------------------------------------------------------
// Reader
// ---------------------------------------------------------------------------

/// Bounds-checked cursor over the input.
struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, n: usize, what: &str) -> Result<&'a [u8], TransactionError> {
        if self.remaining() < n {
            return Err(TransactionError::Malformed(format!(
                "truncated {}: need {} bytes at offset {}, {} available",
                what,
                n,
                self.pos,
                self.remaining()
            )));
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    fn u8(&mut self, what: &str) -> Result<u8, TransactionError> {
        Ok(self.take(1, what)?[0])
    }

    fn u32(&mut self, what: &str) -> Result<u32, TransactionError> {
        let mut arr = [0u8; 4];
        arr.copy_from_slice(self.take(4, what)?);
        Ok(u32::from_be_bytes(arr))
    }

    fn u64(&mut self, what: &str) -> Result<u64, TransactionError> {
        let mut arr = [0u8; 8];
        arr.copy_from_slice(self.take(8, what)?);
        Ok(u64::from_be_bytes(arr))
    }

    fn slips(&mut self, side: &str) -> Result<Vec<Slip>, TransactionError> {
        let count = self.u32(side)? as usize;
        // Check the whole run up front so a hostile count can't make us
        // allocate gigabytes.
        let needed = count.checked_mul(SLIP_SIZE).unwrap_or(usize::MAX);
        if self.remaining() < needed {
            return Err(TransactionError::Malformed(format!(
                "truncated {}-slips: {} declared, {} bytes available",
                side,
                count,
                self.remaining()
            )));
        }

        let mut slips = Vec::with_capacity(count);
        for _ in 0..count {
            let pk = self.take(PUBLIC_KEY_LENGTH, "slip public key")?;
            let public_key = PublicKey::try_from_slice(pk)
                .map_err(|e| TransactionError::Malformed(e.to_string()))?;
            let amount = self.u64("slip amount")?;
            let type_byte = self.u8("slip type")?;
            let slip_type = SlipType::from_byte(type_byte).ok_or_else(|| {
                TransactionError::Malformed(format!("unknown slip type {}", type_byte))
            })?;
            slips.push(Slip::new(public_key, amount).with_type(slip_type));
        }
        Ok(slips)
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

    fn tx_with(from: usize, to: usize, data_len: usize) -> Transaction {
        let mut tx = Transaction::default().with_timestamp(1_700_000_000_000);
        for i in 0..from {
            tx = tx.add_from(
                Slip::new(Keypair::generate().public_key(), 1_000 + i as u64)
                    .with_type(SlipType::ALL[i % SlipType::ALL.len()]),
            );
        }
        for i in 0..to {
            tx = tx.add_to(Slip::new(Keypair::generate().public_key(), u64::MAX - i as u64));
        }
        tx.set_data((0..data_len).map(|b| b as u8).collect::<Vec<u8>>())
    }

    #[test]
    fn empty_transaction_layout() {
        let tx = Transaction::default();
        let bytes = tx.serialize(true).unwrap();
        assert_eq!(bytes, vec![0u8; TX_FIXED_SIZE]);
    }

    #[test]
    fn fields_are_big_endian_in_fixed_order() {
        let pk = PublicKey::from_bytes([0xAB; 32]);
        let tx = Transaction::default()
            .with_timestamp(0x0102_0304_0506_0708)
            .add_to(Slip::new(pk, 0x1122).with_type(SlipType::MinerOutput))
            .set_data(vec![0xEE, 0xFF])
            .with_type(TransactionType::GoldenTicket);
        let bytes = tx.serialize(false).unwrap();

        assert_eq!(&bytes[0..8], &[1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(&bytes[8..12], &[0, 0, 0, 0]); // from-count
        assert_eq!(&bytes[12..16], &[0, 0, 0, 1]); // to-count
        assert_eq!(&bytes[16..48], &[0xAB; 32]);
        assert_eq!(&bytes[48..56], &[0, 0, 0, 0, 0, 0, 0x11, 0x22]);
        assert_eq!(bytes[56], 5);
        assert_eq!(&bytes[57..61], &[0, 0, 0, 2]);
        assert_eq!(&bytes[61..63], &[0xEE, 0xFF]);
        assert_eq!(bytes[63], 1);
        assert_eq!(bytes.len(), 64);
    }

    #[test]
    fn roundtrip_various_shapes() {
        for (from, to, data) in [(0, 0, 0), (1, 0, 0), (0, 3, 1), (2, 2, 300), (5, 1, 17)] {
            let tx = tx_with(from, to, data);
            let bytes = tx.serialize(true).unwrap();
            assert_eq!(bytes.len(), tx.serialized_len(true));
            assert_eq!(Transaction::deserialize(&bytes).unwrap(), tx);
        }
    }

    #[test]
    fn signed_roundtrip_keeps_signature() {
        let wallet = Wallet::generate();
        let mut tx = tx_with(1, 2, 10);
        tx.sign(&wallet).unwrap();

        let decoded = Transaction::deserialize(&tx.serialize(true).unwrap()).unwrap();
        assert_eq!(decoded, tx);
        assert!(decoded.verify_signature_with(&wallet.public_key()));

        let unsigned = Transaction::deserialize(&tx.serialize(false).unwrap()).unwrap();
        assert!(unsigned.signature.is_none());
    }

    #[test]
    fn signature_adds_exactly_64_bytes() {
        let wallet = Wallet::generate();
        let mut tx = tx_with(1, 1, 4);
        let before = tx.serialize(true).unwrap().len();
        tx.sign(&wallet).unwrap();
        assert_eq!(tx.serialize(true).unwrap().len(), before + 64);
        assert_eq!(tx.serialize(false).unwrap().len(), before);
    }

    #[test]
    fn every_truncation_is_rejected() {
        let wallet = Wallet::generate();
        let mut tx = tx_with(1, 1, 8);
        tx.sign(&wallet).unwrap();
        let bytes = tx.serialize(true).unwrap();
        let unsigned_len = tx.serialized_len(false);

        for cut in 0..bytes.len() {
            if cut == unsigned_len {
                // A frame that ends after the type byte is a valid unsigned
                // transaction.
                continue;
            }
            assert!(
                matches!(
                    Transaction::deserialize(&bytes[..cut]),
                    Err(TransactionError::Malformed(_))
                ),
                "prefix of {} bytes was accepted",
                cut
            );
        }
    }

    #[test]
    fn oversized_data_length_is_rejected_without_panicking() {
        let mut bytes = Transaction::default().serialize(false).unwrap();
        // data-length sits at offset 16 for a slipless transaction.
        bytes[16..20].copy_from_slice(&u32::MAX.to_be_bytes());
        assert!(Transaction::deserialize(&bytes).is_err());
    }

    #[test]
    fn hostile_slip_count_is_rejected() {
        let mut bytes = Transaction::default().serialize(false).unwrap();
        bytes[8..12].copy_from_slice(&u32::MAX.to_be_bytes());
        let err = Transaction::deserialize(&bytes).unwrap_err();
        assert!(err.to_string().contains("from-slips"));
    }

    #[test]
    fn unknown_type_bytes_are_rejected() {
        let mut bytes = Transaction::default().serialize(false).unwrap();
        *bytes.last_mut().unwrap() = 0xFF;
        assert!(Transaction::deserialize(&bytes).is_err());

        let mut bytes = tx_with(0, 1, 0).serialize(false).unwrap();
        bytes[12 + 4 + 40] = 0x09;
        assert!(Transaction::deserialize(&bytes).is_err());
    }

    #[test]
    fn stray_trailing_bytes_are_rejected() {
        let mut bytes = Transaction::default().serialize(false).unwrap();
        bytes.extend_from_slice(&[0u8; 10]);
        assert!(Transaction::deserialize(&bytes).is_err());
    }
}
