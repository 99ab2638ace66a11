//! Slips: the typed, amount-bearing inputs and outputs of a transaction.

use serde::{Deserialize, Serialize};

use super::json::nolan;
use super::types::SlipType;
use crate::crypto::keys::PublicKey;

/// One input or output record.
///
/// Only `public_key`, `amount` and `slip_type` are part of the binary frame.
/// `index`, `block_id` and `tx_ordinal` locate a spent output on the remote
/// chain and only travel in the JSON form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slip {
    pub public_key: PublicKey,

    /// Amount in Nolan.
    #[serde(with = "nolan")]
    pub amount: u64,

    #[serde(rename = "type", default)]
    pub slip_type: SlipType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<u8>,

    #[serde(default, skip_serializing_if = "Option::is_none", with = "nolan::option")]
    pub block_id: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none", with = "nolan::option")]
    pub tx_ordinal: Option<u64>,
}

impl Slip {
    /// A `Normal` slip paying `amount` Nolan to `public_key`.
    pub fn new(public_key: PublicKey, amount: u64) -> Self {
        Self {
            public_key,
            amount,
            slip_type: SlipType::Normal,
            index: None,
            block_id: None,
            tx_ordinal: None,
        }
    }

    pub fn with_type(mut self, slip_type: SlipType) -> Self {
        self.slip_type = slip_type;
        self
    }

    pub fn with_index(mut self, index: u8) -> Self {
        self.index = Some(index);
        self
    }

    pub fn with_block_id(mut self, block_id: u64) -> Self {
        self.block_id = Some(block_id);
        self
    }

    pub fn with_tx_ordinal(mut self, tx_ordinal: u64) -> Self {
        self.tx_ordinal = Some(tx_ordinal);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::Keypair;

    #[test]
    fn builder_sets_optional_locators() {
        let pk = Keypair::generate().public_key();
        let slip = Slip::new(pk, 10)
            .with_type(SlipType::Atr)
            .with_index(1)
            .with_block_id(42)
            .with_tx_ordinal(3);
        assert_eq!(slip.slip_type, SlipType::Atr);
        assert_eq!(slip.index, Some(1));
        assert_eq!(slip.block_id, Some(42));
        assert_eq!(slip.tx_ordinal, Some(3));
    }

    #[test]
    fn optional_locators_are_omitted_from_json() {
        let pk = Keypair::generate().public_key();
        let value = serde_json::to_value(Slip::new(pk, 7)).unwrap();
        let obj = value.as_object().unwrap();
        assert_eq!(obj.len(), 3);
        assert_eq!(value["amount"], serde_json::json!("7"));
    }
}
