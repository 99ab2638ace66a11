//! Inbound frame dispatch.
//!
//! | tag           | goes to                                   |
//! |---------------|-------------------------------------------|
//! | `handshake`   | returned to the driver for the state machine |
//! | `transaction` | decoded, then published on `transaction`  |
//! | `block`       | published raw on `block`                  |
//! | anything else | published on `message:<tag>`             |
//!
//! Decode failures come back as errors for the driver to log and publish.
//! They never touch connection state.

use serde_json::Value;
use tracing::trace;

use super::envelope::{tags, Envelope};
use super::events::{ClientEvent, EventBus};
use super::handshake::HandshakeMessage;
use crate::error::ClientError;
use crate::transaction::{Transaction, TransactionError};

#[derive(Debug, Clone)]
pub struct MessageRouter {
    bus: EventBus,
}

impl MessageRouter {
    pub fn new(bus: EventBus) -> Self {
        Self { bus }
    }

    /// Routes one text frame. A handshake message is handed back instead of
    /// published because only the driver may act on it.
    pub fn route(&self, frame: &str) -> Result<Option<HandshakeMessage>, ClientError> {
        let envelope = Envelope::decode(frame)?;
        trace!(request = %envelope.request, "routing frame");

        match envelope.request.as_str() {
            tags::HANDSHAKE => Ok(Some(HandshakeMessage::from_value(&envelope.data)?)),
            tags::TRANSACTION => {
                let tx = decode_transaction(&envelope.data)?;
                self.bus.publish(ClientEvent::Transaction(Box::new(tx)));
                Ok(None)
            }
            tags::BLOCK => {
                self.bus.publish(ClientEvent::Block(envelope.data));
                Ok(None)
            }
            _ => {
                self.bus.publish(ClientEvent::Message {
                    tag: envelope.request,
                    data: envelope.data,
                });
                Ok(None)
            }
        }
    }
}

/// A transaction payload is either the hex of its binary frame or its JSON
/// object form.
pub fn decode_transaction(data: &Value) -> Result<Transaction, TransactionError> {
    match data {
        Value::String(hex_str) => {
            let bytes = hex::decode(hex_str)
                .map_err(|e| TransactionError::Malformed(format!("payload is not hex: {}", e)))?;
            Transaction::deserialize(&bytes)
        }
        Value::Object(_) => Transaction::from_json(data),
        other => Err(TransactionError::Malformed(format!(
            "unexpected transaction payload: {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::events::Channel;
    use crate::network::handshake::UNKNOWN_STEP;
    use crate::transaction::Slip;
    use crate::wallet::Wallet;
    use serde_json::json;

    fn signed_tx() -> Transaction {
        let wallet = Wallet::generate();
        let mut tx = Transaction::default()
            .with_timestamp(99)
            .add_from(Slip::new(wallet.public_key(), 10))
            .add_to(Slip::new(Wallet::generate().public_key(), 10));
        tx.sign(&wallet).unwrap();
        tx
    }

    #[test]
    fn handshake_is_returned_not_published() {
        let bus = EventBus::new();
        let mut sub = bus.subscribe(Channel::message("handshake"));
        let router = MessageRouter::new(bus);

        let hs = router
            .route(r#"{"request":"handshake","data":{"step":1,"challenge_mine":7}}"#)
            .unwrap()
            .unwrap();
        assert_eq!(hs.step, 1);
        assert_eq!(sub.try_recv(), None);
    }

    #[test]
    fn tolerant_handshake_payloads_route_cleanly() {
        let router = MessageRouter::new(EventBus::new());

        let hs = router
            .route(r#"{"request":"handshake","data":{"step":-1}}"#)
            .unwrap()
            .unwrap();
        assert_eq!(hs.step, UNKNOWN_STEP);

        let hs = router
            .route(
                r#"{"request":"handshake","data":{"step":1,"challenge_mine":42,
                    "peer":{"publicKey":"abc","host":null,"port":null,"keylist":null},
                    "modules":null}}"#,
            )
            .unwrap()
            .unwrap();
        assert_eq!(hs.step, 1);
        assert_eq!(hs.peer.public_key, "abc");
    }

    #[test]
    fn decode_errors_read_with_a_single_prefix() {
        let router = MessageRouter::new(EventBus::new());
        let err = router.route("{broken").unwrap_err();
        assert!(err.to_string().starts_with("malformed message: "));
        assert!(!err.to_string().contains("malformed message: malformed message"));
    }

    #[test]
    fn binary_transaction_is_decoded_and_published() {
        let bus = EventBus::new();
        let mut sub = bus.subscribe(Channel::Transaction);
        let router = MessageRouter::new(bus);

        let tx = signed_tx();
        let frame = Envelope::new("transaction", json!(hex::encode(tx.serialize(true).unwrap())))
            .encode()
            .unwrap();
        assert!(router.route(&frame).unwrap().is_none());
        assert_eq!(sub.try_recv(), Some(ClientEvent::Transaction(Box::new(tx))));
    }

    #[test]
    fn json_transaction_is_decoded() {
        let tx = signed_tx();
        let decoded = decode_transaction(&tx.to_json().unwrap()).unwrap();
        assert_eq!(decoded, tx);
    }

    #[test]
    fn block_and_unknown_tags_are_published_raw() {
        let bus = EventBus::new();
        let mut blocks = bus.subscribe(Channel::Block);
        let mut stats = bus.subscribe(Channel::message("stats"));
        let router = MessageRouter::new(bus);

        router
            .route(r#"{"request":"block","data":{"id":"18446744073709551615"}}"#)
            .unwrap();
        router.route(r#"{"request":"stats","data":[1]}"#).unwrap();

        assert_eq!(
            blocks.try_recv(),
            Some(ClientEvent::Block(json!({"id": "18446744073709551615"})))
        );
        assert_eq!(
            stats.try_recv(),
            Some(ClientEvent::Message {
                tag: "stats".into(),
                data: json!([1])
            })
        );
    }

    #[test]
    fn decode_failures_are_errors() {
        let router = MessageRouter::new(EventBus::new());
        assert!(matches!(
            router.route("{"),
            Err(ClientError::MalformedMessage(_))
        ));
        assert!(matches!(
            router.route(r#"{"request":"transaction","data":"zz"}"#),
            Err(ClientError::MalformedTransaction(_))
        ));
        assert!(matches!(
            router.route(r#"{"request":"transaction","data":"0001"}"#),
            Err(ClientError::MalformedTransaction(_))
        ));
        assert!(matches!(
            router.route(r#"{"request":"transaction","data":5}"#),
            Err(ClientError::MalformedTransaction(_))
        ));
        assert!(matches!(
            router.route(r#"{"request":"handshake","data":"x"}"#),
            Err(ClientError::MalformedMessage(_))
        ));
    }
}
