//! # Handshake State Machine
//!
//! Before the remote node relays anything to us, we have to prove we hold
//! the private key behind the public key we advertise. The node opens with
//! a challenge, we sign it and counter with our own, and the node confirms.
//!
//! ```text
//!   node                                  client
//!    │  step 1 {challenge_mine: c}           │
//!    │──────────────────────────────────────▶│  sign(str(c))
//!    │  step 2 {challenge_mine: c',          │
//!    │          challenge_peer: c,           │
//!    │          challenge_proof: sig}        │
//!    │◀──────────────────────────────────────│
//!    │  step 3                               │
//!    │──────────────────────────────────────▶│  Ready
//! ```
//!
//! The machine is a pure responder: it never sends step 1 itself, and it
//! does no I/O. The connection driver feeds it messages and writes out
//! whatever reply it returns.
//!
//! ## Interop Notes
//!
//! - The signed bytes are the decimal *text* of `challenge_mine` exactly as
//!   the node wrote it. We keep the challenge as a [`serde_json::Number`] so
//!   that text is never re-rendered through a float.
//! - Our own challenge stays below 2^53, where a JavaScript node can still
//!   represent it exactly.
//! - The six sync flags travel as `0`/`1`. Some nodes send booleans, so both
//!   are accepted on input.
//! - Informational fields (`host`, `port`, `keylist`, `modules`, ...) may
//!   arrive as `null`; they read as their defaults. A `step` that is not a
//!   non-negative integer reads as [`UNKNOWN_STEP`] and is ignored.

use chrono::Utc;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Number, Value};
use std::fmt;
use tracing::{debug, info};

use super::envelope::MessageError;
use crate::config::{ClientConfig, MAX_SAFE_INTEGER, PROTOCOL_VERSION};
use crate::crypto::keys::Signature;
use crate::wallet::Wallet;

// ---------------------------------------------------------------------------
// Sync Preferences
// ---------------------------------------------------------------------------

/// How much of the chain this client wants relayed to it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncType {
    /// Nothing is relayed in either direction.
    None,
    /// Blocks in, transactions out. The usual wallet setting.
    #[default]
    Lite,
    /// Everything, both ways.
    Full,
}

/// The six artifact-class flags advertised in `PeerInfo`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncFlags {
    pub sendblks: bool,
    pub sendtxs: bool,
    pub sendgts: bool,
    pub receiveblks: bool,
    pub receivetxs: bool,
    pub receivegts: bool,
}

impl SyncType {
    pub fn flags(self) -> SyncFlags {
        match self {
            SyncType::Full => SyncFlags {
                sendblks: true,
                sendtxs: true,
                sendgts: true,
                receiveblks: true,
                receivetxs: true,
                receivegts: true,
            },
            SyncType::Lite => SyncFlags {
                sendtxs: true,
                receiveblks: true,
                ..SyncFlags::default()
            },
            SyncType::None => SyncFlags::default(),
        }
    }
}

/// Serde adapter: `bool` out as `0`/`1`, in from either a boolean or an
/// integer (non-zero is true).
mod flag {
    use super::*;

    struct FlagVisitor;

    impl<'de> Visitor<'de> for FlagVisitor {
        type Value = bool;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "a boolean or 0/1")
        }

        fn visit_bool<E: de::Error>(self, v: bool) -> Result<bool, E> {
            Ok(v)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<bool, E> {
            Ok(v != 0)
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<bool, E> {
            Ok(v != 0)
        }

        fn visit_unit<E: de::Error>(self) -> Result<bool, E> {
            Ok(false)
        }
    }

    pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(u8::from(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        deserializer.deserialize_any(FlagVisitor)
    }
}

/// Ports arrive as numbers from most nodes and as strings from a few.
mod port {
    use super::*;

    struct PortVisitor;

    impl<'de> Visitor<'de> for PortVisitor {
        type Value = u16;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "a port number")
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<u16, E> {
            u16::try_from(v).map_err(|_| E::custom(format!("port {} out of range", v)))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<u16, E> {
            u16::try_from(v).map_err(|_| E::custom(format!("port {} out of range", v)))
        }

        fn visit_unit<E: de::Error>(self) -> Result<u16, E> {
            Ok(0)
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<u16, E> {
            if v.is_empty() {
                return Ok(0);
            }
            v.parse()
                .map_err(|_| E::custom(format!("`{}` is not a port number", v)))
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u16, D::Error> {
        deserializer.deserialize_any(PortVisitor)
    }
}

/// `null` reads as the field's default.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Step value for anything that is not a non-negative integer.
pub const UNKNOWN_STEP: u64 = 0;

/// Steps are integers, but a peer may send anything; whatever is not a
/// non-negative integer collapses to [`UNKNOWN_STEP`].
fn lenient_step<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let value = Value::deserialize(deserializer)?;
    let step = value.as_u64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.fract() == 0.0 && *f >= 0.0 && *f < u64::MAX as f64)
            .map(|f| f as u64)
    });
    Ok(step.unwrap_or(UNKNOWN_STEP))
}

// ---------------------------------------------------------------------------
// Wire Types
// ---------------------------------------------------------------------------

/// Identity and sync preferences a peer advertises during the handshake.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeerInfo {
    #[serde(rename = "publicKey", deserialize_with = "null_as_default")]
    pub public_key: String,
    #[serde(deserialize_with = "null_as_default")]
    pub host: String,
    #[serde(deserialize_with = "port::deserialize")]
    pub port: u16,
    #[serde(deserialize_with = "null_as_default")]
    pub protocol: String,
    #[serde(deserialize_with = "null_as_default")]
    pub version: String,
    #[serde(deserialize_with = "null_as_default")]
    pub synctype: SyncType,
    #[serde(with = "flag")]
    pub sendblks: bool,
    #[serde(with = "flag")]
    pub sendtxs: bool,
    #[serde(with = "flag")]
    pub sendgts: bool,
    #[serde(with = "flag")]
    pub receiveblks: bool,
    #[serde(with = "flag")]
    pub receivetxs: bool,
    #[serde(with = "flag")]
    pub receivegts: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub keylist: Vec<String>,
}

impl PeerInfo {
    /// Our own advertisement, built from the wallet and config.
    pub fn local(wallet: &Wallet, config: &ClientConfig) -> Self {
        let flags = config.synctype.flags();
        Self {
            public_key: wallet.public_key_hex(),
            host: config.host.clone(),
            port: config.port,
            protocol: config.advertised_protocol().to_string(),
            version: PROTOCOL_VERSION.to_string(),
            synctype: config.synctype,
            sendblks: flags.sendblks,
            sendtxs: flags.sendtxs,
            sendgts: flags.sendgts,
            receiveblks: flags.receiveblks,
            receivetxs: flags.receivetxs,
            receivegts: flags.receivegts,
            keylist: config.keylist.clone(),
        }
    }

    pub fn flags(&self) -> SyncFlags {
        SyncFlags {
            sendblks: self.sendblks,
            sendtxs: self.sendtxs,
            sendgts: self.sendgts,
            receiveblks: self.receiveblks,
            receivetxs: self.receivetxs,
            receivegts: self.receivegts,
        }
    }
}

/// A challenge echoed back in `challenge_peer`. Nodes write it as a number,
/// but a string is tolerated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Challenge {
    Number(Number),
    Text(String),
}

impl fmt::Display for Challenge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Challenge::Number(n) => write!(f, "{}", n),
            Challenge::Text(s) => f.write_str(s),
        }
    }
}

/// One handshake round-trip message. Field names are fixed by the node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandshakeMessage {
    #[serde(default, deserialize_with = "lenient_step")]
    pub step: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub ts: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub challenge_mine: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub challenge_peer: Option<Challenge>,
    /// Hex-encoded Ed25519 signature over the other side's challenge text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub challenge_proof: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub peer: PeerInfo,
    #[serde(default, deserialize_with = "null_as_default")]
    pub modules: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub services: Vec<String>,
}

impl HandshakeMessage {
    pub fn from_value(value: &Value) -> Result<Self, MessageError> {
        Self::deserialize(value)
            .map_err(|e| MessageError::Malformed(format!("handshake: {}", e)))
    }

    pub fn to_value(&self) -> Result<Value, MessageError> {
        serde_json::to_value(self).map_err(|e| MessageError::Malformed(e.to_string()))
    }

    /// The decoded `challenge_proof`, if present and well-formed.
    pub fn proof(&self) -> Option<Signature> {
        self.challenge_proof
            .as_deref()
            .and_then(|hex| Signature::from_hex(hex).ok())
    }
}

// ---------------------------------------------------------------------------
// State Machine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    Idle,
    AwaitingPeerInit,
    ChallengeSent,
    Ready,
}

/// What the driver should do after feeding a message in.
#[derive(Debug, Clone, PartialEq)]
pub enum HandshakeOutcome {
    /// Send this message back to the node.
    Reply(HandshakeMessage),
    /// The handshake just completed.
    Ready,
    /// Unrecognized step; nothing changed.
    Ignored,
}

/// Responder side of the challenge exchange.
#[derive(Debug)]
pub struct HandshakeMachine {
    wallet: Wallet,
    config: ClientConfig,
    state: HandshakeState,
    /// The challenge we sent in step 2, kept for logging and inspection.
    local_challenge: Option<u64>,
}

impl HandshakeMachine {
    pub fn new(wallet: Wallet, config: ClientConfig) -> Self {
        Self {
            wallet,
            config,
            state: HandshakeState::Idle,
            local_challenge: None,
        }
    }

    pub fn state(&self) -> HandshakeState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == HandshakeState::Ready
    }

    pub fn local_challenge(&self) -> Option<u64> {
        self.local_challenge
    }

    /// The socket is up; wait for the node's opening challenge.
    pub fn on_socket_open(&mut self) {
        self.state = HandshakeState::AwaitingPeerInit;
        self.local_challenge = None;
    }

    /// Socket closed. Everything starts over on the next open.
    pub fn reset(&mut self) {
        self.state = HandshakeState::Idle;
        self.local_challenge = None;
    }

    /// Advance on one inbound handshake message.
    pub fn handle(&mut self, message: &HandshakeMessage) -> Result<HandshakeOutcome, MessageError> {
        match message.step {
            1 => {
                let challenge = message.challenge_mine.as_ref().ok_or_else(|| {
                    MessageError::Malformed("handshake step 1 without challenge_mine".into())
                })?;
                let reply = self.respond(challenge);
                self.state = HandshakeState::ChallengeSent;
                debug!(
                    peer = %message.peer.public_key,
                    "answered handshake challenge"
                );
                Ok(HandshakeOutcome::Reply(reply))
            }
            step if step >= 3 => {
                self.state = HandshakeState::Ready;
                info!(peer = %message.peer.public_key, "handshake complete");
                Ok(HandshakeOutcome::Ready)
            }
            step => {
                debug!(step, "ignoring handshake step");
                Ok(HandshakeOutcome::Ignored)
            }
        }
    }

    fn respond(&mut self, peer_challenge: &Number) -> HandshakeMessage {
        let proof = self.wallet.sign(peer_challenge.to_string().as_bytes());
        let mine = fresh_challenge();
        self.local_challenge = Some(mine);

        HandshakeMessage {
            step: 2,
            ts: Utc::now().timestamp_millis().max(0) as u64,
            challenge_mine: Some(Number::from(mine)),
            challenge_peer: Some(Challenge::Number(peer_challenge.clone())),
            challenge_proof: Some(proof.to_hex()),
            peer: PeerInfo::local(&self.wallet, &self.config),
            modules: self.config.modules.clone(),
            services: self.config.services.clone(),
        }
    }
}

/// Uniform in `[0, 2^53)`.
fn fresh_challenge() -> u64 {
    let value = rand::random::<u64>() >> 11;
    debug_assert!(value <= MAX_SAFE_INTEGER);
    value
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn machine() -> (HandshakeMachine, Wallet) {
        let wallet = Wallet::generate();
        let config = ClientConfig {
            modules: vec!["wallet".into()],
            ..ClientConfig::default()
        };
        (HandshakeMachine::new(wallet.clone(), config), wallet)
    }

    fn step(n: u64, challenge: Option<Value>) -> HandshakeMessage {
        let mut value = json!({"step": n, "ts": 1, "peer": {"publicKey": "node"}});
        if let Some(c) = challenge {
            value["challenge_mine"] = c;
        }
        HandshakeMessage::from_value(&value).unwrap()
    }

    #[test]
    fn step_one_produces_verifiable_step_two() {
        let (mut hs, wallet) = machine();
        hs.on_socket_open();
        assert_eq!(hs.state(), HandshakeState::AwaitingPeerInit);

        let c = json!(8_214_554_302_117_u64);
        let outcome = hs.handle(&step(1, Some(c.clone()))).unwrap();
        let HandshakeOutcome::Reply(reply) = outcome else {
            panic!("expected a reply");
        };

        assert_eq!(reply.step, 2);
        assert_eq!(
            reply.challenge_peer,
            Some(Challenge::Number(c.as_u64().unwrap().into()))
        );
        let proof = reply.proof().unwrap();
        assert!(wallet.verify(b"8214554302117", &proof));
        assert_eq!(reply.peer.public_key, wallet.public_key_hex());
        assert_eq!(reply.modules, vec!["wallet".to_string()]);
        assert!(reply.challenge_mine.unwrap().as_u64().unwrap() <= MAX_SAFE_INTEGER);
        assert_eq!(hs.state(), HandshakeState::ChallengeSent);
    }

    #[test]
    fn proof_signs_the_challenge_text_as_written() {
        let (mut hs, wallet) = machine();
        let HandshakeOutcome::Reply(reply) =
            hs.handle(&step(1, Some(json!(12345678901234567890_u64)))).unwrap()
        else {
            panic!("expected a reply");
        };
        assert!(wallet.verify(b"12345678901234567890", &reply.proof().unwrap()));
    }

    #[test]
    fn step_three_and_above_complete() {
        for n in [3, 4, 99] {
            let (mut hs, _) = machine();
            hs.on_socket_open();
            assert_eq!(hs.handle(&step(n, None)).unwrap(), HandshakeOutcome::Ready);
            assert!(hs.is_ready());
        }
    }

    #[test]
    fn other_steps_are_ignored() {
        for n in [0, 2] {
            let (mut hs, _) = machine();
            hs.on_socket_open();
            assert_eq!(hs.handle(&step(n, None)).unwrap(), HandshakeOutcome::Ignored);
            assert_eq!(hs.state(), HandshakeState::AwaitingPeerInit);
        }
    }

    #[test]
    fn step_one_requires_a_challenge() {
        let (mut hs, _) = machine();
        hs.on_socket_open();
        assert!(matches!(
            hs.handle(&step(1, None)),
            Err(MessageError::Malformed(_))
        ));
        assert_eq!(hs.state(), HandshakeState::AwaitingPeerInit);
    }

    #[test]
    fn reset_returns_to_idle() {
        let (mut hs, _) = machine();
        hs.on_socket_open();
        hs.handle(&step(3, None)).unwrap();
        hs.reset();
        assert_eq!(hs.state(), HandshakeState::Idle);
        assert_eq!(hs.local_challenge(), None);
    }

    #[test]
    fn synctype_flag_table() {
        assert_eq!(
            SyncType::Lite.flags(),
            SyncFlags {
                sendblks: false,
                sendtxs: true,
                sendgts: false,
                receiveblks: true,
                receivetxs: false,
                receivegts: false,
            }
        );
        assert_eq!(SyncType::None.flags(), SyncFlags::default());
        let full = SyncType::Full.flags();
        assert!(full.sendblks && full.sendgts && full.receivetxs && full.receivegts);
    }

    #[test]
    fn flags_are_written_as_integers_and_read_leniently() {
        let wallet = Wallet::generate();
        let config = ClientConfig::default();
        let value = serde_json::to_value(PeerInfo::local(&wallet, &config)).unwrap();
        assert_eq!(value["sendtxs"], json!(1));
        assert_eq!(value["sendblks"], json!(0));
        assert_eq!(value["synctype"], json!("lite"));

        let peer: PeerInfo = serde_json::from_value(json!({
            "publicKey": "abc",
            "port": "12101",
            "sendblks": true,
            "receivetxs": 1,
            "synctype": "full",
        }))
        .unwrap();
        assert!(peer.sendblks && peer.receivetxs && !peer.sendtxs);
        assert_eq!(peer.port, 12101);
        assert_eq!(peer.synctype, SyncType::Full);
    }

    #[test]
    fn null_informational_fields_do_not_block_step_one() {
        let (mut hs, wallet) = machine();
        hs.on_socket_open();
        let msg = HandshakeMessage::from_value(&json!({
            "step": 1,
            "ts": null,
            "challenge_mine": 42,
            "peer": {
                "publicKey": "abc",
                "host": null,
                "port": null,
                "protocol": null,
                "version": null,
                "synctype": null,
                "sendblks": null,
                "keylist": null,
            },
            "modules": null,
            "services": null,
        }))
        .unwrap();
        assert_eq!(msg.peer.host, "");
        assert_eq!(msg.peer.port, 0);
        assert!(msg.peer.keylist.is_empty() && msg.modules.is_empty());

        let HandshakeOutcome::Reply(reply) = hs.handle(&msg).unwrap() else {
            panic!("expected a reply");
        };
        assert!(wallet.verify(b"42", &reply.proof().unwrap()));
        assert_eq!(hs.state(), HandshakeState::ChallengeSent);
    }

    #[test]
    fn null_peer_reads_as_default() {
        let msg = HandshakeMessage::from_value(&json!({"step": 3, "peer": null})).unwrap();
        assert_eq!(msg.peer, PeerInfo::default());
    }

    #[test]
    fn odd_step_values_are_ignored_not_rejected() {
        for raw in [json!(-1), json!(2.5), json!("2"), json!(null), json!({"n": 3})] {
            let msg = HandshakeMessage::from_value(&json!({"step": raw})).unwrap();
            assert_eq!(msg.step, UNKNOWN_STEP, "step {raw}");

            let (mut hs, _) = machine();
            hs.on_socket_open();
            assert_eq!(hs.handle(&msg).unwrap(), HandshakeOutcome::Ignored);
            assert_eq!(hs.state(), HandshakeState::AwaitingPeerInit);
        }
    }

    #[test]
    fn integral_float_step_counts() {
        let msg = HandshakeMessage::from_value(&json!({"step": 3.0})).unwrap();
        assert_eq!(msg.step, 3);
    }

    #[test]
    fn string_challenge_peer_is_accepted() {
        let msg = HandshakeMessage::from_value(&json!({
            "step": 3,
            "challenge_peer": "42",
        }))
        .unwrap();
        assert_eq!(msg.challenge_peer, Some(Challenge::Text("42".into())));
        assert_eq!(msg.challenge_peer.unwrap().to_string(), "42");
    }
}
