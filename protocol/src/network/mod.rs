//! # Network Module
//!
//! Everything between the socket and the rest of the client: framing,
//! the challenge handshake, dispatch of inbound traffic and the connection
//! lifecycle with its reconnection policy.
//!
//! ## Architecture
//!
//! ```text
//! envelope.rs    — {"request", "data"} framing and MessageError
//! handshake.rs   — responder-side challenge/response state machine
//! events.rs      — per-client typed publish/subscribe
//! router.rs      — inbound dispatch by request tag
//! transport.rs   — Connector seam, tokio-tungstenite implementation
//! connection.rs  — ConnectionManager and its driver task
//! ```
//!
//! ## Design Decisions
//!
//! - One task owns the socket. Callers send it commands over a channel and
//!   observe its state through a `watch`, so there is no lock around the
//!   socket and no way to interleave two writes.
//! - The subscriber lists are the only shared mutable state, behind a
//!   `parking_lot::RwLock`. Delivery goes through unbounded channels, so
//!   the driver never waits on a subscriber.
//! - Inbound frames are handled strictly in arrival order. Nothing here
//!   reorders or deduplicates.

pub mod connection;
pub mod envelope;
pub mod events;
pub mod handshake;
pub mod router;
pub mod transport;

pub use connection::{ConnectionManager, ConnectionState};
pub use envelope::{Envelope, MessageError};
pub use events::{Channel, ClientEvent, EventBus, Subscription, SubscriptionId};
pub use handshake::{
    HandshakeMachine, HandshakeMessage, HandshakeOutcome, HandshakeState, PeerInfo, SyncFlags,
    SyncType,
};
pub use router::MessageRouter;
pub use transport::{Connector, FrameSink, FrameStream, WebSocketConnector};
