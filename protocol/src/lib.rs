// Copyright (c) 2026 wirepeer contributors. MIT License.
// See LICENSE for details.

//! # wirepeer — Peer Wire-Protocol Client
//!
//! A client-side endpoint for a node's peer protocol. It opens one
//! persistent WebSocket to a remote node, proves its identity with a
//! signed challenge, then exchanges JSON envelopes carrying transactions
//! and blocks. Transactions are built and signed locally in the node's
//! fixed binary format before they ever touch the socket.
//!
//! The remote node is not ours. Its byte layout, its handshake steps and
//! its field names are the contract, and this crate's job is to match them
//! exactly. It does not validate blocks, run consensus or keep a ledger; it
//! trusts what the node says and only vouches for its own wire format and
//! its own state machines.
//!
//! ## Architecture
//!
//! - **crypto** — Ed25519 keys, signatures and raw-byte helpers.
//! - **wallet** — One keypair, signing as a capability, JSON persistence.
//! - **transaction** — Slips, the builder, the binary codec, JSON form, signing.
//! - **network** — Envelope, handshake machine, event bus, router, connection.
//! - **query** — HTTP helpers for balance, stats, peers and versions.
//! - **client** — [`PeerClient`](client::PeerClient), the facade over all of it.
//! - **config** — Wire constants and [`ClientConfig`](config::ClientConfig).
//! - **error** — [`ClientError`](error::ClientError), the crate-level error.
//!
//! ## Ground Rules
//!
//! 1. Every 64-bit quantity crosses JSON as an exact integer, never a float.
//! 2. A signature never covers itself: it is always over `serialize(false)`.
//! 3. One task owns the socket. Everybody else sends it messages.

pub mod client;
pub mod config;
pub mod crypto;
pub mod error;
pub mod network;
pub mod query;
pub mod transaction;
pub mod wallet;

pub use client::PeerClient;
pub use error::ClientError;
