//! # Peer Client
//!
//! The one type most callers need. It bundles a wallet, a connection to one
//! node, the event bus that connection publishes to, and the HTTP query
//! helpers for the same node.
//!
//! ```rust,no_run
//! use wirepeer_protocol::client::PeerClient;
//! use wirepeer_protocol::config::ClientConfig;
//! use wirepeer_protocol::network::Channel;
//! use wirepeer_protocol::transaction::Slip;
//! use wirepeer_protocol::wallet::Wallet;
//!
//! # async fn run() -> Result<(), wirepeer_protocol::error::ClientError> {
//! let wallet = Wallet::generate();
//! let client = PeerClient::new(ClientConfig::default(), wallet.clone())?;
//! let mut blocks = client.subscribe(Channel::Block);
//! client.connect().await?;
//!
//! let mut tx = client
//!     .new_transaction()
//!     .add_from(Slip::new(wallet.public_key(), 1_000))
//!     .add_to(Slip::new(wallet.public_key(), 1_000));
//! client.sign_transaction(&mut tx)?;
//! client.send_transaction(&tx).await?;
//!
//! while let Some(event) = blocks.recv().await {
//!     println!("{:?}", event);
//! }
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use serde_json::Value;
use tracing::info;

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::network::envelope::{tags, Envelope};
use crate::network::events::{Channel, EventBus, Subscription};
use crate::network::transport::{Connector, WebSocketConnector};
use crate::network::{ConnectionManager, ConnectionState};
use crate::query::QueryClient;
use crate::transaction::Transaction;
use crate::wallet::Wallet;

#[derive(Debug, Clone)]
pub struct PeerClient {
    wallet: Wallet,
    connection: ConnectionManager,
    bus: EventBus,
    query: QueryClient,
}

impl PeerClient {
    /// A client speaking WebSocket to `config.url`. Must be called from
    /// inside a tokio runtime; nothing is opened until [`connect`].
    ///
    /// [`connect`]: PeerClient::connect
    pub fn new(config: ClientConfig, wallet: Wallet) -> Result<Self, ClientError> {
        Self::with_connector(config, wallet, Arc::new(WebSocketConnector))
    }

    /// Same, over a caller-supplied transport.
    pub fn with_connector(
        config: ClientConfig,
        wallet: Wallet,
        connector: Arc<dyn Connector>,
    ) -> Result<Self, ClientError> {
        config.validate()?;
        let query = QueryClient::new(&config)?;
        let bus = EventBus::new();
        info!(url = %config.url, public_key = %wallet.public_key_hex(), "client created");
        let connection = ConnectionManager::spawn(config, wallet.clone(), bus.clone(), connector);
        Ok(Self {
            wallet,
            connection,
            bus,
            query,
        })
    }

    pub async fn connect(&self) -> Result<(), ClientError> {
        self.connection.connect().await
    }

    pub async fn disconnect(&self) -> Result<(), ClientError> {
        self.connection.disconnect().await
    }

    pub fn subscribe(&self, channel: Channel) -> Subscription {
        self.bus.subscribe(channel)
    }

    pub fn unsubscribe(&self, subscription: &Subscription) -> bool {
        self.bus.unsubscribe(subscription.id)
    }

    pub fn is_ready(&self) -> bool {
        self.connection.is_ready()
    }

    pub fn state(&self) -> ConnectionState {
        self.connection.state()
    }

    pub fn wallet(&self) -> &Wallet {
        &self.wallet
    }

    pub fn events(&self) -> &EventBus {
        &self.bus
    }

    pub fn connection(&self) -> &ConnectionManager {
        &self.connection
    }

    pub fn query(&self) -> &QueryClient {
        &self.query
    }

    /// An empty transaction stamped with the current time.
    pub fn new_transaction(&self) -> Transaction {
        Transaction::new()
    }

    /// Signs with this client's wallet.
    pub fn sign_transaction(&self, tx: &mut Transaction) -> Result<(), ClientError> {
        tx.sign(&self.wallet)?;
        Ok(())
    }

    /// Sends a transaction as the hex of its signed binary frame. Requires a
    /// completed handshake.
    pub async fn send_transaction(&self, tx: &Transaction) -> Result<(), ClientError> {
        if !self.is_ready() {
            return Err(ClientError::NotConnected);
        }
        let frame = tx.serialize(true)?;
        self.connection
            .send(Envelope::new(tags::TRANSACTION, Value::String(hex::encode(frame))))
            .await
    }

    /// Sends an arbitrary envelope. Only requires an open socket.
    pub async fn send(&self, request: &str, data: Value) -> Result<(), ClientError> {
        self.connection.send(Envelope::new(request, data)).await
    }

    /// Balance of this client's wallet, in Nolan.
    pub async fn balance(&self) -> Result<u64, ClientError> {
        self.query.balance(&self.wallet.public_key_hex()).await
    }
}
