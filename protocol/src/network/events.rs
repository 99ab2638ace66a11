//! # Event Bus
//!
//! Per-client publish/subscribe. Each client owns its own bus, so two
//! clients in one process never hear each other's traffic.
//!
//! Subscribers get an unbounded tokio receiver. Publishing is a lock, a
//! clone and a non-blocking send per subscriber; a slow consumer only grows
//! its own queue and never stalls the connection driver. Receivers that were
//! dropped are pruned the next time their channel is published to.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::trace;

use crate::transaction::Transaction;

/// Typed channel keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Channel {
    Transaction,
    Block,
    Connected,
    Disconnected,
    Error,
    /// Any other request tag, published as `message:<tag>`.
    Message(String),
}

impl Channel {
    pub fn message(tag: impl Into<String>) -> Self {
        Channel::Message(tag.into())
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Transaction => f.write_str("transaction"),
            Channel::Block => f.write_str("block"),
            Channel::Connected => f.write_str("connected"),
            Channel::Disconnected => f.write_str("disconnected"),
            Channel::Error => f.write_str("error"),
            Channel::Message(tag) => write!(f, "message:{}", tag),
        }
    }
}

/// What subscribers receive.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    Transaction(Box<Transaction>),
    Block(Value),
    Connected,
    Disconnected,
    Error(String),
    Message { tag: String, data: Value },
}

impl ClientEvent {
    /// The channel this event is delivered on.
    pub fn channel(&self) -> Channel {
        match self {
            ClientEvent::Transaction(_) => Channel::Transaction,
            ClientEvent::Block(_) => Channel::Block,
            ClientEvent::Connected => Channel::Connected,
            ClientEvent::Disconnected => Channel::Disconnected,
            ClientEvent::Error(_) => Channel::Error,
            ClientEvent::Message { tag, .. } => Channel::Message(tag.clone()),
        }
    }
}

pub type SubscriptionId = u64;

/// A live subscription. Dropping it (or its receiver) ends delivery.
#[derive(Debug)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub channel: Channel,
    receiver: mpsc::UnboundedReceiver<ClientEvent>,
}

impl Subscription {
    /// Next event, or `None` once the bus is gone or this subscription was
    /// removed.
    pub async fn recv(&mut self) -> Option<ClientEvent> {
        self.receiver.recv().await
    }

    pub fn try_recv(&mut self) -> Option<ClientEvent> {
        self.receiver.try_recv().ok()
    }

    pub fn into_receiver(self) -> mpsc::UnboundedReceiver<ClientEvent> {
        self.receiver
    }
}

type Subscribers = HashMap<Channel, Vec<(SubscriptionId, mpsc::UnboundedSender<ClientEvent>)>>;

/// Cloneable handle to one client's subscriber lists.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

#[derive(Default)]
struct BusInner {
    subscribers: RwLock<Subscribers>,
    next_id: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, channel: Channel) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .subscribers
            .write()
            .entry(channel.clone())
            .or_default()
            .push((id, tx));
        Subscription {
            id,
            channel,
            receiver: rx,
        }
    }

    /// Removes a subscription. Returns whether it existed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subs = self.inner.subscribers.write();
        let mut found = false;
        for list in subs.values_mut() {
            let before = list.len();
            list.retain(|(sid, _)| *sid != id);
            found |= list.len() != before;
        }
        subs.retain(|_, list| !list.is_empty());
        found
    }

    /// Delivers `event` to every live subscriber of its channel. Returns the
    /// number of subscribers reached.
    pub fn publish(&self, event: ClientEvent) -> usize {
        let channel = event.channel();
        let mut subs = self.inner.subscribers.write();
        let Some(list) = subs.get_mut(&channel) else {
            trace!(%channel, "no subscribers");
            return 0;
        };
        list.retain(|(_, tx)| tx.send(event.clone()).is_ok());
        let delivered = list.len();
        if list.is_empty() {
            subs.remove(&channel);
        }
        trace!(%channel, delivered, "published event");
        delivered
    }

    pub fn subscriber_count(&self, channel: &Channel) -> usize {
        self.inner
            .subscribers
            .read()
            .get(channel)
            .map_or(0, |list| list.len())
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let channels = self.inner.subscribers.read().len();
        f.debug_struct("EventBus")
            .field("channels", &channels)
            .finish()
    }
}
