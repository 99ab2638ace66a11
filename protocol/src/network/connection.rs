//! # Connection Manager
//!
//! One socket per client, owned by one driver task. Everything else talks
//! to the driver through a command channel, so writes to the socket are
//! serialized by construction and nobody reaches into socket internals.
//!
//! ```text
//!  ConnectionManager ──Command──▶ Driver ──frames──▶ socket
//!        ▲                          │  ◀──frames───
//!        └──── watch<State> ────────┘  ──events──▶ EventBus
//! ```
//!
//! ## Lifecycle
//!
//! ```text
//! Disconnected ─connect()─▶ Connecting ─open─▶ SocketOpen
//!      ▲                                          │ step 1 answered
//!      │                                          ▼
//!      └──── close / disconnect() ◀── Ready ◀─ HandshakeInProgress
//! ```
//!
//! ## Reconnection
//!
//! Only an unexpected close of a socket that actually opened triggers a
//! retry. Each close schedules exactly one attempt after a fixed delay, up
//! to `max_reconnect_attempts`; every successful open resets the count. A
//! failed attempt is treated like another close. Once the budget is spent
//! the driver goes quiet until someone calls `connect()` again.
//! `disconnect()` switches reconnection off and cancels anything pending.
//!
//! A node may challenge again after `Ready`. The challenge is answered but
//! the connection stays `Ready`, and the closing step 3 does not publish a
//! second `connected`.
//!
//! The handshake deadline is enforced on the caller's side of `connect()`.
//! Missing it fails the call but leaves the socket as it is.

use std::future::pending;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::{SinkExt, StreamExt};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use super::envelope::{tags, Envelope};
use super::events::{ClientEvent, EventBus};
use super::handshake::{HandshakeMachine, HandshakeOutcome};
use super::router::MessageRouter;
use super::transport::{Connector, FrameSink, FrameStream};
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::wallet::Wallet;

// ---------------------------------------------------------------------------
// Public State
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    SocketOpen,
    HandshakeInProgress,
    Ready,
    Closing,
}

impl ConnectionState {
    /// Whether frames can be written right now.
    pub fn is_open(self) -> bool {
        matches!(
            self,
            ConnectionState::SocketOpen
                | ConnectionState::HandshakeInProgress
                | ConnectionState::Ready
        )
    }
}

type Reply<T> = oneshot::Sender<Result<T, ClientError>>;

enum Command {
    Connect(Reply<()>),
    Send(Envelope, Reply<()>),
    Disconnect(oneshot::Sender<()>),
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// Cloneable handle to the connection driver.
///
/// The driver runs until every handle is dropped, then closes the socket.
#[derive(Clone)]
pub struct ConnectionManager {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<ConnectionState>,
    attempts: Arc<AtomicU32>,
    bus: EventBus,
    handshake_timeout: Duration,
}

impl ConnectionManager {
    /// Spawns the driver on the current tokio runtime.
    pub fn spawn(
        config: ClientConfig,
        wallet: Wallet,
        bus: EventBus,
        connector: Arc<dyn Connector>,
    ) -> Self {
        let (commands, inbox) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        let attempts = Arc::new(AtomicU32::new(0));
        let handshake_timeout = config.handshake_timeout();

        let driver = Driver {
            handshake: HandshakeMachine::new(wallet, config.clone()),
            router: MessageRouter::new(bus.clone()),
            bus: bus.clone(),
            auto_reconnect: config.auto_reconnect,
            config,
            connector,
            state: state_tx,
            attempts: attempts.clone(),
            sink: None,
            stream: None,
            opening: None,
            reconnecting: false,
            reconnect_at: None,
            waiters: Vec::new(),
        };
        tokio::spawn(driver.run(inbox));

        Self {
            commands,
            state: state_rx,
            attempts,
            bus,
            handshake_timeout,
        }
    }

    /// Opens the socket and waits for the handshake to finish.
    ///
    /// Resolves at once if already `Ready`, and joins an attempt already in
    /// flight. Fails with [`ClientError::HandshakeTimeout`] if `Ready` is not
    /// reached within the configured window measured from this call.
    pub async fn connect(&self) -> Result<(), ClientError> {
        let (tx, rx) = oneshot::channel();
        self.command(Command::Connect(tx))?;

        match tokio::time::timeout(self.handshake_timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(ClientError::Shutdown),
            Err(_) => {
                let timeout_ms = self.handshake_timeout.as_millis() as u64;
                warn!(timeout_ms, "handshake timed out");
                let err = ClientError::HandshakeTimeout { timeout_ms };
                self.bus.publish(ClientEvent::Error(err.to_string()));
                Err(err)
            }
        }
    }

    /// Closes the socket and turns automatic reconnection off. Idempotent.
    pub async fn disconnect(&self) -> Result<(), ClientError> {
        let (tx, rx) = oneshot::channel();
        self.command(Command::Disconnect(tx))?;
        rx.await.map_err(|_| ClientError::Shutdown)
    }

    /// Writes one envelope. [`ClientError::NotConnected`] unless the socket
    /// is open, whatever the handshake state.
    pub async fn send(&self, envelope: Envelope) -> Result<(), ClientError> {
        if !self.state().is_open() {
            return Err(ClientError::NotConnected);
        }
        let (tx, rx) = oneshot::channel();
        self.command(Command::Send(envelope, tx))?;
        rx.await.map_err(|_| ClientError::Shutdown)?
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn is_ready(&self) -> bool {
        self.state() == ConnectionState::Ready
    }

    /// Reconnection attempts made since the last successful open.
    pub fn reconnect_attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Waits until the state equals `target`.
    pub async fn wait_for_state(&self, target: ConnectionState) -> Result<(), ClientError> {
        let mut rx = self.state.clone();
        rx.wait_for(|state| *state == target)
            .await
            .map(|_| ())
            .map_err(|_| ClientError::Shutdown)
    }

    /// A receiver for every state change.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    fn command(&self, command: Command) -> Result<(), ClientError> {
        self.commands
            .send(command)
            .map_err(|_| ClientError::Shutdown)
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("state", &self.state())
            .field("reconnect_attempts", &self.reconnect_attempts())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

type OpenFuture = BoxFuture<'static, Result<(FrameSink, FrameStream), ClientError>>;

struct Driver {
    config: ClientConfig,
    connector: Arc<dyn Connector>,
    handshake: HandshakeMachine,
    router: MessageRouter,
    bus: EventBus,
    state: watch::Sender<ConnectionState>,
    attempts: Arc<AtomicU32>,
    sink: Option<FrameSink>,
    stream: Option<FrameStream>,
    /// In-flight socket open, if any.
    opening: Option<OpenFuture>,
    /// Whether `opening` was started by the reconnect timer.
    reconnecting: bool,
    reconnect_at: Option<Instant>,
    auto_reconnect: bool,
    /// `connect()` callers waiting for `Ready`.
    waiters: Vec<Reply<()>>,
}

impl Driver {
    async fn run(mut self, mut inbox: mpsc::UnboundedReceiver<Command>) {
        loop {
            tokio::select! {
                command = inbox.recv() => match command {
                    Some(command) => self.on_command(command).await,
                    None => break,
                },
                opened = open_progress(&mut self.opening) => self.on_opened(opened),
                frame = next_frame(&mut self.stream) => self.on_frame(frame).await,
                () = reconnect_due(self.reconnect_at) => self.on_reconnect_due(),
            }
        }

        debug!("all connection handles dropped, shutting down driver");
        self.close_socket().await;
    }

    // -- commands -----------------------------------------------------------

    async fn on_command(&mut self, command: Command) {
        match command {
            Command::Connect(reply) => self.on_connect(reply),
            Command::Send(envelope, reply) => {
                let result = self.write(&envelope).await;
                let _ = reply.send(result);
            }
            Command::Disconnect(reply) => {
                self.on_disconnect().await;
                let _ = reply.send(());
            }
        }
    }

    fn on_connect(&mut self, reply: Reply<()>) {
        if self.current() == ConnectionState::Ready {
            let _ = reply.send(Ok(()));
            return;
        }

        self.auto_reconnect = self.config.auto_reconnect;
        self.waiters.retain(|w| !w.is_closed());
        self.waiters.push(reply);

        if self.sink.is_some() || self.opening.is_some() {
            debug!("joining connection attempt in progress");
            return;
        }

        self.reconnect_at = None;
        self.start_open(false);
    }

    async fn on_disconnect(&mut self) {
        self.auto_reconnect = false;
        self.reconnect_at = None;
        self.opening = None;
        self.reject_waiters("disconnected");

        if self.sink.is_some() {
            self.set_state(ConnectionState::Closing);
            self.close_socket().await;
            self.bus.publish(ClientEvent::Disconnected);
            info!(url = %self.config.url, "disconnected");
        }
        self.handshake.reset();
        self.set_state(ConnectionState::Disconnected);
    }

    async fn write(&mut self, envelope: &Envelope) -> Result<(), ClientError> {
        let sink = self.sink.as_mut().ok_or(ClientError::NotConnected)?;
        let text = envelope.encode()?;
        debug!(request = %envelope.request, bytes = text.len(), "sending frame");
        sink.send(text).await
    }

    // -- socket lifecycle ---------------------------------------------------

    fn start_open(&mut self, reconnecting: bool) {
        let connector = self.connector.clone();
        let url = self.config.url.clone();
        info!(url = %url, reconnecting, "opening socket");

        self.reconnecting = reconnecting;
        self.opening = Some(Box::pin(async move { connector.connect(&url).await }));
        self.set_state(ConnectionState::Connecting);
    }

    fn on_opened(&mut self, result: Result<(FrameSink, FrameStream), ClientError>) {
        self.opening = None;
        match result {
            Ok((sink, stream)) => {
                self.sink = Some(sink);
                self.stream = Some(stream);
                self.attempts.store(0, Ordering::SeqCst);
                self.handshake.on_socket_open();
                self.set_state(ConnectionState::SocketOpen);
                info!(url = %self.config.url, "socket open, awaiting handshake");
            }
            Err(err) => {
                warn!(url = %self.config.url, error = %err, "socket open failed");
                self.bus.publish(ClientEvent::Error(err.to_string()));
                self.set_state(ConnectionState::Disconnected);

                if self.reconnecting {
                    if !self.schedule_reconnect() {
                        self.reject_waiters(&err.to_string());
                    }
                } else {
                    for waiter in self.waiters.drain(..) {
                        let _ = waiter.send(Err(ClientError::Connection(err.to_string())));
                    }
                }
            }
        }
    }

    async fn on_frame(&mut self, frame: Option<Result<String, ClientError>>) {
        match frame {
            None => self.on_closed("socket closed by peer"),
            Some(Ok(text)) => self.on_text(&text).await,
            Some(Err(ClientError::MalformedMessage(err))) => {
                warn!(error = %err, "dropping malformed frame");
                self.bus.publish(ClientEvent::Error(err.to_string()));
            }
            Some(Err(err)) => {
                warn!(error = %err, "socket error");
                self.bus.publish(ClientEvent::Error(err.to_string()));
                self.on_closed("socket error");
            }
        }
    }

    async fn on_text(&mut self, text: &str) {
        let message = match self.router.route(text) {
            Ok(Some(message)) => message,
            Ok(None) => return,
            Err(err) => {
                warn!(error = %err, "failed to decode inbound frame");
                self.bus.publish(ClientEvent::Error(err.to_string()));
                return;
            }
        };

        match self.handshake.handle(&message) {
            Ok(HandshakeOutcome::Reply(reply)) => {
                if self.current() != ConnectionState::Ready {
                    self.set_state(ConnectionState::HandshakeInProgress);
                }
                let sent = match reply.to_value() {
                    Ok(data) => self.write(&Envelope::new(tags::HANDSHAKE, data)).await,
                    Err(err) => Err(err.into()),
                };
                if let Err(err) = sent {
                    warn!(error = %err, "failed to send handshake reply");
                    self.bus.publish(ClientEvent::Error(err.to_string()));
                }
            }
            Ok(HandshakeOutcome::Ready) => {
                if self.current() != ConnectionState::Ready {
                    self.set_state(ConnectionState::Ready);
                    info!(url = %self.config.url, "peer ready");
                    for waiter in self.waiters.drain(..) {
                        let _ = waiter.send(Ok(()));
                    }
                    self.bus.publish(ClientEvent::Connected);
                }
            }
            Ok(HandshakeOutcome::Ignored) => {}
            Err(err) => {
                warn!(error = %err, "bad handshake message");
                self.bus.publish(ClientEvent::Error(err.to_string()));
            }
        }
    }

    /// The socket went away without `disconnect()`.
    fn on_closed(&mut self, reason: &str) {
        self.sink = None;
        self.stream = None;
        self.handshake.reset();
        info!(url = %self.config.url, reason, "socket closed");
        self.bus.publish(ClientEvent::Disconnected);

        if !self.schedule_reconnect() {
            self.reject_waiters(reason);
        }
        self.set_state(ConnectionState::Disconnected);
    }

    // -- reconnection -------------------------------------------------------

    /// Schedules one attempt if the policy allows it.
    fn schedule_reconnect(&mut self) -> bool {
        if !self.auto_reconnect {
            return false;
        }
        let attempts = self.attempts.load(Ordering::SeqCst);
        if attempts >= self.config.max_reconnect_attempts {
            warn!(attempts, "reconnect attempts exhausted, giving up");
            return false;
        }

        let attempt = attempts + 1;
        self.attempts.store(attempt, Ordering::SeqCst);
        let delay = self.config.reconnect_delay();
        self.reconnect_at = Some(Instant::now() + delay);
        info!(
            attempt,
            max = self.config.max_reconnect_attempts,
            delay_ms = delay.as_millis() as u64,
            "reconnect scheduled"
        );
        true
    }

    fn on_reconnect_due(&mut self) {
        self.reconnect_at = None;
        self.start_open(true);
    }

    // -- helpers ------------------------------------------------------------

    fn current(&self) -> ConnectionState {
        *self.state.borrow()
    }

    fn set_state(&self, next: ConnectionState) {
        let prev = self.state.send_replace(next);
        if prev != next {
            debug!(?prev, ?next, "connection state");
        }
    }

    fn reject_waiters(&mut self, reason: &str) {
        for waiter in self.waiters.drain(..) {
            let _ = waiter.send(Err(ClientError::Connection(reason.to_string())));
        }
    }

    async fn close_socket(&mut self) {
        self.stream = None;
        if let Some(mut sink) = self.sink.take() {
            if let Err(err) = sink.close().await {
                debug!(error = %err, "error while closing socket");
            }
        }
    }
}

async fn open_progress(
    opening: &mut Option<OpenFuture>,
) -> Result<(FrameSink, FrameStream), ClientError> {
    match opening {
        Some(fut) => fut.await,
        None => pending().await,
    }
}

async fn next_frame(stream: &mut Option<FrameStream>) -> Option<Result<String, ClientError>> {
    match stream {
        Some(stream) => stream.next().await,
        None => pending().await,
    }
}

async fn reconnect_due(at: Option<Instant>) {
    match at {
        Some(at) => sleep_until(at).await,
        None => pending().await,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
