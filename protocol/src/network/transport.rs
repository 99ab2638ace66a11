//! Socket transport seam.
//!
//! The connection driver only sees a sink of outbound text frames and a
//! stream of inbound ones. [`WebSocketConnector`] backs them with
//! `tokio-tungstenite`; tests swap in an in-memory [`Connector`].

use std::pin::Pin;

use async_trait::async_trait;
use futures::{future, Sink, SinkExt, Stream, StreamExt};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tracing::{debug, trace};

use super::envelope::MessageError;
use crate::error::ClientError;

/// Outbound half: one `String` per text frame.
pub type FrameSink = Pin<Box<dyn Sink<String, Error = ClientError> + Send>>;

/// Inbound half. Ends when the socket closes. A
/// [`ClientError::MalformedMessage`] item is a bad frame on a healthy
/// socket; any other error is fatal to the socket.
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<String, ClientError>> + Send>>;

/// Opens sockets for the connection driver.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    async fn connect(&self, url: &str) -> Result<(FrameSink, FrameStream), ClientError>;
}

/// `ws://` / `wss://` transport.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketConnector;

#[async_trait]
impl Connector for WebSocketConnector {
    async fn connect(&self, url: &str) -> Result<(FrameSink, FrameStream), ClientError> {
        let (socket, response) = connect_async(url)
            .await
            .map_err(|e| ClientError::Connection(format!("websocket connect failed: {e}")))?;
        debug!(url, status = %response.status(), "websocket open");

        let (sink, stream) = socket.split();

        let sink = sink
            .sink_map_err(|e| ClientError::Connection(format!("websocket send failed: {e}")))
            .with(|text: String| future::ready(Ok::<_, ClientError>(Message::Text(text))));

        let stream = stream.filter_map(|message| future::ready(inbound(message)));

        Ok((Box::pin(sink), Box::pin(stream)))
    }
}

/// Maps one tungstenite item to a frame. Control frames are handled by
/// tungstenite itself and skipped here; after a close frame the underlying
/// stream ends on its own.
fn inbound(message: Result<Message, WsError>) -> Option<Result<String, ClientError>> {
    match message {
        Ok(Message::Text(text)) => Some(Ok(text)),
        Ok(Message::Binary(bytes)) => Some(String::from_utf8(bytes).map_err(|_| {
            ClientError::from(MessageError::Malformed("binary frame is not UTF-8".into()))
        })),
        Ok(Message::Close(frame)) => {
            debug!(?frame, "websocket close frame");
            None
        }
        Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => {
            trace!("control frame");
            None
        }
        Err(WsError::ConnectionClosed | WsError::AlreadyClosed) => None,
        Err(e) => Some(Err(ClientError::Connection(format!(
            "websocket receive failed: {e}"
        )))),
    }
}
