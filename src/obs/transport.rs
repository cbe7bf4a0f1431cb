//! Text-message transport under the OBS connection
//!
//! The connection manager only needs "send a text frame" and "receive the
//! next text frame", so the WebSocket sits behind a small trait pair that
//! tests replace with scripted peers.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::debug;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("connection closed by peer")]
    Closed,

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),
}

/// A connected duplex text channel
#[async_trait]
pub trait Transport: Send {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError>;

    /// Next text frame; control frames are skipped
    async fn recv_text(&mut self) -> Result<String, TransportError>;

    /// Close the channel. Errors are ignored, the peer may already be gone.
    async fn close(&mut self);
}

/// Opens transports to a URL
#[async_trait]
pub trait Connector: Send + Sync {
    type Transport: Transport;

    async fn connect(&self, url: &str) -> Result<Self::Transport, TransportError>;
}

/// tokio-tungstenite client
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

pub struct WsTransport {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl Connector for WsConnector {
    type Transport = WsTransport;

    async fn connect(&self, url: &str) -> Result<WsTransport, TransportError> {
        let (stream, response) = connect_async(url).await?;
        debug!("WebSocket upgrade to {} answered {}", url, response.status());
        Ok(WsTransport { stream })
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        self.stream.send(Message::Text(text)).await?;
        Ok(())
    }

    async fn recv_text(&mut self) -> Result<String, TransportError> {
        while let Some(message) = self.stream.next().await {
            match message? {
                Message::Text(text) => return Ok(text),
                Message::Binary(data) => return Ok(String::from_utf8_lossy(&data).into_owned()),
                Message::Close(frame) => {
                    debug!("OBS sent close frame: {:?}", frame);
                    return Err(TransportError::Closed);
                },
                // Pongs are queued by tungstenite and flushed on the next write
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {},
            }
        }
        Err(TransportError::Closed)
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.close(None).await {
            debug!("Ignoring error while closing WebSocket: {}", e);
        }
    }
}
