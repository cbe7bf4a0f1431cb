//! OBS connection lifecycle
//!
//! Owns the socket and the connected/disconnected state. Only the methods
//! here change the state; everything else reads it through [`ObsConnection::state`].
//!
//! Requests are fire-and-forget: after each request exactly one reply is read
//! so the read side stays aligned with the server, but the reply's
//! `requestId` is not matched against ours.

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

use super::auth;
use super::protocol::{self, op, Envelope, Hello, Identify, Request, RequestResponse};
use super::transport::{Connector, Transport, TransportError};
use crate::dispatch::ActionSink;
use crate::hotkeys::Action;

#[derive(Debug, Error)]
pub enum ObsError {
    #[error("failed to connect to OBS at {url}: {source}")]
    Connection {
        url: String,
        #[source]
        source: TransportError,
    },

    #[error("OBS handshake failed: {0}")]
    Handshake(String),

    #[error("failed to send {request_type} request: {source}")]
    Send {
        request_type: String,
        #[source]
        source: TransportError,
    },

    #[error("not connected to OBS")]
    NotConnected,
}

/// Public view of the connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connected,
}

/// Connection parameters
#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    pub url: String,
    pub password: Option<String>,
    pub rpc_version: u32,
    /// Upper bound for dialing and for each read/write
    pub io_timeout: Duration,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            url: "ws://localhost:4455".to_string(),
            password: None,
            rpc_version: protocol::RPC_VERSION,
            io_timeout: Duration::from_secs(10),
        }
    }
}

/// Bounded startup retry
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            delay: Duration::from_secs(30),
        }
    }
}

enum Link<T> {
    Disconnected,
    Connected(T),
}

/// OBS WebSocket client
pub struct ObsConnection<C: Connector> {
    connector: C,
    settings: ConnectionSettings,
    link: Link<C::Transport>,
}

impl<C: Connector> ObsConnection<C> {
    pub fn new(connector: C, settings: ConnectionSettings) -> Self {
        Self {
            connector,
            settings,
            link: Link::Disconnected,
        }
    }

    pub fn state(&self) -> ConnectionState {
        match self.link {
            Link::Disconnected => ConnectionState::Disconnected,
            Link::Connected(_) => ConnectionState::Connected,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    pub fn url(&self) -> &str {
        &self.settings.url
    }

    /// Dial, read Hello, send Identify, and wait for Identified.
    ///
    /// On any failure the state stays `Disconnected` and the half-open
    /// transport is closed.
    pub async fn connect(&mut self) -> Result<(), ObsError> {
        self.disconnect().await;

        let limit = self.settings.io_timeout;
        let mut transport = timed(limit, self.connector.connect(&self.settings.url))
            .await
            .map_err(|source| connection_error(&self.settings.url, source))?;

        match handshake(&mut transport, &self.settings).await {
            Ok(()) => {
                info!("Successfully identified to OBS WebSocket");
                self.link = Link::Connected(transport);
                Ok(())
            },
            Err(e) => {
                transport.close().await;
                Err(e)
            },
        }
    }

    /// Try [`connect`](Self::connect) up to `policy.max_attempts` times.
    ///
    /// Returns the attempt number that succeeded, or `None` when every
    /// attempt failed.
    pub async fn connect_with_retry(&mut self, policy: RetryPolicy) -> Option<u32> {
        let max = policy.max_attempts.max(1);
        for attempt in 1..=max {
            match self.connect().await {
                Ok(()) => return Some(attempt),
                Err(e) => {
                    warn!("Connection attempt {}/{} failed: {}", attempt, max, e);
                    if attempt < max {
                        info!("Waiting {:?} before retrying...", policy.delay);
                        sleep(policy.delay).await;
                    }
                },
            }
        }
        None
    }

    /// Send one request and consume exactly one reply.
    ///
    /// When disconnected, a single reconnect is attempted first; if it fails
    /// the request is dropped. Any I/O failure leaves the connection
    /// `Disconnected`.
    pub async fn send_request(&mut self, request_type: &str) -> Result<(), ObsError> {
        if !self.is_connected() {
            info!("Not connected to OBS. Reconnecting...");
            self.connect().await?;
        }

        let request_id = format!("{}_{}", request_type, chrono::Utc::now().timestamp_millis());
        let limit = self.settings.io_timeout;

        let result = match &mut self.link {
            Link::Connected(transport) => {
                exchange(transport, limit, request_type, request_id).await
            },
            Link::Disconnected => return Err(ObsError::NotConnected),
        };

        match result {
            Ok(reply) => {
                log_reply(request_type, &reply);
                Ok(())
            },
            Err(source) => {
                self.disconnect().await;
                Err(ObsError::Send {
                    request_type: request_type.to_string(),
                    source,
                })
            },
        }
    }

    /// Send the request bound to `action`
    pub async fn send_action(&mut self, action: Action) -> Result<(), ObsError> {
        self.send_request(action.request_type()).await
    }

    /// Close the socket if open. Safe to call any number of times.
    pub async fn close(&mut self) {
        if self.is_connected() {
            info!("Closing OBS connection");
        }
        self.disconnect().await;
    }

    async fn disconnect(&mut self) {
        if let Link::Connected(mut transport) = std::mem::replace(&mut self.link, Link::Disconnected)
        {
            transport.close().await;
        }
    }
}

fn connection_error(url: &str, source: TransportError) -> ObsError {
    ObsError::Connection {
        url: url.to_string(),
        source,
    }
}

async fn handshake<T: Transport>(
    transport: &mut T,
    settings: &ConnectionSettings,
) -> Result<(), ObsError> {
    let limit = settings.io_timeout;

    let text = timed(limit, transport.recv_text())
        .await
        .map_err(|source| connection_error(&settings.url, source))?;
    let hello_env = Envelope::decode(&text)
        .map_err(|e| ObsError::Handshake(format!("malformed Hello: {e}")))?;
    if hello_env.op != op::HELLO {
        return Err(ObsError::Handshake(format!(
            "expected Hello (op {}), got op {}",
            op::HELLO,
            hello_env.op
        )));
    }
    let hello: Hello = hello_env
        .payload()
        .map_err(|e| ObsError::Handshake(format!("malformed Hello: {e}")))?;
    info!(
        "Connected to OBS WebSocket v{} (rpc v{})",
        hello.obs_web_socket_version, hello.rpc_version
    );

    let authentication = match (&hello.authentication, &settings.password) {
        (Some(challenge), Some(password)) => Some(auth::authentication_string(
            password,
            &challenge.salt,
            &challenge.challenge,
        )),
        (Some(_), None) => {
            return Err(ObsError::Handshake(
                "OBS requires a password but none is configured".to_string(),
            ));
        },
        (None, _) => None,
    };

    let identify = protocol::encode(
        op::IDENTIFY,
        &Identify {
            rpc_version: settings.rpc_version,
            authentication,
            event_subscriptions: 0,
        },
    )
    .map_err(|e| connection_error(&settings.url, e.into()))?;
    timed(limit, transport.send_text(identify))
        .await
        .map_err(|source| connection_error(&settings.url, source))?;

    let text = timed(limit, transport.recv_text())
        .await
        .map_err(|source| connection_error(&settings.url, source))?;
    let ack = Envelope::decode(&text)
        .map_err(|e| ObsError::Handshake(format!("malformed Identify response: {e}")))?;
    if ack.op != op::IDENTIFIED {
        return Err(ObsError::Handshake(format!(
            "expected Identified (op {}), got op {}",
            op::IDENTIFIED,
            ack.op
        )));
    }

    Ok(())
}

async fn exchange<T: Transport>(
    transport: &mut T,
    limit: Duration,
    request_type: &str,
    request_id: String,
) -> Result<String, TransportError> {
    let text = protocol::encode(
        op::REQUEST,
        &Request {
            request_type: request_type.to_string(),
            request_id,
        },
    )?;
    timed(limit, transport.send_text(text)).await?;
    timed(limit, transport.recv_text()).await
}

fn log_reply(request_type: &str, reply: &str) {
    let Ok(env) = Envelope::decode(reply) else {
        warn!("Unparseable reply to {} request: {}", request_type, reply);
        return;
    };
    if env.op != op::REQUEST_RESPONSE {
        debug!("Reply to {} request was op {}, not a response", request_type, env.op);
        return;
    }
    match env.payload::<RequestResponse>() {
        Ok(resp) if !resp.request_status.result => warn!(
            "Error in {} request: {} (code {})",
            request_type,
            resp.request_status.comment.as_deref().unwrap_or("no comment"),
            resp.request_status.code
        ),
        Ok(resp) => debug!("{} request {} succeeded", resp.request_type, resp.request_id),
        Err(e) => debug!("Malformed response to {} request: {}", request_type, e),
    }
}

async fn timed<T>(
    limit: Duration,
    fut: impl Future<Output = Result<T, TransportError>>,
) -> Result<T, TransportError> {
    timeout(limit, fut)
        .await
        .map_err(|_| TransportError::Timeout(limit))?
}

#[async_trait]
impl<C: Connector> ActionSink for ObsConnection<C> {
    async fn perform(&mut self, action: Action) {
        info!("{}...", action);
        if let Err(e) = self.send_action(action).await {
            warn!("{} failed: {}", action, e);
        }
    }
}
