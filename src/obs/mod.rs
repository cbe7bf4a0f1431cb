//! OBS Studio WebSocket (v5) client
//!
//! A minimal request-only client: identify without event subscriptions, fire
//! requests, consume one reply each, reconnect on demand.

pub mod auth;
pub mod connection;
pub mod protocol;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use connection::{ConnectionSettings, ConnectionState, ObsConnection, ObsError, RetryPolicy};
pub use transport::{Connector, Transport, TransportError, WsConnector};
