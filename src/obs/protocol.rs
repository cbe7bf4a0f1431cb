//! OBS WebSocket v5 message envelopes
//!
//! Every frame is a JSON object `{"op": <opcode>, "d": {...}}`. Only the
//! handful of messages needed to identify and fire requests are modelled.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Opcodes used by this client
pub mod op {
    pub const HELLO: u8 = 0;
    pub const IDENTIFY: u8 = 1;
    pub const IDENTIFIED: u8 = 2;
    pub const EVENT: u8 = 5;
    pub const REQUEST: u8 = 6;
    pub const REQUEST_RESPONSE: u8 = 7;
}

/// Default RPC version sent in Identify
pub const RPC_VERSION: u32 = 1;

/// Raw frame with an untyped payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub op: u8,
    #[serde(default)]
    pub d: Value,
}

impl Envelope {
    pub fn decode(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// Deserialize the `d` payload
    pub fn payload<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        T::deserialize(&self.d)
    }
}

/// Serialize `data` as the payload of an `op` frame
pub fn encode<T: Serialize>(op: u8, data: &T) -> serde_json::Result<String> {
    serde_json::to_string(&Envelope {
        op,
        d: serde_json::to_value(data)?,
    })
}

/// Server greeting (op 0)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hello {
    #[serde(default)]
    pub obs_web_socket_version: String,
    #[serde(default)]
    pub rpc_version: u32,
    #[serde(default)]
    pub authentication: Option<AuthChallenge>,
}

/// Present in Hello when the server has a password set
#[derive(Debug, Clone, Deserialize)]
pub struct AuthChallenge {
    pub challenge: String,
    pub salt: String,
}

/// Client identification (op 1)
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Identify {
    pub rpc_version: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authentication: Option<String>,
    /// Event subscription bitmask; 0 keeps the server from pushing events
    /// between our request/response pairs
    pub event_subscriptions: u32,
}

/// Request (op 6)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    pub request_type: String,
    pub request_id: String,
}

/// Request response (op 7)
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestResponse {
    #[serde(default)]
    pub request_type: String,
    #[serde(default)]
    pub request_id: String,
    pub request_status: RequestStatus,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RequestStatus {
    pub result: bool,
    pub code: u32,
    #[serde(default)]
    pub comment: Option<String>,
}
