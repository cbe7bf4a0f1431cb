//! Scripted OBS peers for tests
//!
//! Each dial pops the next [`Dial`] from the script: either a refusal or a
//! fake server whose outgoing messages are listed up front. Everything the
//! client does is recorded in a shared [`Wire`].

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use super::transport::{Connector, Transport, TransportError};

/// What the client did across all connections
#[derive(Debug, Default, Clone)]
pub(crate) struct Wire {
    pub dials: usize,
    pub sent: Vec<Value>,
    pub received: usize,
    pub closes: usize,
}

impl Wire {
    /// Sent frames with the given opcode
    pub fn sent_op(&self, op: u8) -> Vec<&Value> {
        self.sent.iter().filter(|v| v["op"] == op).collect()
    }
}

pub(crate) enum Incoming {
    Message(String),
    /// Read fails as if the peer went away
    Drop,
    /// Read never completes
    Hang,
}

pub(crate) enum Dial {
    Refuse,
    Accept(ServerScript),
}

/// Messages a fake server will send, in order
pub(crate) struct ServerScript {
    incoming: VecDeque<Incoming>,
    /// Writes accepted before every further write fails
    writable: usize,
}

impl ServerScript {
    pub fn empty() -> Self {
        Self {
            incoming: VecDeque::new(),
            writable: usize::MAX,
        }
    }

    /// Hello followed by Identified
    pub fn obs() -> Self {
        Self::empty().send(hello()).send(identified())
    }

    pub fn send(mut self, value: Value) -> Self {
        self.incoming.push_back(Incoming::Message(value.to_string()));
        self
    }

    pub fn send_raw(mut self, text: &str) -> Self {
        self.incoming.push_back(Incoming::Message(text.to_string()));
        self
    }

    /// Answer `n` requests successfully
    pub fn respond(mut self, n: usize) -> Self {
        for _ in 0..n {
            self = self.send(response(true));
        }
        self
    }

    pub fn then_drop(mut self) -> Self {
        self.incoming.push_back(Incoming::Drop);
        self
    }

    pub fn then_hang(mut self) -> Self {
        self.incoming.push_back(Incoming::Hang);
        self
    }

    pub fn fail_writes_after(mut self, n: usize) -> Self {
        self.writable = n;
        self
    }
}

pub(crate) fn hello() -> Value {
    json!({"op": 0, "d": {"obsWebSocketVersion": "5.4.2", "rpcVersion": 1}})
}

pub(crate) fn hello_with_auth(challenge: &str, salt: &str) -> Value {
    json!({"op": 0, "d": {
        "obsWebSocketVersion": "5.4.2",
        "rpcVersion": 1,
        "authentication": {"challenge": challenge, "salt": salt}
    }})
}

pub(crate) fn identified() -> Value {
    json!({"op": 2, "d": {"negotiatedRpcVersion": 1}})
}

pub(crate) fn response(ok: bool) -> Value {
    json!({"op": 7, "d": {
        "requestType": "ToggleRecord",
        "requestId": "ToggleRecord_0",
        "requestStatus": if ok {
            json!({"result": true, "code": 100})
        } else {
            json!({"result": false, "code": 501, "comment": "Output not running"})
        }
    }})
}

#[derive(Clone)]
pub(crate) struct ScriptedConnector {
    dials: Arc<Mutex<VecDeque<Dial>>>,
    wire: Arc<Mutex<Wire>>,
}

impl ScriptedConnector {
    pub fn new() -> Self {
        Self {
            dials: Arc::new(Mutex::new(VecDeque::new())),
            wire: Arc::new(Mutex::new(Wire::default())),
        }
    }

    pub fn refuse(self, times: usize) -> Self {
        {
            let mut dials = self.dials.lock().unwrap();
            for _ in 0..times {
                dials.push_back(Dial::Refuse);
            }
        }
        self
    }

    pub fn accept(self, script: ServerScript) -> Self {
        self.dials.lock().unwrap().push_back(Dial::Accept(script));
        self
    }

    pub fn wire(&self) -> Wire {
        self.wire.lock().unwrap().clone()
    }
}

pub(crate) struct ScriptedTransport {
    script: ServerScript,
    wire: Arc<Mutex<Wire>>,
}

#[async_trait]
impl Connector for ScriptedConnector {
    type Transport = ScriptedTransport;

    async fn connect(&self, _url: &str) -> Result<ScriptedTransport, TransportError> {
        self.wire.lock().unwrap().dials += 1;
        // An exhausted script behaves like OBS not running
        let next = self.dials.lock().unwrap().pop_front();
        match next {
            Some(Dial::Accept(script)) => Ok(ScriptedTransport {
                script,
                wire: Arc::clone(&self.wire),
            }),
            Some(Dial::Refuse) | None => Err(TransportError::Closed),
        }
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        if self.script.writable == 0 {
            return Err(TransportError::Closed);
        }
        self.script.writable -= 1;
        let value: Value = serde_json::from_str(&text)?;
        self.wire.lock().unwrap().sent.push(value);
        Ok(())
    }

    async fn recv_text(&mut self) -> Result<String, TransportError> {
        match self.script.incoming.pop_front() {
            Some(Incoming::Message(text)) => {
                self.wire.lock().unwrap().received += 1;
                Ok(text)
            },
            Some(Incoming::Hang) => std::future::pending().await,
            Some(Incoming::Drop) | None => Err(TransportError::Closed),
        }
    }

    async fn close(&mut self) {
        self.wire.lock().unwrap().closes += 1;
    }
}
