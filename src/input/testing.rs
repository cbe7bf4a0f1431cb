//! Channel-backed event sources for tests

use async_trait::async_trait;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

use super::{EventSource, InputEvent};

/// Test device fed through a channel; counts how often it is dropped
pub(crate) struct ChannelSource {
    name: String,
    rx: mpsc::UnboundedReceiver<io::Result<InputEvent>>,
    drops: Arc<AtomicUsize>,
}

/// Test-side handle of a [`ChannelSource`]
#[derive(Clone)]
pub(crate) struct SourceHandle {
    name: String,
    tx: mpsc::UnboundedSender<io::Result<InputEvent>>,
    drops: Arc<AtomicUsize>,
}

pub(crate) fn channel_source(name: &str) -> (ChannelSource, SourceHandle) {
    let (tx, rx) = mpsc::unbounded_channel();
    let drops = Arc::new(AtomicUsize::new(0));
    (
        ChannelSource {
            name: name.to_string(),
            rx,
            drops: Arc::clone(&drops),
        },
        SourceHandle {
            name: name.to_string(),
            tx,
            drops,
        },
    )
}

impl SourceHandle {
    pub(crate) fn key(&self, code: u16, value: i32) {
        let _ = self
            .tx
            .send(Ok(InputEvent::key(self.name.as_str(), code, value)));
    }

    pub(crate) fn fail(&self) {
        let _ = self.tx.send(Err(io::Error::new(
            io::ErrorKind::Other,
            "No such device",
        )));
    }

    pub(crate) fn drops(&self) -> usize {
        self.drops.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EventSource for ChannelSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn next_event(&mut self) -> io::Result<InputEvent> {
        match self.rx.recv().await {
            Some(result) => result,
            // An idle device: never yields again
            None => std::future::pending().await,
        }
    }
}

impl Drop for ChannelSource {
    fn drop(&mut self) {
        self.drops.fetch_add(1, Ordering::SeqCst);
    }
}
