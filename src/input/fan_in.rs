//! Per-device reader tasks merged into one non-blocking poll
//!
//! Every source gets its own tokio task and a small bounded queue. A full
//! queue parks the reader until the control loop catches up. The control
//! loop takes at most one event per queue per tick, so a chatty device
//! cannot starve a quiet one and a stalled device blocks nobody.

use tokio::sync::mpsc::{self, error::TryRecvError};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::{EventSource, InputEvent};

/// Default per-device queue capacity
pub const DEFAULT_QUEUE_CAPACITY: usize = 10;

struct SourceQueue {
    name: String,
    rx: mpsc::Receiver<InputEvent>,
    closed: bool,
}

/// Fan-in over all device reader tasks
pub struct EventFanIn {
    queues: Vec<SourceQueue>,
    tasks: Vec<JoinHandle<()>>,
}

impl EventFanIn {
    /// Spawn one reader task per source
    pub fn spawn<S: EventSource>(sources: Vec<S>, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let mut queues = Vec::with_capacity(sources.len());
        let mut tasks = Vec::with_capacity(sources.len());

        for source in sources {
            let (tx, rx) = mpsc::channel(capacity);
            queues.push(SourceQueue {
                name: source.name().to_string(),
                rx,
                closed: false,
            });
            tasks.push(tokio::spawn(read_loop(source, tx)));
        }

        Self { queues, tasks }
    }

    /// Take at most one pending event from each device, without waiting
    pub fn poll_round(&mut self) -> Vec<InputEvent> {
        let mut batch = Vec::with_capacity(self.queues.len());
        for queue in self.queues.iter_mut().filter(|q| !q.closed) {
            match queue.rx.try_recv() {
                Ok(event) => batch.push(event),
                Err(TryRecvError::Empty) => {},
                Err(TryRecvError::Disconnected) => {
                    debug!("Input device {} is gone", queue.name);
                    queue.closed = true;
                },
            }
        }
        batch
    }

    /// Number of devices whose reader is still alive (or has undrained events)
    pub fn active_sources(&self) -> usize {
        self.queues.iter().filter(|q| !q.closed).count()
    }

    pub fn source_count(&self) -> usize {
        self.queues.len()
    }

    /// Stop every reader task and release its device
    pub async fn shutdown(self) {
        let Self { queues, tasks } = self;
        drop(queues);

        for task in &tasks {
            task.abort();
        }
        for task in tasks {
            // Cancelled tasks report a JoinError; the device is dropped either way
            let _ = task.await;
        }
        debug!("All input devices released");
    }
}

async fn read_loop<S: EventSource>(mut source: S, tx: mpsc::Sender<InputEvent>) {
    loop {
        match source.next_event().await {
            Ok(event) => {
                if tx.send(event).await.is_err() {
                    debug!("Event queue for {} closed, stopping reader", source.name());
                    return;
                }
            },
            Err(e) => {
                warn!("Error reading from {}: {}", source.name(), e);
                return;
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::testing::channel_source;
    use crate::input::{KEY_PRESS, KEY_RELEASE};
    use std::time::Duration;

    /// Poll until `expected` events were collected or the deadline passes
    async fn collect(fan_in: &mut EventFanIn, expected: usize) -> Vec<InputEvent> {
        let mut out = Vec::new();
        for _ in 0..200 {
            out.extend(fan_in.poll_round());
            if out.len() >= expected {
                break;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        out
    }

    #[tokio::test]
    async fn test_events_from_all_sources_arrive() {
        let (kbd0, h0) = channel_source("kbd0");
        let (kbd1, h1) = channel_source("kbd1");
        let mut fan_in = EventFanIn::spawn(vec![kbd0, kbd1], DEFAULT_QUEUE_CAPACITY);

        h0.key(70, KEY_PRESS);
        h1.key(119, KEY_PRESS);

        let events = collect(&mut fan_in, 2).await;
        assert_eq!(events.len(), 2);
        assert!(events.iter().any(|e| &*e.device == "kbd0" && e.code == 70));
        assert!(events.iter().any(|e| &*e.device == "kbd1" && e.code == 119));

        fan_in.shutdown().await;
    }

    #[tokio::test]
    async fn test_per_source_order_is_preserved() {
        let (kbd0, h0) = channel_source("kbd0");
        let mut fan_in = EventFanIn::spawn(vec![kbd0], 2);

        // More events than the queue holds: the reader parks until drained
        for code in 1..=6 {
            h0.key(code, KEY_PRESS);
        }

        let events = collect(&mut fan_in, 6).await;
        let codes: Vec<u16> = events.iter().map(|e| e.code).collect();
        assert_eq!(codes, vec![1, 2, 3, 4, 5, 6]);

        fan_in.shutdown().await;
    }

    #[tokio::test]
    async fn test_one_event_per_source_per_round() {
        let (kbd0, h0) = channel_source("kbd0");
        let (kbd1, h1) = channel_source("kbd1");
        let mut fan_in = EventFanIn::spawn(vec![kbd0, kbd1], DEFAULT_QUEUE_CAPACITY);

        for _ in 0..3 {
            h0.key(1, KEY_PRESS);
        }
        h1.key(2, KEY_PRESS);

        // Let both readers fill their queues
        tokio::time::sleep(Duration::from_millis(20)).await;

        let first = fan_in.poll_round();
        assert_eq!(first.len(), 2);
        let second = fan_in.poll_round();
        assert_eq!(second.len(), 1);
        assert_eq!(&*second[0].device, "kbd0");

        fan_in.shutdown().await;
    }

    #[tokio::test]
    async fn test_stalled_source_does_not_block_others() {
        // kbd0 never produces anything
        let (kbd0, _h0) = channel_source("kbd0");
        let (kbd1, h1) = channel_source("kbd1");
        let mut fan_in = EventFanIn::spawn(vec![kbd0, kbd1], DEFAULT_QUEUE_CAPACITY);

        h1.key(70, KEY_PRESS);
        h1.key(70, KEY_RELEASE);

        let events = collect(&mut fan_in, 2).await;
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| &*e.device == "kbd1"));

        fan_in.shutdown().await;
    }

    #[tokio::test]
    async fn test_read_error_only_ends_that_source() {
        let (kbd0, h0) = channel_source("kbd0");
        let (kbd1, h1) = channel_source("kbd1");
        let mut fan_in = EventFanIn::spawn(vec![kbd0, kbd1], DEFAULT_QUEUE_CAPACITY);

        h0.fail();
        tokio::time::sleep(Duration::from_millis(20)).await;
        fan_in.poll_round();

        assert_eq!(h0.drops(), 1);
        assert_eq!(fan_in.active_sources(), 1);
        assert_eq!(fan_in.source_count(), 2);

        h1.key(70, KEY_PRESS);
        let events = collect(&mut fan_in, 1).await;
        assert_eq!(events.len(), 1);
        assert_eq!(&*events[0].device, "kbd1");

        fan_in.shutdown().await;
        assert_eq!(h0.drops(), 1);
        assert_eq!(h1.drops(), 1);
    }

    #[tokio::test]
    async fn test_shutdown_releases_every_source_once() {
        let (kbd0, h0) = channel_source("kbd0");
        let (kbd1, h1) = channel_source("kbd1");
        let (kbd2, h2) = channel_source("kbd2");
        let fan_in = EventFanIn::spawn(vec![kbd0, kbd1, kbd2], 1);

        // kbd0 is parked on a full queue, the others are idle
        for _ in 0..4 {
            h0.key(70, KEY_PRESS);
        }
        tokio::time::sleep(Duration::from_millis(10)).await;

        fan_in.shutdown().await;

        assert_eq!(h0.drops(), 1);
        assert_eq!(h1.drops(), 1);
        assert_eq!(h2.drops(), 1);
    }
}
