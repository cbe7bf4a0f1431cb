//! Control loop
//!
//! Runs until the shutdown future resolves, multiplexing three things in one
//! biased `select!`: the shutdown signal, the periodic reconnect timer and
//! the input poll tick. The loop owns device teardown and the final close of
//! the OBS socket.

use std::future::Future;
use std::time::Duration;
use tokio::time::{interval, interval_at, Instant, MissedTickBehavior};
use tracing::{error, info, warn};

use crate::dispatch::Dispatcher;
use crate::hotkeys::HotkeyTable;
use crate::input::fan_in::DEFAULT_QUEUE_CAPACITY;
use crate::input::{EventFanIn, EventSource};
use crate::obs::{Connector, ObsConnection, RetryPolicy};


/// Timing knobs of the control loop
#[derive(Debug, Clone, Copy)]
pub struct LoopSettings {
    /// How often the device queues are drained
    pub poll_interval: Duration,
    /// How often a dropped OBS connection is retried
    pub reconnect_interval: Duration,
    pub queue_capacity: usize,
    /// Connection attempts made before entering the loop
    pub startup_retry: RetryPolicy,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(10),
            reconnect_interval: Duration::from_secs(60),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            startup_retry: RetryPolicy::default(),
        }
    }
}

/// Serve hotkeys from `sources` until `shutdown` resolves.
///
/// Every source is released and the connection closed before this returns.
pub async fn run<S, C>(
    sources: Vec<S>,
    table: HotkeyTable,
    obs: &mut ObsConnection<C>,
    settings: LoopSettings,
    shutdown: impl Future<Output = ()>,
) where
    S: EventSource,
    C: Connector,
{
    let dispatcher = Dispatcher::new(table);
    let mut fan_in = EventFanIn::spawn(sources, settings.queue_capacity);
    info!("Listening on {} input device(s)", fan_in.source_count());

    tokio::pin!(shutdown);

    info!("Connecting to OBS at {}...", obs.url());
    let startup = tokio::select! {
        biased;
        _ = &mut shutdown => None,
        attempt = obs.connect_with_retry(settings.startup_retry) => Some(attempt),
    };
    match startup {
        None => {
            info!("Shutdown requested during startup");
            teardown(fan_in, obs).await;
            return;
        },
        Some(Some(attempt)) => info!("Connected to OBS on attempt {}", attempt),
        Some(None) => {
            warn!(
                "Could not connect to OBS after {} attempts",
                settings.startup_retry.max_attempts
            );
            warn!("Hotkeys are ready but will only work when OBS is running");
        },
    }

    let mut poll = interval(settings.poll_interval);
    poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut reconnect = interval_at(
        Instant::now() + settings.reconnect_interval,
        settings.reconnect_interval,
    );
    reconnect.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut devices_lost = false;

    info!("Hotkey daemon running. Press Ctrl+C to stop.");

    loop {
        tokio::select! {
            biased;

            _ = &mut shutdown => {
                info!("Shutdown signal received, stopping event loop");
                break;
            }

            _ = reconnect.tick() => {
                if !obs.is_connected() {
                    info!("Attempting to reconnect to OBS...");
                    match obs.connect().await {
                        Ok(()) => info!("Reconnected to OBS"),
                        Err(e) => warn!("Reconnect failed: {}", e),
                    }
                }
            }

            _ = poll.tick() => {
                for event in fan_in.poll_round() {
                    dispatcher.dispatch(&event, &mut *obs).await;
                }
                if !devices_lost && fan_in.active_sources() == 0 {
                    error!("All input devices are gone, hotkeys are inactive until restart");
                    devices_lost = true;
                }
            }
        }
    }

    teardown(fan_in, obs).await;
}

async fn teardown<C: Connector>(fan_in: EventFanIn, obs: &mut ObsConnection<C>) {
    info!("Shutting down...");
    fan_in.shutdown().await;
    obs.close().await;
}
