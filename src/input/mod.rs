//! Keyboard input: raw events, device sources and the per-device fan-in

pub mod evdev_source;
pub mod fan_in;

#[cfg(test)]
pub(crate) mod testing;

use async_trait::async_trait;
use std::sync::Arc;

pub use evdev_source::EvdevKeyboard;
pub use fan_in::EventFanIn;

/// evdev key values
pub const KEY_RELEASE: i32 = 0;
pub const KEY_PRESS: i32 = 1;
pub const KEY_REPEAT: i32 = 2;

/// Event class, reduced to what the dispatcher cares about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventClass {
    Key,
    Other,
}

/// A single raw input event from one device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputEvent {
    /// Device the event came from (its name)
    pub device: Arc<str>,
    pub class: EventClass,
    pub code: u16,
    pub value: i32,
}

impl InputEvent {
    pub fn key(device: impl Into<Arc<str>>, code: u16, value: i32) -> Self {
        Self {
            device: device.into(),
            class: EventClass::Key,
            code,
            value,
        }
    }

    /// Key went from up to down (not a release, not auto-repeat)
    pub fn is_press(&self) -> bool {
        self.class == EventClass::Key && self.value == KEY_PRESS
    }
}

/// A device producing an endless sequence of input events
///
/// Each source is driven by its own reader task; an `Err` ends that task.
#[async_trait]
pub trait EventSource: Send + 'static {
    /// Device name used in logs
    fn name(&self) -> &str;

    /// Wait for the next event
    async fn next_event(&mut self) -> std::io::Result<InputEvent>;
}
