//! Turns key presses into actions

use async_trait::async_trait;
use tracing::debug;

use crate::hotkeys::{Action, HotkeyTable};
use crate::input::InputEvent;

/// Something that can carry out an [`Action`]
///
/// Implementations report their own failures; the dispatcher never sees them.
#[async_trait]
pub trait ActionSink: Send {
    async fn perform(&mut self, action: Action);
}

pub struct Dispatcher {
    table: HotkeyTable,
}

impl Dispatcher {
    pub fn new(table: HotkeyTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &HotkeyTable {
        &self.table
    }

    /// Invoke the action bound to `event`, if it is a press of a hotkey.
    ///
    /// Returns whether an action was performed. The call awaits the sink, so
    /// a slow action delays the caller.
    pub async fn dispatch<S: ActionSink + ?Sized>(&self, event: &InputEvent, sink: &mut S) -> bool {
        if !event.is_press() {
            return false;
        }
        let Some(action) = self.table.resolve(event.code) else {
            return false;
        };
        debug!("Hotkey {} pressed on {}", event.code, event.device);
        sink.perform(action).await;
        true
    }
}
