//! Hotkey table: evdev key code → OBS action
//!
//! Built once at startup from the `hotkeys` config section (action name → key
//! name) and never mutated afterwards.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use tracing::{info, warn};

use crate::error::StartupError;
use crate::keys;

/// Logical action bound to a hotkey
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    ToggleRecording,
    TogglePause,
    ToggleStreaming,
    ToggleReplayBuffer,
    SaveReplayBuffer,
}

impl Action {
    pub const ALL: [Action; 5] = [
        Action::ToggleRecording,
        Action::TogglePause,
        Action::ToggleStreaming,
        Action::ToggleReplayBuffer,
        Action::SaveReplayBuffer,
    ];

    /// Name used in the config file
    pub fn config_name(self) -> &'static str {
        match self {
            Action::ToggleRecording => "toggle_recording",
            Action::TogglePause => "toggle_pause",
            Action::ToggleStreaming => "toggle_streaming",
            Action::ToggleReplayBuffer => "toggle_replay_buffer",
            Action::SaveReplayBuffer => "save_replay_buffer",
        }
    }

    /// OBS WebSocket v5 request type
    pub fn request_type(self) -> &'static str {
        match self {
            Action::ToggleRecording => "ToggleRecord",
            Action::TogglePause => "ToggleRecordPause",
            Action::ToggleStreaming => "ToggleStream",
            Action::ToggleReplayBuffer => "ToggleReplayBuffer",
            Action::SaveReplayBuffer => "SaveReplayBuffer",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Action::ToggleRecording => "Toggle Recording",
            Action::TogglePause => "Toggle Pause/Resume Recording",
            Action::ToggleStreaming => "Toggle Streaming",
            Action::ToggleReplayBuffer => "Toggle Replay Buffer",
            Action::SaveReplayBuffer => "Save Replay Buffer",
        }
    }

    pub fn from_config_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL.into_iter().find(|a| a.config_name() == name)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Immutable code → action lookup
#[derive(Debug, Clone)]
pub struct HotkeyTable {
    actions: HashMap<u16, Action>,
}

impl HotkeyTable {
    /// Build the table from `action name → key name` bindings.
    ///
    /// Bindings are applied in ascending action-name order, so when two
    /// actions name the same key the alphabetically last one wins.
    pub fn build(bindings: &BTreeMap<String, String>) -> Result<Self, StartupError> {
        let mut actions: HashMap<u16, Action> = HashMap::new();

        for (action_name, key_name) in bindings {
            let Some(action) = Action::from_config_name(action_name) else {
                warn!(
                    "Unknown action '{}', hotkey '{}' will not work",
                    action_name, key_name
                );
                continue;
            };

            let Some(code) = keys::code_for_name(key_name) else {
                warn!(
                    "Key '{}' is not a supported key name, hotkey for {} will not work",
                    key_name, action
                );
                continue;
            };

            if let Some(previous) = actions.insert(code, action) {
                warn!(
                    "Key '{}' bound to both {} and {}; using {}",
                    key_name, previous, action, action
                );
            }
        }

        if actions.is_empty() {
            return Err(StartupError::EmptyHotkeyTable);
        }

        Ok(Self { actions })
    }

    /// Action bound to `code`, if any
    pub fn resolve(&self, code: u16) -> Option<Action> {
        self.actions.get(&code).copied()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Armed bindings sorted by key code
    pub fn bindings(&self) -> Vec<(u16, Action)> {
        let mut out: Vec<_> = self.actions.iter().map(|(c, a)| (*c, *a)).collect();
        out.sort_by_key(|(code, _)| *code);
        out
    }

    /// Log every armed hotkey
    pub fn log_bindings(&self) {
        for (code, action) in self.bindings() {
            let key = keys::name_for_code(code).unwrap_or("?");
            info!("- {}: {}", key, action);
        }
    }
}
