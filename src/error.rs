//! Fatal startup errors
//!
//! Everything here aborts the process before the control loop starts.
//! Runtime failures (connection, device reads) are never fatal.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("no valid hotkeys configured (check the `hotkeys` section of the config)")]
    EmptyHotkeyTable,

    #[error("no keyboard devices found")]
    NoKeyboards,

    #[error(
        "no readable keyboard devices while running as uid {uid}; run as root or add the user to the `input` group"
    )]
    InsufficientPrivileges { uid: u32 },

    #[error("failed to open input device {path}: {source}")]
    DeviceOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is not a keyboard (no EV_KEY capability)")]
    NotAKeyboard { path: PathBuf },
}
