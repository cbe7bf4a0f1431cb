//! evdev keyboard discovery and async event reading
//!
//! Reads `/dev/input/event*` directly, which works under Wayland where global
//! key grabs are not available. Requires root or membership in the `input`
//! group.

use async_trait::async_trait;
use evdev::{Device, EventStream, EventType};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use super::{EventClass, EventSource, InputEvent};
use crate::error::StartupError;

/// Summary of a detected keyboard, for `--list-devices`
#[derive(Debug, Clone)]
pub struct KeyboardInfo {
    pub path: PathBuf,
    pub name: String,
}

/// An opened keyboard device being read asynchronously
pub struct EvdevKeyboard {
    name: Arc<str>,
    path: PathBuf,
    stream: EventStream,
}

impl EvdevKeyboard {
    /// Open a specific device path; it must support key events
    pub fn open(path: &Path) -> Result<Self, StartupError> {
        let device = Device::open(path).map_err(|source| StartupError::DeviceOpen {
            path: path.to_path_buf(),
            source,
        })?;

        if !is_keyboard(&device) {
            return Err(StartupError::NotAKeyboard {
                path: path.to_path_buf(),
            });
        }

        Self::from_device(path.to_path_buf(), device).map_err(|source| StartupError::DeviceOpen {
            path: path.to_path_buf(),
            source,
        })
    }

    fn from_device(path: PathBuf, device: Device) -> io::Result<Self> {
        let name: Arc<str> = device.name().unwrap_or("unknown device").into();
        let stream = device.into_event_stream()?;
        Ok(Self { name, path, stream })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl EventSource for EvdevKeyboard {
    fn name(&self) -> &str {
        &self.name
    }

    async fn next_event(&mut self) -> io::Result<InputEvent> {
        let raw = self.stream.next_event().await?;
        let class = if raw.event_type() == EventType::KEY {
            EventClass::Key
        } else {
            EventClass::Other
        };
        Ok(InputEvent {
            device: Arc::clone(&self.name),
            class,
            code: raw.code(),
            value: raw.value(),
        })
    }
}

impl Drop for EvdevKeyboard {
    fn drop(&mut self) {
        debug!("Closing input device {} ({})", self.name, self.path.display());
    }
}

/// A device is a keyboard if it reports EV_KEY with at least one key
pub fn is_keyboard(device: &Device) -> bool {
    device.supported_events().contains(EventType::KEY)
        && device
            .supported_keys()
            .map(|keys| keys.iter().next().is_some())
            .unwrap_or(false)
}

/// Enumerate readable keyboards without keeping them open
pub fn list_keyboards() -> Vec<KeyboardInfo> {
    let mut found: Vec<KeyboardInfo> = evdev::enumerate()
        .filter(|(_, device)| is_keyboard(device))
        .map(|(path, device)| KeyboardInfo {
            name: device.name().unwrap_or("unknown device").to_string(),
            path,
        })
        .collect();
    found.sort_by(|a, b| a.path.cmp(&b.path));
    found
}

/// Open the configured device paths, or every detected keyboard when none
/// are configured.
///
/// Fails when nothing usable is found. If autodetection finds nothing and the
/// process is not root, the failure is reported as a privilege problem since
/// unreadable nodes are silently skipped by enumeration.
pub fn open_keyboards(paths: &[PathBuf]) -> Result<Vec<EvdevKeyboard>, StartupError> {
    let keyboards = if paths.is_empty() {
        let mut detected = Vec::new();
        for (path, device) in evdev::enumerate() {
            if !is_keyboard(&device) {
                continue;
            }
            match EvdevKeyboard::from_device(path.clone(), device) {
                Ok(keyboard) => detected.push(keyboard),
                Err(source) => return Err(StartupError::DeviceOpen { path, source }),
            }
        }
        detected.sort_by(|a, b| a.path.cmp(&b.path));

        if detected.is_empty() {
            let uid = effective_uid();
            if uid != 0 {
                return Err(StartupError::InsufficientPrivileges { uid });
            }
            return Err(StartupError::NoKeyboards);
        }
        detected
    } else {
        paths
            .iter()
            .map(|p| EvdevKeyboard::open(p))
            .collect::<Result<Vec<_>, _>>()?
    };

    info!("Found {} keyboard device(s):", keyboards.len());
    for keyboard in &keyboards {
        info!("  - {} ({})", keyboard.name, keyboard.path.display());
    }

    Ok(keyboards)
}

fn effective_uid() -> u32 {
    // SAFETY: geteuid has no preconditions and cannot fail
    unsafe { libc::geteuid() }
}
