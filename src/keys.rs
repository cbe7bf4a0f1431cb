//! Human-readable key names and their evdev key codes
//!
//! Only keys that are unlikely to collide with normal typing are exposed.
//! Names are matched case-insensitively.

use evdev::Key;

/// Fixed key-name ↔ code table
pub const KEY_NAMES: &[(&str, Key)] = &[
    ("scroll lock", Key::KEY_SCROLLLOCK),
    ("pause", Key::KEY_PAUSE),
    ("home", Key::KEY_HOME),
    ("page up", Key::KEY_PAGEUP),
    ("page down", Key::KEY_PAGEDOWN),
    ("end", Key::KEY_END),
    ("insert", Key::KEY_INSERT),
    ("delete", Key::KEY_DELETE),
    ("f1", Key::KEY_F1),
    ("f2", Key::KEY_F2),
    ("f3", Key::KEY_F3),
    ("f4", Key::KEY_F4),
    ("f5", Key::KEY_F5),
    ("f6", Key::KEY_F6),
    ("f7", Key::KEY_F7),
    ("f8", Key::KEY_F8),
    ("f9", Key::KEY_F9),
    ("f10", Key::KEY_F10),
    ("f11", Key::KEY_F11),
    ("f12", Key::KEY_F12),
];

/// Look up the key code for a human-readable key name
pub fn code_for_name(name: &str) -> Option<u16> {
    let wanted = name.trim().to_lowercase();
    KEY_NAMES
        .iter()
        .find(|(key_name, _)| *key_name == wanted)
        .map(|(_, key)| key.code())
}

/// Look up the human-readable name of a key code
pub fn name_for_code(code: u16) -> Option<&'static str> {
    KEY_NAMES
        .iter()
        .find(|(_, key)| key.code() == code)
        .map(|(name, _)| *name)
}
