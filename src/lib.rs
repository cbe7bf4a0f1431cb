//! obs-hotkeyd: global hotkeys for OBS Studio, read straight from evdev
//!
//! Keyboard events are read from `/dev/input/event*` (so they work under
//! Wayland, where global shortcuts are off-limits to ordinary clients) and
//! mapped to OBS WebSocket v5 requests.

pub mod app;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod hotkeys;
pub mod input;
pub mod keys;
pub mod obs;
pub mod paths;
