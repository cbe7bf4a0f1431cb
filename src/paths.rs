//! Configuration file lookup
//!
//! Search order, first existing file wins:
//! 1. `config.yaml` in the working directory
//! 2. `<config dir>/obs-hotkeyd/config.yaml` (`$XDG_CONFIG_HOME` or `~/.config`)
//!
//! When neither exists the built-in defaults are used.

use std::path::{Path, PathBuf};
use tracing::debug;

const APP_DIR: &str = "obs-hotkeyd";
const CONFIG_FILE: &str = "config.yaml";

/// Candidate config files, in search order
pub fn config_candidates(cwd: &Path) -> Vec<PathBuf> {
    let mut candidates = vec![cwd.join(CONFIG_FILE)];
    if let Some(dir) = dirs::config_dir() {
        candidates.push(dir.join(APP_DIR).join(CONFIG_FILE));
    }
    candidates
}

/// First candidate that exists on disk
pub fn find_config() -> Option<PathBuf> {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    find_in(&config_candidates(&cwd))
}

fn find_in(candidates: &[PathBuf]) -> Option<PathBuf> {
    for candidate in candidates {
        if candidate.is_file() {
            debug!("Using config file {}", candidate.display());
            return Some(candidate.clone());
        }
        debug!("No config file at {}", candidate.display());
    }
    None
}
