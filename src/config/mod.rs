//! Configuration for obs-hotkeyd
//!
//! Handles loading, parsing and validation of the YAML configuration file.
//! Every field is optional; a missing file means all defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

use crate::app::LoopSettings;
use crate::obs::{ConnectionSettings, RetryPolicy};

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub obs: ObsConfig,
    pub input: InputConfig,
    /// Action name → key name
    pub hotkeys: BTreeMap<String, String>,
}

/// OBS WebSocket configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObsConfig {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub rpc_version: u32,
    /// Startup connection attempts
    pub max_retries: u32,
    pub retry_delay_secs: u64,
    pub reconnect_interval_secs: u64,
    /// Bound on dialing and on each read/write
    pub timeout_secs: u64,
}

/// Input device configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct InputConfig {
    pub queue_capacity: usize,
    pub poll_interval_ms: u64,
    /// Explicit `/dev/input/eventN` paths; empty means autodetect
    pub devices: Vec<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            obs: ObsConfig::default(),
            input: InputConfig::default(),
            hotkeys: default_hotkeys(),
        }
    }
}

impl Default for ObsConfig {
    fn default() -> Self {
        Self {
            url: default_obs_url(),
            password: None,
            rpc_version: default_rpc_version(),
            max_retries: default_max_retries(),
            retry_delay_secs: default_retry_delay(),
            reconnect_interval_secs: default_reconnect_interval(),
            timeout_secs: default_timeout(),
        }
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            poll_interval_ms: default_poll_interval(),
            devices: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Load and validate configuration from a YAML file
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config = Self::parse(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))?;
        Ok(config)
    }

    /// Parse and validate configuration from YAML text
    pub fn parse(content: &str) -> Result<Self> {
        // An empty document deserializes to unit, not to an empty map
        let config: AppConfig = if content.trim().is_empty() {
            AppConfig::default()
        } else {
            serde_yaml::from_str(content).context("Failed to parse YAML config")?
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let url = &self.obs.url;
        if !(url.starts_with("ws://") || url.starts_with("wss://")) {
            anyhow::bail!("obs.url must start with ws:// or wss://, got '{}'", url);
        }
        if self.obs.max_retries == 0 {
            anyhow::bail!("obs.max_retries must be at least 1");
        }
        if self.obs.reconnect_interval_secs == 0 {
            anyhow::bail!("obs.reconnect_interval_secs must be at least 1");
        }
        if self.obs.timeout_secs == 0 {
            anyhow::bail!("obs.timeout_secs must be at least 1");
        }
        if self.input.queue_capacity == 0 {
            anyhow::bail!("input.queue_capacity must be at least 1");
        }
        if self.input.poll_interval_ms == 0 {
            anyhow::bail!("input.poll_interval_ms must be at least 1");
        }
        Ok(())
    }

    pub fn connection_settings(&self) -> ConnectionSettings {
        ConnectionSettings {
            url: self.obs.url.clone(),
            // An empty password in YAML means "no password"
            password: self.obs.password.clone().filter(|p| !p.is_empty()),
            rpc_version: self.obs.rpc_version,
            io_timeout: Duration::from_secs(self.obs.timeout_secs),
        }
    }

    pub fn loop_settings(&self) -> LoopSettings {
        LoopSettings {
            poll_interval: Duration::from_millis(self.input.poll_interval_ms),
            reconnect_interval: Duration::from_secs(self.obs.reconnect_interval_secs),
            queue_capacity: self.input.queue_capacity,
            startup_retry: RetryPolicy {
                max_attempts: self.obs.max_retries,
                delay: Duration::from_secs(self.obs.retry_delay_secs),
            },
        }
    }
}

// Default value functions
fn default_obs_url() -> String { "ws://localhost:4455".to_string() }
fn default_rpc_version() -> u32 { crate::obs::protocol::RPC_VERSION }
fn default_max_retries() -> u32 { 10 }
fn default_retry_delay() -> u64 { 30 }
fn default_reconnect_interval() -> u64 { 60 }
fn default_timeout() -> u64 { 10 }
fn default_queue_capacity() -> usize { crate::input::fan_in::DEFAULT_QUEUE_CAPACITY }
fn default_poll_interval() -> u64 { 10 }

fn default_hotkeys() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("toggle_recording".to_string(), "scroll lock".to_string()),
        ("toggle_pause".to_string(), "pause".to_string()),
    ])
}
