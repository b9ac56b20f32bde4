//! Persisted demo configuration — the JSON-on-disk pattern from the
//! teacher's `agent-core::config::AgentConfig`, scoped down to the knobs
//! this pipeline actually has.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// WebSocket URL of the peer to mirror to/from. Empty means "run the
    /// in-process loopback demo instead of dialing out".
    #[serde(default)]
    pub server_url: String,

    #[serde(default = "default_tile_size")]
    pub tile_size: u32,

    #[serde(default = "default_fallback_threshold")]
    pub fallback_threshold: f64,

    #[serde(default = "default_quality")]
    pub jpeg_quality: u8,

    #[serde(default = "default_fps")]
    pub fps: u16,

    #[serde(default = "default_reconnect_base_delay")]
    pub reconnect_base_delay_secs: u64,

    #[serde(default = "default_reconnect_max_delay")]
    pub reconnect_max_delay_secs: u64,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

fn default_tile_size() -> u32 {
    64
}
fn default_fallback_threshold() -> f64 {
    mirror_core::DEFAULT_FALLBACK_THRESHOLD
}
fn default_quality() -> u8 {
    mirror_codec_jpeg::DEFAULT_QUALITY
}
fn default_fps() -> u16 {
    15
}
fn default_reconnect_base_delay() -> u64 {
    1
}
fn default_reconnect_max_delay() -> u64 {
    30
}
fn default_connect_timeout() -> u64 {
    mirror_core::connection::DEFAULT_CONNECT_TIMEOUT.as_secs()
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            server_url: String::new(),
            tile_size: default_tile_size(),
            fallback_threshold: default_fallback_threshold(),
            jpeg_quality: default_quality(),
            fps: default_fps(),
            reconnect_base_delay_secs: default_reconnect_base_delay(),
            reconnect_max_delay_secs: default_reconnect_max_delay(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

impl SessionConfig {
    pub fn default_path() -> PathBuf {
        if let Some(dirs) = directories::ProjectDirs::from("com", "mirror-demo", "mirror") {
            dirs.config_dir().join("config.json")
        } else {
            PathBuf::from("mirror-demo-config.json")
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config from {}", path.display()))?;
        serde_json::from_str(&data).with_context(|| "failed to parse config JSON")
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create config dir {}", parent.display()))?;
        }
        let data = serde_json::to_string_pretty(self)?;
        std::fs::write(path, data)
            .with_context(|| format!("failed to write config to {}", path.display()))
    }
}
