// Copyright 2026 Daniel Pelikan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Configuration module.
//!
//! Handles loading and saving application settings.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;
use uuid::Uuid;

use crate::bluetooth::constants::{
    DEFAULT_RFCOMM_CHANNEL, MAX_RFCOMM_CHANNEL, READ_BUFFER_SIZE, SERVICE_NAME, SPP_UUID,
};

const APP_DIR: &str = "bluetooth-chat";

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Data directory for history.
    #[serde(skip)]
    pub data_dir: PathBuf,

    /// Bluetooth settings.
    pub bluetooth: BluetoothConfig,

    /// History settings.
    pub history: HistoryConfig,

    /// Display settings.
    pub display: DisplayConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BluetoothConfig {
    /// Adapter name (e.g. "hci0"). Uses the default adapter when unset.
    pub adapter: Option<String>,

    /// Service name published in the SDP record.
    pub service_name: String,

    /// Service UUID both peers agree on.
    pub service_uuid: Uuid,

    /// RFCOMM channel the server listens on.
    pub channel: u8,

    /// Dial this RFCOMM channel directly instead of resolving it via SDP.
    pub peer_channel: Option<u8>,

    /// Bytes taken from the socket per read.
    pub read_buffer_size: usize,

    /// Give up dialing after this many seconds. Zero waits forever.
    pub connect_timeout_secs: u64,

    /// Make the adapter discoverable and pairable on startup.
    pub discoverable: bool,
}

impl Default for BluetoothConfig {
    fn default() -> Self {
        Self {
            adapter: None,
            service_name: SERVICE_NAME.to_string(),
            service_uuid: SPP_UUID,
            channel: DEFAULT_RFCOMM_CHANNEL,
            peer_channel: None,
            read_buffer_size: READ_BUFFER_SIZE,
            connect_timeout_secs: 30,
            discoverable: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Enable history logging.
    pub enabled: bool,

    /// Maximum number of history entries.
    pub max_entries: u32,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: 10000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Lines kept in the in-memory transcript.
    pub transcript_limit: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            transcript_limit: 500,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            bluetooth: BluetoothConfig::default(),
            history: HistoryConfig::default(),
            display: DisplayConfig::default(),
        }
    }
}

fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join("config.toml")
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

impl Config {
    /// Load configuration from the default location or create it.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&default_config_path())?;

        config.data_dir = default_data_dir();
        std::fs::create_dir_all(&config.data_dir)?;

        Ok(config)
    }

    /// Load configuration from `path`, writing defaults if it does not exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        let config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            toml::from_str(&content)?
        } else {
            let config = Self::default();
            config.save_to(path)?;
            info!("Wrote default configuration to {:?}", path);
            config
        };

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to `path`.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check values that would only fail later at the socket layer.
    pub fn validate(&self) -> Result<()> {
        let bt = &self.bluetooth;
        if !(1..=MAX_RFCOMM_CHANNEL).contains(&bt.channel) {
            bail!(
                "bluetooth.channel must be between 1 and {}, got {}",
                MAX_RFCOMM_CHANNEL,
                bt.channel
            );
        }
        if let Some(channel) = bt.peer_channel {
            if !(1..=MAX_RFCOMM_CHANNEL).contains(&channel) {
                bail!(
                    "bluetooth.peer_channel must be between 1 and {}, got {}",
                    MAX_RFCOMM_CHANNEL,
                    channel
                );
            }
        }
        if bt.read_buffer_size == 0 {
            bail!("bluetooth.read_buffer_size must be greater than zero");
        }
        if bt.service_name.trim().is_empty() {
            bail!("bluetooth.service_name must not be empty");
        }
        Ok(())
    }
}
