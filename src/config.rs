//! Application configuration
//!
//! Both binaries read an optional TOML file from the platform config
//! directory (`wavecast/sender.toml`, `wavecast/receiver.toml`). A missing
//! file yields the compiled-in defaults; an unreadable one is an error.

use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::error::{Error, Result};

/// Sender-side configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SenderConfig {
    /// Directory scanned for .wav tracks
    pub tracks_dir: PathBuf,
    /// Receiver address
    pub receiver_addr: IpAddr,
    pub audio_port: u16,
    pub control_port: u16,
    /// Frames per transmitted chunk
    pub chunk_frames: usize,
    /// Volume announced at startup
    pub initial_volume: u8,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            tracks_dir: PathBuf::from("tracks"),
            receiver_addr: IpAddr::V4(Ipv4Addr::LOCALHOST),
            audio_port: DEFAULT_AUDIO_PORT,
            control_port: DEFAULT_CONTROL_PORT,
            chunk_frames: DEFAULT_CHUNK_FRAMES,
            initial_volume: DEFAULT_VOLUME,
        }
    }
}

/// Receiver-side configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReceiverConfig {
    /// Local bind address for both channels
    pub bind_addr: IpAddr,
    pub audio_port: u16,
    pub control_port: u16,
    /// Seconds between "still waiting for CONFIG" log lines
    pub config_wait_timeout_secs: u64,
    /// Per-channel poll timeout in the main loop, milliseconds
    pub poll_timeout_ms: u64,
    /// Seconds without audio before the arrival timestamp resets
    pub silence_timeout_secs: u64,
    /// Display scan rate, Hz
    pub display_refresh_hz: u32,
    /// Minimum milliseconds between displayed-volume updates
    pub display_update_interval_ms: u64,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            bind_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            audio_port: DEFAULT_AUDIO_PORT,
            control_port: DEFAULT_CONTROL_PORT,
            config_wait_timeout_secs: CONFIG_WAIT_TIMEOUT_SECS,
            poll_timeout_ms: POLL_TIMEOUT_MS,
            silence_timeout_secs: SILENCE_TIMEOUT_SECS,
            display_refresh_hz: DISPLAY_REFRESH_HZ,
            display_update_interval_ms: DISPLAY_UPDATE_INTERVAL_MS,
        }
    }
}

fn config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "wavecast").map(|dirs| dirs.config_dir().to_path_buf())
}

fn load_toml<T: serde::de::DeserializeOwned + Default>(path: &Path) -> Result<T> {
    if !path.exists() {
        return Ok(T::default());
    }
    let text = std::fs::read_to_string(path)?;
    toml::from_str(&text).map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
}

impl SenderConfig {
    /// Load from the platform config dir, falling back to defaults
    pub fn load() -> Result<Self> {
        match config_dir() {
            Some(dir) => load_toml(&dir.join("sender.toml")),
            None => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        load_toml(path)
    }
}

impl ReceiverConfig {
    /// Load from the platform config dir, falling back to defaults
    pub fn load() -> Result<Self> {
        match config_dir() {
            Some(dir) => load_toml(&dir.join("receiver.toml")),
            None => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        load_toml(path)
    }
}
