//! Configuration for the acoustic link transport.
//!
//! Resolution order: environment variables → config file → built-in
//! defaults.
//!
//! Config file location:
//!   1. $CHIRPLINK_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/chirplink/config.toml
//!   3. ~/.config/chirplink/config.toml

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Transport tunables. Every constant named in the protocol design lives
/// here rather than scattered through the crates that use it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Maximum serialised frame size in bytes.
    pub frame_limit: usize,
    /// Raw payload bytes carried per chunk before base64/JSON overhead.
    pub chunk_data: usize,
    /// Payloads at or above this size are LZNT1-compressed before chunking.
    pub compression_threshold: usize,
    /// Delay between consecutive outbound frames, in milliseconds.
    pub inter_frame_delay_ms: u64,
    /// How long a reassembly entry may sit with chunks missing before it
    /// times out and is dropped.
    pub reassembly_timeout_secs: u64,
    /// Decompression output ceiling — guards against a decompression bomb.
    pub decompress_ceiling: usize,
    /// How often the session loop sweeps for timed-out reassembly entries
    /// and due retransmissions.
    pub sweep_interval_secs: f64,
    /// Maximum number of `id`s remembered for inbound retx lookups.
    pub last_sent_cache_cap: usize,
    /// Maximum number of concurrent in-flight reassembly entries.
    pub reassembly_table_cap: usize,
    /// Maximum number of missing-chunk indices packed into a single retx
    /// frame before the request is split across frames.
    pub max_retx_indices_per_frame: usize,
}

impl TransportConfig {
    pub fn inter_frame_delay(&self) -> Duration {
        Duration::from_millis(self.inter_frame_delay_ms)
    }

    pub fn reassembly_timeout(&self) -> Duration {
        Duration::from_secs(self.reassembly_timeout_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs_f64(self.sweep_interval_secs)
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            frame_limit: 140,
            chunk_data: 70,
            compression_threshold: 100,
            inter_frame_delay_ms: 500,
            reassembly_timeout_secs: 30,
            decompress_ceiling: 256 * 1024,
            sweep_interval_secs: 7.5,
            last_sent_cache_cap: 16,
            reassembly_table_cap: 64,
            max_retx_indices_per_frame: 32,
        }
    }
}

/// Audio device and modem selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Input device name. Empty = default input device.
    pub input_device: String,
    /// Output device name. Empty = default output device.
    pub output_device: String,
    /// Output volume, 0-100.
    pub volume: u8,
    /// Modem protocol identifier (maps to a ggwave-style protocol index).
    pub protocol: u32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            input_device: String::new(),
            output_device: String::new(),
            volume: 50,
            protocol: 1,
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub transport: TransportConfig,
    pub audio: AudioConfig,
}

// ── Path helpers ─────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
        .join("chirplink")
}

fn home_dir() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

// ── Errors ───────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("failed to write {0}: {1}")]
    WriteFailed(PathBuf, std::io::Error),
    #[error("failed to serialize: {0}")]
    SerializeFailed(toml::ser::Error),
}

// ── Loading ──────────────────────────────────────────────────────────────

impl Config {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::file_path();
        let mut config = if path.exists() {
            let text = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadFailed(path.clone(), e))?;
            toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(path.clone(), e))?
        } else {
            Config::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("CHIRPLINK_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Write default config if none exists. Returns the path.
    pub fn write_default_if_missing() -> Result<PathBuf, ConfigError> {
        let path = Self::file_path();
        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
            }
            let text = toml::to_string_pretty(&Config::default())
                .map_err(ConfigError::SerializeFailed)?;
            std::fs::write(&path, text).map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
        }
        Ok(path)
    }

    /// Apply CHIRPLINK_* env var overrides, applied last so they win over
    /// both the file and the built-in defaults.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("CHIRPLINK_AUDIO__INPUT_DEVICE") {
            self.audio.input_device = v;
        }
        if let Ok(v) = std::env::var("CHIRPLINK_AUDIO__OUTPUT_DEVICE") {
            self.audio.output_device = v;
        }
        if let Ok(v) = std::env::var("CHIRPLINK_AUDIO__VOLUME") {
            if let Ok(p) = v.parse() {
                self.audio.volume = p;
            }
        }
        if let Ok(v) = std::env::var("CHIRPLINK_AUDIO__PROTOCOL") {
            if let Ok(p) = v.parse() {
                self.audio.protocol = p;
            }
        }
        if let Ok(v) = std::env::var("CHIRPLINK_TRANSPORT__FRAME_LIMIT") {
            if let Ok(p) = v.parse() {
                self.transport.frame_limit = p;
            }
        }
        if let Ok(v) = std::env::var("CHIRPLINK_TRANSPORT__COMPRESSION_THRESHOLD") {
            if let Ok(p) = v.parse() {
                self.transport.compression_threshold = p;
            }
        }
    }
}
