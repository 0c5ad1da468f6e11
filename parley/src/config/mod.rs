//! Configuration system for the Parley client.
//!
//! Supports layered configuration with the following priority (highest first):
//! 1. CLI arguments
//! 2. Environment variables (via clap `env` attribute)
//! 3. TOML config file (`~/.config/parley/config.toml`)
//! 4. Compiled defaults
//!
//! Missing config file is not an error (defaults are used). An explicit
//! `--config` path that doesn't exist is an error.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::delay::StatusDelays;
use crate::service::{IncomingConfig, ServiceConfig};

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse the TOML configuration.
    #[error("failed to parse config file: {0}")]
    ParseToml(#[from] toml::de::Error),
}

// ---------------------------------------------------------------------------
// TOML file structs (all fields Option for partial overrides)
// ---------------------------------------------------------------------------

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ConfigFile {
    service: ServiceFileConfig,
    status: StatusFileConfig,
    incoming: IncomingFileConfig,
    session: SessionFileConfig,
}

/// `[service]` section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ServiceFileConfig {
    latency_min_ms: Option<u64>,
    latency_max_ms: Option<u64>,
    failure_rate: Option<f64>,
    chat_count: Option<usize>,
    messages_per_chat: Option<usize>,
    messages_jitter: Option<usize>,
    seed: Option<u64>,
}

/// `[status]` section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct StatusFileConfig {
    delivered_min_ms: Option<u64>,
    delivered_range_ms: Option<u64>,
    read_min_ms: Option<u64>,
    read_range_ms: Option<u64>,
}

/// `[incoming]` section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct IncomingFileConfig {
    enabled: Option<bool>,
    interval_min_ms: Option<u64>,
    interval_max_ms: Option<u64>,
}

/// `[session]` section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct SessionFileConfig {
    event_buffer: Option<usize>,
    transcript_tail: Option<usize>,
    preview_len: Option<usize>,
}

// ---------------------------------------------------------------------------
// Resolved configuration
// ---------------------------------------------------------------------------

/// Fully resolved client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Simulated service behaviour.
    pub service: ServiceConfig,
    /// Post-send status delays.
    pub status: StatusDelays,
    /// Incoming feed pacing.
    pub incoming: IncomingConfig,
    /// Whether the incoming feed connects at startup.
    pub incoming_enabled: bool,
    /// Capacity of the log event channel.
    pub event_buffer: usize,
    /// Messages printed when a chat is opened.
    pub transcript_tail: usize,
    /// Characters of last-message preview in the chat list.
    pub preview_len: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            service: ServiceConfig::default(),
            status: StatusDelays::default(),
            incoming: IncomingConfig::default(),
            incoming_enabled: true,
            event_buffer: 256,
            transcript_tail: 20,
            preview_len: 40,
        }
    }
}

impl ClientConfig {
    /// Load configuration by merging CLI args, env vars, and a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the explicit config file cannot be read,
    /// or if any config file that exists cannot be parsed.
    pub fn load(cli: &CliArgs) -> Result<Self, ConfigError> {
        let file = load_config_file(cli.config.as_deref())?;
        Ok(Self::resolve(cli, &file))
    }

    /// Priority: CLI > file > default.
    fn resolve(cli: &CliArgs, file: &ConfigFile) -> Self {
        let defaults = Self::default();
        let ms = |value: Option<u64>, default: Duration| value.map_or(default, Duration::from_millis);

        let service = ServiceConfig {
            latency_min: ms(file.service.latency_min_ms, defaults.service.latency_min),
            latency_max: ms(file.service.latency_max_ms, defaults.service.latency_max),
            failure_rate: cli
                .failure_rate
                .or(file.service.failure_rate)
                .unwrap_or(defaults.service.failure_rate)
                .clamp(0.0, 1.0),
            chat_count: cli
                .chat_count
                .or(file.service.chat_count)
                .unwrap_or(defaults.service.chat_count),
            messages_per_chat: file
                .service
                .messages_per_chat
                .unwrap_or(defaults.service.messages_per_chat),
            messages_jitter: file
                .service
                .messages_jitter
                .unwrap_or(defaults.service.messages_jitter),
            seed: cli.seed.or(file.service.seed),
        };

        let status = StatusDelays {
            delivered_min: ms(file.status.delivered_min_ms, defaults.status.delivered_min),
            delivered_range: ms(file.status.delivered_range_ms, defaults.status.delivered_range),
            read_min: ms(file.status.read_min_ms, defaults.status.read_min),
            read_range: ms(file.status.read_range_ms, defaults.status.read_range),
        };

        let incoming = IncomingConfig {
            interval_min: ms(file.incoming.interval_min_ms, defaults.incoming.interval_min),
            interval_max: ms(file.incoming.interval_max_ms, defaults.incoming.interval_max),
        };

        Self {
            service,
            status,
            incoming,
            incoming_enabled: !cli.no_incoming
                && file.incoming.enabled.unwrap_or(defaults.incoming_enabled),
            event_buffer: file
                .session
                .event_buffer
                .unwrap_or(defaults.event_buffer),
            transcript_tail: file
                .session
                .transcript_tail
                .unwrap_or(defaults.transcript_tail),
            preview_len: file.session.preview_len.unwrap_or(defaults.preview_len),
        }
    }
}

/// CLI arguments parsed by clap.
#[derive(clap::Parser, Debug, Default)]
#[command(version, about = "Line-based chat client over a simulated service")]
pub struct CliArgs {
    /// Path to config file (default: `~/.config/parley/config.toml`).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Log level filter (trace, debug, info, warn, error).
    #[arg(long, default_value = "warn", env = "PARLEY_LOG")]
    pub log_level: String,

    /// Path to log file (logs go to stderr when unset).
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Probability that a simulated request fails.
    #[arg(long)]
    pub failure_rate: Option<f64>,

    /// Seed for reproducible mock data.
    #[arg(long, env = "PARLEY_SEED")]
    pub seed: Option<u64>,

    /// Number of generated chats.
    #[arg(long)]
    pub chat_count: Option<usize>,

    /// Start with the incoming feed disconnected.
    #[arg(long)]
    pub no_incoming: bool,
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Load and parse a TOML config file.
///
/// An explicit path must exist. The default path is optional.
fn load_config_file(explicit_path: Option<&Path>) -> Result<ConfigFile, ConfigError> {
    if let Some(p) = explicit_path {
        let contents = std::fs::read_to_string(p).map_err(|e| ConfigError::ReadFile {
            path: p.to_path_buf(),
            source: e,
        })?;
        return Ok(toml::from_str(&contents)?);
    }

    let Some(config_dir) = dirs::config_dir() else {
        return Ok(ConfigFile::default());
    };
    let path = config_dir.join("parley").join("config.toml");

    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ConfigFile::default()),
        Err(e) => Err(ConfigError::ReadFile { path, source: e }),
    }
}
