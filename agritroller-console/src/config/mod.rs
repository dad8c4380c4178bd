//! Configuration for the operator console.
//!
//! Supports layered configuration with the following priority (highest first):
//! 1. CLI arguments
//! 2. Environment variables (via clap `env` attribute)
//! 3. TOML config file (`~/.config/agritroller/console.toml`)
//! 4. Compiled defaults
//!
//! Missing config file is not an error (defaults are used). An explicit
//! `--config` path that doesn't exist is an error.

use std::path::PathBuf;
use std::time::Duration;

use chrono::format::{Item, StrftimeItems};

use crate::endpoint::{self, DEFAULT_API_BASE_URL, EndpointError};
use crate::stream::lifecycle::{DEFAULT_RECONNECT_INTERVAL, ReconnectPolicy};
use crate::stream::{DEFAULT_CHANNEL_CAPACITY, StreamConfig};

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

    /// `reconnect_strategy` is neither `fixed` nor `backoff`.
    #[error("unknown reconnect strategy {0:?} (expected \"fixed\" or \"backoff\")")]
    UnknownStrategy(String),

    /// The API base address does not yield a stream endpoint.
    #[error(transparent)]
    Endpoint(#[from] EndpointError),

    /// `timestamp_format` contains a specifier chrono does not know.
    #[error("invalid timestamp format {0:?}")]
    TimestampFormat(String),
}

/// Shortest retry delay accepted; smaller configured values are raised to it.
pub const MIN_RECONNECT_INTERVAL: Duration = Duration::from_millis(100);

// ---------------------------------------------------------------------------
// TOML file structs (all fields Option for partial overrides)
// ---------------------------------------------------------------------------

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ConfigFile {
    stream: StreamFileConfig,
    ui: UiFileConfig,
}

/// `[stream]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct StreamFileConfig {
    api_base_url: Option<String>,
    reconnect_interval_ms: Option<u64>,
    reconnect_strategy: Option<String>,
    reconnect_max_ms: Option<u64>,
    reconnect_jitter: Option<bool>,
    connect_timeout_secs: Option<u64>,
    channel_capacity: Option<usize>,
}

/// `[ui]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct UiFileConfig {
    poll_timeout_ms: Option<u64>,
    timestamp_format: Option<String>,
}

// ---------------------------------------------------------------------------
// Resolved configuration
// ---------------------------------------------------------------------------

/// How the retry delay evolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReconnectStrategy {
    /// Same delay every time.
    #[default]
    Fixed,
    /// Doubling delay, capped.
    Backoff,
}

impl std::str::FromStr for ReconnectStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fixed" => Ok(Self::Fixed),
            "backoff" => Ok(Self::Backoff),
            _ => Err(ConfigError::UnknownStrategy(s.to_string())),
        }
    }
}

/// Fully resolved console configuration.
#[derive(Debug, Clone)]
pub struct ConsoleConfig {
    // -- Stream --
    /// REST API base address; the stream endpoint is derived from it.
    pub api_base_url: String,
    /// Delay before the first retry (every retry for `Fixed`).
    pub reconnect_interval: Duration,
    /// Retry delay strategy.
    pub reconnect_strategy: ReconnectStrategy,
    /// Upper bound for the backoff delay.
    pub reconnect_max: Duration,
    /// Randomize backoff delays.
    pub reconnect_jitter: bool,
    /// Optional cap on each connection attempt.
    pub connect_timeout: Option<Duration>,
    /// Capacity of the link event channel.
    pub channel_capacity: usize,
    /// Connect as soon as the console starts.
    pub autoconnect: bool,

    // -- UI --
    /// Poll timeout for the TUI event loop.
    pub poll_timeout: Duration,
    /// Timestamp display format string (chrono).
    pub timestamp_format: String,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            reconnect_interval: DEFAULT_RECONNECT_INTERVAL,
            reconnect_strategy: ReconnectStrategy::Fixed,
            reconnect_max: Duration::from_secs(30),
            reconnect_jitter: false,
            connect_timeout: None,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            autoconnect: true,
            poll_timeout: Duration::from_millis(50),
            timestamp_format: "%H:%M:%S".to_string(),
        }
    }
}

impl ConsoleConfig {
    /// Load configuration by merging CLI args, env vars, and a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the explicit config file cannot be read,
    /// a config file cannot be parsed, `reconnect_strategy` is unknown, or
    /// `timestamp_format` is not a valid chrono pattern.
    ///
    /// A retry interval below [`MIN_RECONNECT_INTERVAL`] is raised to it, and
    /// the backoff cap is never below the interval.
    pub fn load(cli: &CliArgs) -> Result<Self, ConfigError> {
        let file = load_config_file(cli.config.as_deref())?;
        Self::resolve(cli, &file)
    }

    /// Priority: CLI > file > default.
    fn resolve(cli: &CliArgs, file: &ConfigFile) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let stream = &file.stream;

        let reconnect_strategy = match stream.reconnect_strategy.as_deref() {
            Some(s) => s.parse()?,
            None => defaults.reconnect_strategy,
        };
        let reconnect_interval = stream
            .reconnect_interval_ms
            .map_or(defaults.reconnect_interval, Duration::from_millis)
            .max(MIN_RECONNECT_INTERVAL);

        let timestamp_format = cli
            .timestamp_format
            .clone()
            .or_else(|| file.ui.timestamp_format.clone())
            .unwrap_or(defaults.timestamp_format);
        if StrftimeItems::new(&timestamp_format).any(|item| matches!(item, Item::Error)) {
            return Err(ConfigError::TimestampFormat(timestamp_format));
        }

        Ok(Self {
            api_base_url: cli
                .api_base_url
                .clone()
                .or_else(|| stream.api_base_url.clone())
                .unwrap_or(defaults.api_base_url),
            reconnect_interval,
            reconnect_strategy,
            reconnect_max: stream
                .reconnect_max_ms
                .map_or(defaults.reconnect_max, Duration::from_millis)
                .max(reconnect_interval),
            reconnect_jitter: stream.reconnect_jitter.unwrap_or(defaults.reconnect_jitter),
            connect_timeout: stream.connect_timeout_secs.map(Duration::from_secs),
            channel_capacity: stream
                .channel_capacity
                .unwrap_or(defaults.channel_capacity),
            autoconnect: !cli.no_autoconnect,
            poll_timeout: file
                .ui
                .poll_timeout_ms
                .map_or(defaults.poll_timeout, Duration::from_millis),
            timestamp_format,
        })
    }

    /// The reconnection policy these settings describe.
    #[must_use]
    pub const fn reconnect_policy(&self) -> ReconnectPolicy {
        match self.reconnect_strategy {
            ReconnectStrategy::Fixed => ReconnectPolicy::Fixed(self.reconnect_interval),
            ReconnectStrategy::Backoff => ReconnectPolicy::Backoff {
                initial: self.reconnect_interval,
                max: self.reconnect_max,
                jitter: self.reconnect_jitter,
            },
        }
    }

    /// Build the driver configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Endpoint`] if `api_base_url` does not map to
    /// a WebSocket endpoint.
    pub fn to_stream_config(&self) -> Result<StreamConfig, ConfigError> {
        let endpoint = endpoint::event_stream_url(&self.api_base_url)?;
        Ok(StreamConfig {
            endpoint,
            policy: self.reconnect_policy(),
            channel_capacity: self.channel_capacity,
        })
    }
}

/// CLI arguments parsed by clap.
#[derive(clap::Parser, Debug, Default)]
#[command(version, about = "AgriTroller operator console")]
pub struct CliArgs {
    /// Base address of the controller's REST API (e.g. `http://farm.local:8080/api`).
    #[arg(long, env = "AGRITROLLER_API_BASE_URL")]
    pub api_base_url: Option<String>,

    /// Path to config file (default: `~/.config/agritroller/console.toml`).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Start disconnected; press `c` to connect.
    #[arg(long)]
    pub no_autoconnect: bool,

    /// Timestamp display format (chrono format string).
    #[arg(long)]
    pub timestamp_format: Option<String>,

    /// Log level filter (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", env = "AGRITROLLER_LOG")]
    pub log_level: String,

    /// Path to log file (default: `$TMPDIR/agritroller-console.log`).
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

/// Load and parse a TOML config file.
///
/// If `explicit_path` is `Some`, the file must exist (error if not).
/// If `explicit_path` is `None`, the default path is tried and missing file
/// is treated as empty config.
fn load_config_file(explicit_path: Option<&std::path::Path>) -> Result<ConfigFile, ConfigError> {
    let path = if let Some(p) = explicit_path {
        let contents = std::fs::read_to_string(p).map_err(|e| ConfigError::ReadFile {
            path: p.to_path_buf(),
            source: e,
        })?;
        return Ok(toml::from_str(&contents)?);
    } else {
        let Some(config_dir) = dirs::config_dir() else {
            return Ok(ConfigFile::default());
        };
        config_dir.join("agritroller").join("console.toml")
    };

    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ConfigFile::default()),
        Err(e) => Err(ConfigError::ReadFile { path, source: e }),
    }
}
