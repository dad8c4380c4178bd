//! Settings for the event bus binary.
//!
//! A value given on the command line (or through its environment variable)
//! beats the `[server]` table of `~/.config/agritroller-bus/config.toml`,
//! which beats the built-in default. The bind address and buffer size are
//! checked here so `main` only ever sees a usable configuration.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use crate::bus::DEFAULT_EVENT_BUFFER;

/// Address the bus listens on when nothing else is configured; the same
/// port the field controller serves its API on.
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

/// Why the bus could not be configured.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file exists (or was named explicitly) but could not be read.
    #[error("cannot read bus config {path}: {source}")]
    ReadFile {
        /// File that was tried.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The config file is not valid TOML for the `[server]` table.
    #[error("invalid bus config: {0}")]
    ParseToml(#[from] toml::de::Error),

    /// The bind address is not `host:port` with a literal IP.
    #[error("invalid bind address {0:?}")]
    BindAddr(String),

    /// A zero-sized buffer would drop every published event.
    #[error("event_buffer must be at least 1")]
    EmptyBuffer,
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct BusConfigFile {
    server: ServerTable,
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ServerTable {
    bind_addr: Option<String>,
    event_buffer: Option<usize>,
}

/// Command line of `agritroller-bus`.
#[derive(clap::Parser, Debug, Default)]
#[command(version, about = "AgriTroller event bus server")]
pub struct BusCliArgs {
    /// Listen address, e.g. `127.0.0.1:9090`.
    #[arg(short, long, env = "AGRITROLLER_BUS_ADDR")]
    pub bind: Option<String>,

    /// Config file to use instead of `~/.config/agritroller-bus/config.toml`.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Events buffered per subscriber before the slowest start losing events.
    #[arg(long)]
    pub event_buffer: Option<usize>,

    /// Tracing filter used when `RUST_LOG` is unset.
    #[arg(long, default_value = "info", env = "AGRITROLLER_BUS_LOG")]
    pub log_level: String,
}

/// Validated bus settings.
#[derive(Debug, Clone)]
pub struct BusConfig {
    /// Socket the HTTP and WebSocket endpoints are served on.
    pub bind_addr: SocketAddr,
    /// Broadcast capacity; a subscriber lagging further behind skips events.
    pub event_buffer: usize,
    /// Tracing filter.
    pub log_level: String,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            event_buffer: DEFAULT_EVENT_BUFFER,
            log_level: "info".to_string(),
        }
    }
}

impl BusConfig {
    /// Reads the config file (if any) and applies the command line on top.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a named config file is missing, any config
    /// file is unreadable or malformed, the bind address does not parse, or
    /// the event buffer is zero.
    pub fn load(cli: &BusCliArgs) -> Result<Self, ConfigError> {
        let file = match (&cli.config, default_path()) {
            (Some(path), _) => read_file(path)?,
            (None, Some(path)) => read_optional(&path)?,
            (None, None) => BusConfigFile::default(),
        };
        Self::resolve(cli, &file)
    }

    fn resolve(cli: &BusCliArgs, file: &BusConfigFile) -> Result<Self, ConfigError> {
        let bind = cli
            .bind
            .as_deref()
            .or(file.server.bind_addr.as_deref())
            .unwrap_or(DEFAULT_BIND_ADDR);
        let bind_addr = bind
            .trim()
            .parse()
            .map_err(|_| ConfigError::BindAddr(bind.to_string()))?;

        let event_buffer = cli
            .event_buffer
            .or(file.server.event_buffer)
            .unwrap_or(DEFAULT_EVENT_BUFFER);
        if event_buffer == 0 {
            return Err(ConfigError::EmptyBuffer);
        }

        Ok(Self {
            bind_addr,
            event_buffer,
            log_level: cli.log_level.clone(),
        })
    }
}

fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("agritroller-bus").join("config.toml"))
}

fn read_file(path: &Path) -> Result<BusConfigFile, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(toml::from_str(&contents)?)
}

/// Like [`read_file`], but a missing file means "no overrides".
fn read_optional(path: &Path) -> Result<BusConfigFile, ConfigError> {
    match read_file(path) {
        Err(ConfigError::ReadFile { source, .. })
            if source.kind() == std::io::ErrorKind::NotFound =>
        {
            Ok(BusConfigFile::default())
        }
        other => other,
    }
}
