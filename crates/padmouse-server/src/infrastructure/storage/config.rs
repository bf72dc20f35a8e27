//! TOML-based configuration for the server.
//!
//! Reads and writes [`AppConfig`] to the platform-appropriate config file:
//! - Windows:  `%APPDATA%\Padmouse\config.toml`
//! - Linux:    `$XDG_CONFIG_HOME/padmouse/config.toml` (or `~/.config/...`)
//! - macOS:    `~/Library/Application Support/Padmouse/config.toml`
//!
//! ```toml
//! [server]
//! bind_address = "0.0.0.0"
//! port = 8888
//! session_policy = "preempt"   # preempt | reject-new | concurrent
//! idle_timeout_secs = 30
//! log_level = "info"
//!
//! [input]
//! sensitivity = 1.0
//! max_step = 1000
//! wire_format = "auto"         # auto | binary | json-lines
//! # screen_width = 1920        # both or neither; clamps absolute moves
//! # screen_height = 1080
//! ```
//!
//! Every field has a serde default, so a missing file, a missing section, or
//! a file from an older version all load cleanly.

use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use padmouse_core::WireFormat;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::admission::SessionPolicy;
use crate::application::translate_input::TranslatorSettings;
use crate::infrastructure::network::ListenerSettings;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// A value is out of range or inconsistent.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

// ── Config schema types ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub input: InputConfig,
}

/// Listener and session settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    /// IP address to bind.  `"0.0.0.0"` accepts phones on any interface.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// TCP port the companion app connects to.
    #[serde(default = "default_port")]
    pub port: u16,
    /// What happens when a second device connects.
    #[serde(default)]
    pub session_policy: SessionPolicy,
    /// Seconds without any received byte before a session is torn down.
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
    /// `tracing` filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Pointer translation settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InputConfig {
    /// Multiplier applied to relative moves and scrolls.
    #[serde(default = "default_sensitivity")]
    pub sensitivity: f64,
    /// Largest per-event displacement on each axis, in pixels.
    #[serde(default = "default_max_step")]
    pub max_step: i32,
    /// Accepted framing.
    #[serde(default)]
    pub wire_format: WireFormat,
    /// Screen width used to clamp absolute moves.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screen_width: Option<u32>,
    /// Screen height used to clamp absolute moves.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screen_height: Option<u32>,
}

/// Longest accepted `idle_timeout_secs` (one day).
pub const MAX_IDLE_TIMEOUT_SECS: u64 = 24 * 60 * 60;

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8888
}
fn default_idle_timeout_secs() -> u64 {
    30
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_sensitivity() -> f64 {
    1.0
}
fn default_max_step() -> i32 {
    1000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            session_policy: SessionPolicy::default(),
            idle_timeout_secs: default_idle_timeout_secs(),
            log_level: default_log_level(),
        }
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            sensitivity: default_sensitivity(),
            max_step: default_max_step(),
            wire_format: WireFormat::default(),
            screen_width: None,
            screen_height: None,
        }
    }
}

// ── Validation and conversion ─────────────────────────────────────────────────

impl AppConfig {
    /// Checks value ranges and cross-field consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.bind_addr()?;
        let idle = self.server.idle_timeout_secs;
        if idle == 0 || idle > MAX_IDLE_TIMEOUT_SECS {
            return Err(ConfigError::Invalid(format!(
                "idle_timeout_secs must be between 1 and {MAX_IDLE_TIMEOUT_SECS}, got {idle}"
            )));
        }
        let sensitivity = self.input.sensitivity;
        if !sensitivity.is_finite() || sensitivity <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "sensitivity must be a positive number, got {sensitivity}"
            )));
        }
        if self.input.max_step <= 0 {
            return Err(ConfigError::Invalid(format!(
                "max_step must be greater than 0, got {}",
                self.input.max_step
            )));
        }
        match (self.input.screen_width, self.input.screen_height) {
            (Some(0), _) | (_, Some(0)) => Err(ConfigError::Invalid(
                "screen_width and screen_height must be non-zero".into(),
            )),
            (Some(_), None) | (None, Some(_)) => Err(ConfigError::Invalid(
                "screen_width and screen_height must be set together".into(),
            )),
            _ => Ok(()),
        }
    }

    /// The socket address to listen on.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `bind_address` is not an IP address.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self.server.bind_address.parse().map_err(|_| {
            ConfigError::Invalid(format!(
                "bind_address '{}' is not an IP address",
                self.server.bind_address
            ))
        })?;
        Ok(SocketAddr::new(ip, self.server.port))
    }

    /// Validates the configuration and converts it into listener settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if [`validate`](Self::validate) fails.
    pub fn listener_settings(&self) -> Result<ListenerSettings, ConfigError> {
        self.validate()?;
        let screen_bounds = self.input.screen_width.zip(self.input.screen_height);
        Ok(ListenerSettings {
            policy: self.server.session_policy,
            idle_timeout: Duration::from_secs(self.server.idle_timeout_secs),
            wire_format: self.input.wire_format,
            translator: TranslatorSettings {
                sensitivity: self.input.sensitivity,
                max_step: self.input.max_step,
                screen_bounds,
            },
        })
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Determines the platform-appropriate directory for the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] when the platform config base
/// directory cannot be determined from the environment.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    platform_config_dir().ok_or(ConfigError::NoPlatformConfigDir)
}

/// Resolves the full path to the default config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the base directory cannot be
/// determined.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.toml"))
}

/// Loads `AppConfig` from `path`, returning `AppConfig::default()` if the
/// file does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config_from(path: &Path) -> Result<AppConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AppConfig::default()),
        Err(source) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Writes `config` to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config_to(path: &Path, config: &AppConfig) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("Padmouse"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("padmouse"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("Padmouse")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
