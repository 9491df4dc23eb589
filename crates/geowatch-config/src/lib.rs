//! Shared configuration for geowatch.
//!
//! TOML profiles layered with environment overrides, and translation to
//! the runtime types the other crates take (`geowatch_core::AlertsConfig`,
//! `geowatch_api::transport::TransportConfig`). Never consulted by the
//! library crates themselves; the CLI reads it and hands the results in.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use geowatch_api::transport::{TlsMode, TransportConfig};
use geowatch_core::AlertsConfig;
use geowatch_core::config::{DEFAULT_RECENT_CAPACITY, DEFAULT_RETRY_DELAY, DEFAULT_WS_URL};

/// Default REST base URL.
pub const DEFAULT_API_URL: &str = "http://localhost:8080";

/// Prefix for environment overrides, e.g. `GEOWATCH_DEFAULTS__OUTPUT=json`.
pub const ENV_PREFIX: &str = "GEOWATCH_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{name}' not found in config")]
    UnknownProfile { name: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

impl ConfigError {
    fn invalid(field: &str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when `--profile` is not given.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named backend profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default)]
    pub insecure: bool,

    /// REST request timeout, seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            insecure: false,
            timeout: default_timeout(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    30
}

/// A named backend profile.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Profile {
    /// REST base URL (e.g. "http://localhost:8080").
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Live alert channel URL (e.g. "ws://localhost:8080/ws/alerts").
    #[serde(default = "default_ws_url")]
    pub ws_url: String,

    /// Path to a custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Override insecure TLS setting.
    pub insecure: Option<bool>,

    /// Override request timeout, seconds.
    pub timeout: Option<u64>,

    /// Delay between live channel reconnect attempts.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// How many events the live view keeps in its recent list.
    #[serde(default = "default_recent_capacity")]
    pub recent_capacity: usize,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            ws_url: default_ws_url(),
            ca_cert: None,
            insecure: None,
            timeout: None,
            retry_delay_ms: default_retry_delay_ms(),
            recent_capacity: default_recent_capacity(),
        }
    }
}

fn default_api_url() -> String {
    DEFAULT_API_URL.into()
}
fn default_ws_url() -> String {
    DEFAULT_WS_URL.into()
}
fn default_retry_delay_ms() -> u64 {
    u64::try_from(DEFAULT_RETRY_DELAY.as_millis()).unwrap_or(3000)
}
fn default_recent_capacity() -> usize {
    DEFAULT_RECENT_CAPACITY
}

impl Config {
    /// Look up a profile by name, falling back to `default_profile`. With
    /// no name and no profiles at all, the built-in localhost profile is
    /// returned.
    pub fn profile(&self, name: Option<&str>) -> Result<(String, Profile), ConfigError> {
        let requested = name.map(str::to_owned);
        let name = requested
            .clone()
            .or_else(|| self.default_profile.clone())
            .unwrap_or_else(|| "default".into());

        match self.profiles.get(&name) {
            Some(profile) => Ok((name, profile.clone())),
            None if requested.is_none() => Ok((name, Profile::default())),
            None => Err(ConfigError::UnknownProfile { name }),
        }
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("dev", "geowatch", "geowatch").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("geowatch");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Layered sources: built-in defaults, then the TOML file, then
/// `GEOWATCH_*` variables (`__` separates nesting levels).
pub fn figment_for(path: &Path) -> Figment {
    Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
}

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load the full Config from `path` + environment. A missing file is not
/// an error.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let config: Config = figment_for(path).extract()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Translation to runtime types ────────────────────────────────────

fn parse_url(field: &str, raw: &str, schemes: &[&str]) -> Result<Url, ConfigError> {
    let url = Url::parse(raw).map_err(|e| ConfigError::invalid(field, format!("'{raw}': {e}")))?;
    if !schemes.contains(&url.scheme()) {
        return Err(ConfigError::invalid(
            field,
            format!("'{raw}' must use one of: {}", schemes.join(", ")),
        ));
    }
    Ok(url)
}

/// Validated REST base URL.
pub fn api_url(profile: &Profile) -> Result<Url, ConfigError> {
    parse_url("api_url", &profile.api_url, &["http", "https"])
}

/// Build the REST transport settings for a profile.
pub fn transport_config(profile: &Profile, defaults: &Defaults) -> TransportConfig {
    let tls = if profile.insecure.unwrap_or(defaults.insecure) {
        TlsMode::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsMode::CustomCa(ca_path.clone())
    } else {
        TlsMode::System
    };

    TransportConfig {
        tls,
        timeout: Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout)),
    }
}

/// Build the live alert configuration for a profile.
pub fn alerts_config(profile: &Profile) -> Result<AlertsConfig, ConfigError> {
    let ws_url = parse_url("ws_url", &profile.ws_url, &["ws", "wss"])?;
    if profile.retry_delay_ms == 0 {
        return Err(ConfigError::invalid("retry_delay_ms", "must be greater than zero"));
    }
    if profile.recent_capacity == 0 {
        return Err(ConfigError::invalid("recent_capacity", "must be at least 1"));
    }

    Ok(AlertsConfig {
        retry_delay: Duration::from_millis(profile.retry_delay_ms),
        recent_capacity: profile.recent_capacity,
        ..AlertsConfig::new(ws_url)
    })
}
