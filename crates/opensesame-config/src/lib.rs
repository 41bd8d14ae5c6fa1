//! Configuration for the opensesame bridge.
//!
//! TOML file + environment layering (figment), credential resolution
//! (env + keyring + plaintext), and translation into the runtime settings
//! of `opensesame-core` and `opensesame-api`.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use opensesame_api::{PollConfig, RestStore, TlsMode, TransportConfig};
use opensesame_core::{BridgeConfig, DEFAULT_FANOUT_CONCURRENCY, DEFAULT_ROLES, PointEntry};

/// Prefix of environment overrides, e.g. `OPENSESAME_SERVER__PORT=9000`.
pub const ENV_PREFIX: &str = "OPENSESAME_";

/// Keyring service name for stored passwords.
const KEYRING_SERVICE: &str = "opensesame";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("config file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("no password found for store user '{username}'")]
    NoCredentials { username: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("store client setup failed: {0}")]
    Client(#[from] opensesame_api::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level configuration file.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub bridge: BridgeSection,

    /// Watched points, in display order.
    #[serde(default)]
    pub points: Vec<PointEntry>,
}

/// `[server]`: the HTTP listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: IpAddr,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory of static web assets served for unknown paths.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub static_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            static_dir: None,
        }
    }
}

fn default_bind() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}
fn default_port() -> u16 {
    8088
}

/// `[store]`: the ioBroker simple-api endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    /// Base URL of the simple-api adapter.
    #[serde(default = "default_store_url")]
    pub url: String,

    /// User for authenticated instances. No credentials are sent when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Password (plaintext; prefer keyring or env var).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Environment variable name containing the password.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_env: Option<String>,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Polling period of change subscriptions.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Accept invalid TLS certificates.
    #[serde(default)]
    pub insecure: bool,

    /// Path to a custom CA certificate (PEM).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_cert: Option<PathBuf>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: default_store_url(),
            username: None,
            password: None,
            password_env: None,
            timeout_secs: default_timeout(),
            poll_interval_ms: default_poll_interval(),
            insecure: false,
            ca_cert: None,
        }
    }
}

fn default_store_url() -> String {
    "http://127.0.0.1:8087".into()
}
fn default_timeout() -> u64 {
    10
}
fn default_poll_interval() -> u64 {
    1000
}

/// `[bridge]`: catalog and synchronization behaviour.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BridgeSection {
    /// Scan the store's catalog at startup.
    #[serde(default = "default_true")]
    pub scan: bool,

    /// Role allow-set for catalog entries.
    #[serde(default = "default_roles")]
    pub roles: Vec<String>,

    /// Apply un-acknowledged pushes to the mirror.
    #[serde(default = "default_true")]
    pub apply_unacknowledged: bool,

    /// Bound on concurrent store lookups of `GET /get?all`.
    #[serde(default = "default_fanout")]
    pub fanout_concurrency: usize,
}

impl Default for BridgeSection {
    fn default() -> Self {
        Self {
            scan: true,
            roles: default_roles(),
            apply_unacknowledged: true,
            fanout_concurrency: default_fanout(),
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_roles() -> Vec<String> {
    DEFAULT_ROLES.iter().map(|r| (*r).to_owned()).collect()
}
fn default_fanout() -> usize {
    DEFAULT_FANOUT_CONCURRENCY
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("org", "opensesame", "opensesame").map_or_else(
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
    p.push("opensesame");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the configuration from defaults, the TOML file and environment.
///
/// An explicit `path` must exist; the default location may be absent.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = match path {
        Some(p) if !p.exists() => {
            return Err(ConfigError::NotFound {
                path: p.to_path_buf(),
            });
        }
        Some(p) => p.to_path_buf(),
        None => config_path(),
    };

    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(&path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: Config = figment.extract()?;
    config.validate()?;
    Ok(config)
}

impl Config {
    /// Check values figment cannot: URLs, ranges, point ids.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.store_url()?;
        if self.store.timeout_secs == 0 {
            return Err(invalid("store.timeout_secs", "must be at least 1"));
        }
        if self.store.poll_interval_ms == 0 {
            return Err(invalid("store.poll_interval_ms", "must be at least 1"));
        }
        if self.bridge.fanout_concurrency == 0 {
            return Err(invalid("bridge.fanout_concurrency", "must be at least 1"));
        }
        if let Some(entry) = self.points.iter().find(|p| p.id.trim().is_empty()) {
            return Err(invalid(
                "points",
                format!("entry {entry:?} has an empty id"),
            ));
        }
        Ok(())
    }

    /// Listener address of the HTTP server.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.server.bind, self.server.port)
    }

    pub fn store_url(&self) -> Result<Url, ConfigError> {
        self.store
            .url
            .parse()
            .map_err(|_| invalid("store.url", format!("invalid URL: {}", self.store.url)))
    }

    /// Copy with the plaintext password masked.
    pub fn redacted(&self) -> Self {
        let mut shown = self.clone();
        if shown.store.password.is_some() {
            shown.store.password = Some("********".into());
        }
        shown
    }

    /// Serialize to TOML with the plaintext password masked.
    pub fn to_toml_redacted(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(&self.redacted())?)
    }

    // ── Translation to runtime settings ──────────────────────────────

    pub fn bridge_config(&self) -> BridgeConfig {
        BridgeConfig {
            points: self.points.clone(),
            scan: self.bridge.scan,
            roles: self.bridge.roles.clone(),
            apply_unacknowledged: self.bridge.apply_unacknowledged,
            fanout_concurrency: self.bridge.fanout_concurrency,
        }
    }

    pub fn transport(&self) -> TransportConfig {
        let tls = if self.store.insecure {
            TlsMode::DangerAcceptInvalid
        } else if let Some(ref ca_path) = self.store.ca_cert {
            TlsMode::CustomCa(ca_path.clone())
        } else {
            TlsMode::System
        };

        TransportConfig {
            tls,
            timeout: Duration::from_secs(self.store.timeout_secs),
        }
    }

    pub fn poll_config(&self) -> PollConfig {
        PollConfig {
            interval: Duration::from_millis(self.store.poll_interval_ms),
            ..PollConfig::default()
        }
    }

    /// Build the REST store client, resolving credentials.
    pub fn build_store(&self) -> Result<RestStore, ConfigError> {
        let mut store = RestStore::new(self.store_url()?, &self.transport())?
            .with_poll_config(self.poll_config());

        if let Some((username, password)) = resolve_credentials(&self.store)? {
            store = store.with_credentials(username, password);
        }
        Ok(store)
    }
}

// ── Credential resolution ───────────────────────────────────────────

/// Resolve the store credentials.
///
/// Returns `None` when no username is configured. Otherwise the password
/// comes from the first of: the environment variable named by
/// `password_env`, the system keyring, the plaintext `password`.
pub fn resolve_credentials(
    store: &StoreConfig,
) -> Result<Option<(String, SecretString)>, ConfigError> {
    let Some(username) = store.username.clone() else {
        return Ok(None);
    };

    // 1. Env var named in the config
    if let Some(ref env_name) = store.password_env {
        if let Ok(val) = std::env::var(env_name) {
            return Ok(Some((username, SecretString::from(val))));
        }
    }

    // 2. System keyring
    if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, &username) {
        if let Ok(secret) = entry.get_password() {
            return Ok(Some((username, SecretString::from(secret))));
        }
    }

    // 3. Plaintext in config
    if let Some(ref pw) = store.password {
        return Ok(Some((username, SecretString::from(pw.clone()))));
    }

    Err(ConfigError::NoCredentials { username })
}
