//! CLI error types with miette diagnostics.
//!
//! Maps config, bridge and server failures into user-facing errors with
//! actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use opensesame_config::ConfigError;
use opensesame_core::CoreError;
use opensesame_http::ServerError;

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const CONFIG: i32 = 2;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Configuration ────────────────────────────────────────────────
    #[error("Configuration file not found: {path}")]
    #[diagnostic(
        code(opensesame::no_config),
        help("Create it, or point --config (OPENSESAME_CONFIG) at an existing file.")
    )]
    NoConfig { path: String },

    #[error("No password found for store user '{username}'")]
    #[diagnostic(
        code(opensesame::no_credentials),
        help(
            "Set store.password_env to an environment variable holding the password,\n\
             store it in the system keyring under service 'opensesame',\n\
             or set store.password in the config file."
        )
    )]
    NoCredentials { username: String },

    #[error("Invalid configuration: {message}")]
    #[diagnostic(code(opensesame::config))]
    Config { message: String },

    #[error("No usable points: {message}")]
    #[diagnostic(
        code(opensesame::registry),
        help(
            "Add [[points]] entries to the config file, or enable bridge.scan\n\
             and check that the store holds points with one of bridge.roles."
        )
    )]
    Registry { message: String },

    // ── Store ────────────────────────────────────────────────────────
    #[error("Could not reach the state store")]
    #[diagnostic(
        code(opensesame::connection_failed),
        help("Check store.url and that the simple-api adapter is running.")
    )]
    ConnectionFailed {
        #[source]
        source: opensesame_api::Error,
    },

    // ── Server ───────────────────────────────────────────────────────
    #[error(transparent)]
    #[diagnostic(code(opensesame::server))]
    Server(#[from] ServerError),

    #[error("{0}")]
    #[diagnostic(code(opensesame::bridge))]
    Bridge(CoreError),

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NoConfig { .. }
            | Self::NoCredentials { .. }
            | Self::Config { .. }
            | Self::Registry { .. } => exit_code::CONFIG,
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            _ => exit_code::GENERAL,
        }
    }
}

// ── Conversions ──────────────────────────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NotFound { path } => Self::NoConfig {
                path: path.display().to_string(),
            },
            ConfigError::NoCredentials { username } => Self::NoCredentials { username },
            ConfigError::Client(source) => Self::ConnectionFailed { source },
            other => Self::Config {
                message: other.to_string(),
            },
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Config { message } => Self::Registry { message },
            CoreError::Store(source) => Self::ConnectionFailed { source },
            other => Self::Bridge(other),
        }
    }
}
