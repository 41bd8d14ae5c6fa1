use thiserror::Error;

/// Top-level error type for the `opensesame-api` crate.
///
/// Covers every failure mode of the store surface: transport, lookup,
/// write rejection and payload decoding. `opensesame-core` maps these
/// into bridge-level failures.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Request timed out.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// TLS handshake or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    /// Credentials were refused by the store.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    // ── Store semantics ─────────────────────────────────────────────
    /// The requested object does not exist in the store.
    #[error("Object not found: {id}")]
    NotFound { id: String },

    /// The store refused a write.
    #[error("Write to {id} rejected: {message}")]
    Rejected { id: String, message: String },

    /// The store reported an error with an HTTP status.
    #[error("Store error (HTTP {status}): {message}")]
    Store { status: u16, message: String },

    /// The store has been shut down and accepts no more requests.
    #[error("State store closed")]
    Closed,

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            Self::Transport(e) => e.status() == Some(reqwest::StatusCode::NOT_FOUND),
            Self::Store { status: 404, .. } => true,
            _ => false,
        }
    }
}
