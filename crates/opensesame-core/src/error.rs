// ── Core error types ──
//
// User-facing failures of the bridge. Store errors from `opensesame-api`
// are translated here so the HTTP layer only ever sees one taxonomy.

use thiserror::Error;

/// Failures surfaced by the bridge to its callers.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Startup ─────────────────────────────────────────────────────
    /// The point registry could not be built. Fatal at startup.
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Request path ────────────────────────────────────────────────
    /// No point with this web id is known to the bridge.
    #[error("Point not found: {web_id}")]
    PointNotFound { web_id: String },

    /// A command for this point is already awaiting the store.
    #[error("A command for {web_id} is already in flight")]
    CommandInFlight { web_id: String },

    /// The store refused (or failed) the write. The mirror is unchanged.
    #[error("Write to {external_id} rejected: {cause}")]
    WriteRejected {
        external_id: String,
        #[source]
        cause: opensesame_api::Error,
    },

    /// One lookup of a fan-out read failed, so the whole read failed.
    #[error("Read of {failed_id} failed: {cause}")]
    PartialReadFailure {
        failed_id: String,
        #[source]
        cause: opensesame_api::Error,
    },

    // ── Store ───────────────────────────────────────────────────────
    /// Any other store failure.
    #[error(transparent)]
    Store(#[from] opensesame_api::Error),
}

impl CoreError {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Returns `true` for failures caused by the store being unreachable
    /// rather than by the request itself.
    pub fn is_store_failure(&self) -> bool {
        matches!(
            self,
            Self::WriteRejected { .. } | Self::PartialReadFailure { .. } | Self::Store(_)
        )
    }
}
