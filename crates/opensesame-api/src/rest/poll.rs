//! Polling subscriptions with backoff.
//!
//! The REST surface cannot push, so each subscribed point gets its own
//! polling loop. The first successful read is always yielded, since the
//! subscriber cannot know what changed since its own last fetch; every
//! later read whose `(val, ack, ts)` differs yields a notification. Failed
//! reads back off exponentially.

use std::time::Duration;

use futures_util::StreamExt;

use super::client::RestStore;
use crate::store::{NotificationStream, StateStore};
use crate::types::{Notification, PointValue};

// ── PollConfig ───────────────────────────────────────────────────────

/// Timing of polling subscriptions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollConfig {
    /// Delay between successful polls. Default: 1s.
    pub interval: Duration,

    /// Delay after the first failed poll. Default: 1s.
    pub initial_backoff: Duration,

    /// Upper bound on backoff delay. Default: 30s.
    pub max_backoff: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
        }
    }
}

/// What a poll observed, used to detect changes.
type Observation = (Option<PointValue>, bool, Option<i64>);

// ── Polling loop ─────────────────────────────────────────────────────

/// Stream of change notifications for `id`, produced by polling `get`.
///
/// Ends when the store is shut down.
pub(crate) fn poll_notifications(store: RestStore, id: String) -> NotificationStream {
    async_stream::stream! {
        let cancel = store.cancel_token().clone();
        let config = store.poll_config().clone();
        let mut last: Option<Observation> = None;
        let mut failures: u32 = 0;

        loop {
            let result = tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                r = store.get_point(&id) => r,
            };

            let delay = match result {
                Ok(state) => {
                    failures = 0;
                    let seen = (state.value, state.ack, state.ts);
                    let changed = last.as_ref() != Some(&seen);
                    let note = changed.then(|| Notification {
                        id: id.clone(),
                        value: seen.0.clone(),
                        ack: seen.1,
                        ts: seen.2,
                    });
                    last = Some(seen);
                    if let Some(note) = note {
                        yield note;
                    }
                    config.interval
                }
                Err(e) => {
                    let delay = backoff_delay(failures, &config);
                    tracing::warn!(id = %id, error = %e, failures, ?delay, "poll failed");
                    failures = failures.saturating_add(1);
                    delay
                }
            };

            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(delay) => {}
            }
        }

        tracing::debug!(id = %id, "poll subscription ended");
    }
    .boxed()
}

// ── Backoff ──────────────────────────────────────────────────────────

/// Delay after `failures` consecutive failed reads: `initial_backoff`
/// doubled per failure, capped at `max_backoff`.
fn backoff_delay(failures: u32, config: &PollConfig) -> Duration {
    let factor = 1_u32.checked_shl(failures).unwrap_or(u32::MAX);
    config
        .initial_backoff
        .saturating_mul(factor)
        .min(config.max_backoff)
}
