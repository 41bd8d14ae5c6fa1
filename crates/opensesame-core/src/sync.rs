// ── Subscription synchronizer ──
//
// Seeds the mirror with one fetch per watched point, then keeps it fresh by
// consuming each point's change stream in its own task. Per-point order is
// the order of the stream; different points are unordered.

use std::sync::Arc;

use futures_util::StreamExt;
use futures_util::future::join_all;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use opensesame_api::{Notification, NotificationStream, StateStore};

use crate::model::PointMeta;
use crate::registry::Registry;
use crate::store::{Mirror, Update};

/// How pushed updates are applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncPolicy {
    /// Apply un-acknowledged pushes as a freshness hint. When `false` they
    /// are dropped and the mirror waits for the device's confirmation.
    pub apply_unacknowledged: bool,
}

impl Default for SyncPolicy {
    fn default() -> Self {
        Self {
            apply_unacknowledged: true,
        }
    }
}

/// Outcome of the startup synchronization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Points whose initial fetch succeeded.
    pub seeded: usize,
    /// Points whose initial fetch failed; their value stays absent.
    pub failed: usize,
    /// Points with a live change subscription.
    pub subscribed: usize,
}

/// Seed the mirror and spawn one subscription task per watched point.
///
/// Never fails: fetch and subscription errors are logged and isolated to
/// their point. The returned tasks stop when `cancel` fires or their
/// stream ends.
pub(crate) async fn start<S: StateStore>(
    registry: &Registry,
    store: &Arc<S>,
    mirror: &Arc<Mirror>,
    policy: SyncPolicy,
    cancel: &CancellationToken,
) -> (SyncReport, Vec<JoinHandle<()>>) {
    let mut report = SyncReport::default();

    // ── Initial fetch ────────────────────────────────────────────────
    let fetches = registry.watched().map(|point| async move {
        let result = store.get_point(&point.external_id).await;
        (point, result)
    });

    for (point, result) in join_all(fetches).await {
        match result {
            Ok(state) => {
                mirror.apply(
                    &point.external_id,
                    Update::new(state.value, state.ack),
                    Some(PointMeta::from(&state.meta)),
                );
                report.seeded += 1;
            }
            Err(e) => {
                warn!(id = %point.external_id, error = %e, "initial fetch failed");
                report.failed += 1;
            }
        }
    }

    // ── Subscriptions ────────────────────────────────────────────────
    let mut handles = Vec::with_capacity(registry.watched_len());
    for point in registry.watched() {
        match store.subscribe(&point.external_id) {
            Ok(stream) => {
                handles.push(tokio::spawn(consume(
                    point.external_id.clone(),
                    stream,
                    Arc::clone(mirror),
                    policy,
                    cancel.child_token(),
                )));
                report.subscribed += 1;
            }
            Err(e) => {
                warn!(id = %point.external_id, error = %e, "subscription failed");
            }
        }
    }

    (report, handles)
}

/// Apply one point's notifications in receipt order.
async fn consume(
    external_id: String,
    mut stream: NotificationStream,
    mirror: Arc<Mirror>,
    policy: SyncPolicy,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            note = stream.next() => {
                let Some(note) = note else {
                    debug!(id = %external_id, "change stream ended");
                    break;
                };
                apply_notification(&mirror, policy, note);
            }
        }
    }
}

fn apply_notification(mirror: &Mirror, policy: SyncPolicy, note: Notification) {
    let id = note.id.clone();
    let update = Update::from(note);

    if !update.is_acknowledged() {
        if !policy.apply_unacknowledged {
            debug!(id = %id, "un-acknowledged update dropped");
            return;
        }
        warn!(id = %id, "applying un-acknowledged update");
    }

    mirror.apply(&id, update, None);
}
