// ── Reactive state mirror ──
//
// Concurrent per-point cache of the last known value and metadata of every
// watched point, with push-based change notification via a `watch` channel.
// Shard locks are never held across an `.await`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::watch;
use tracing::warn;

use opensesame_api::{Notification, PointValue};

use crate::error::CoreError;
use crate::model::{Point, PointMeta, PointSnapshot, WebId};
use crate::registry::Registry;

// ── Update ──────────────────────────────────────────────────────────

/// A value change to apply, tagged with whether the owning device has
/// confirmed it.
#[derive(Debug, Clone, PartialEq)]
pub enum Update {
    /// Confirmed by the device or adapter.
    Acknowledged(Option<PointValue>),
    /// Requested but not yet confirmed, e.g. a command issued elsewhere.
    Unacknowledged(Option<PointValue>),
}

impl Update {
    pub fn new(value: Option<PointValue>, ack: bool) -> Self {
        if ack {
            Self::Acknowledged(value)
        } else {
            Self::Unacknowledged(value)
        }
    }

    pub fn is_acknowledged(&self) -> bool {
        matches!(self, Self::Acknowledged(_))
    }

    pub fn into_value(self) -> Option<PointValue> {
        match self {
            Self::Acknowledged(v) | Self::Unacknowledged(v) => v,
        }
    }
}

impl From<Notification> for Update {
    fn from(note: Notification) -> Self {
        Self::new(note.value, note.ack)
    }
}

// ── Mirror ──────────────────────────────────────────────────────────

struct MirrorEntry {
    point: Arc<Point>,
    meta: PointMeta,
    value: Option<PointValue>,
    pending: bool,
    updated_at: Option<DateTime<Utc>>,
}

impl MirrorEntry {
    fn snapshot(&self) -> PointSnapshot {
        PointSnapshot::build(
            &self.point,
            &self.meta,
            self.value.clone(),
            self.pending,
            self.updated_at,
        )
    }
}

/// Last known state of every watched point.
///
/// Reads never touch the store. Only the synchronizer and the command
/// dispatcher mutate entries; every mutation bumps a version counter that
/// subscribers observe through [`subscribe`](Self::subscribe).
pub struct Mirror {
    registry: Arc<Registry>,

    /// External id -> entry, one per watched point.
    entries: DashMap<String, MirrorEntry>,

    /// Version counter, bumped on every mutation.
    version: watch::Sender<u64>,
}

impl Mirror {
    /// Create an entry for every watched point, with no value yet.
    pub fn new(registry: Arc<Registry>) -> Self {
        let entries = registry
            .watched()
            .map(|point| {
                (
                    point.external_id.clone(),
                    MirrorEntry {
                        point: Arc::clone(point),
                        meta: point.meta.clone(),
                        value: None,
                        pending: false,
                        updated_at: None,
                    },
                )
            })
            .collect();
        let (version, _) = watch::channel(0u64);

        Self {
            registry,
            entries,
            version,
        }
    }

    // ── Reads ────────────────────────────────────────────────────────

    /// Snapshot of a watched point. Fails with
    /// [`CoreError::PointNotFound`] for unknown or catalog-only points.
    pub fn get(&self, web_id: &WebId) -> Result<PointSnapshot, CoreError> {
        self.resolve(web_id)
            .and_then(|point| self.get_external(&point.external_id))
            .ok_or_else(|| CoreError::PointNotFound {
                web_id: web_id.to_string(),
            })
    }

    /// Snapshot of a watched point by external id.
    pub fn get_external(&self, external_id: &str) -> Option<PointSnapshot> {
        self.entries.get(external_id).map(|e| e.snapshot())
    }

    /// Snapshots of every watched point, in registry order.
    pub fn snapshot_all(&self) -> Vec<PointSnapshot> {
        self.registry
            .watched()
            .filter_map(|point| self.get_external(&point.external_id))
            .collect()
    }

    /// Resolve a web id to a watched point.
    pub fn resolve(&self, web_id: &WebId) -> Option<Arc<Point>> {
        self.registry
            .resolve(web_id)
            .filter(|point| self.entries.contains_key(&point.external_id))
            .cloned()
    }

    pub fn is_pending(&self, external_id: &str) -> bool {
        self.entries.get(external_id).is_some_and(|e| e.pending)
    }

    /// Current version; increases with every mutation.
    pub fn version(&self) -> u64 {
        *self.version.borrow()
    }

    /// Subscribe to version changes.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // ── Mutations ────────────────────────────────────────────────────

    /// Apply a pushed or fetched value, refreshing metadata when given.
    ///
    /// Unknown external ids are logged and dropped. Returns `true` if an
    /// entry was updated.
    pub(crate) fn apply(&self, external_id: &str, update: Update, meta: Option<PointMeta>) -> bool {
        let Some(mut entry) = self.entries.get_mut(external_id) else {
            warn!(id = external_id, "update for unknown point dropped");
            return false;
        };
        entry.value = update.into_value();
        if let Some(meta) = meta {
            entry.meta.refresh(meta);
        }
        entry.updated_at = Some(Utc::now());
        drop(entry);

        self.bump_version();
        true
    }

    /// Atomically mark a point pending. Returns `false` if it is unknown
    /// or already pending.
    pub(crate) fn try_begin_command(&self, external_id: &str) -> bool {
        let began = match self.entries.get_mut(external_id) {
            Some(mut entry) if !entry.pending => {
                entry.pending = true;
                true
            }
            _ => false,
        };
        if began {
            self.bump_version();
        }
        began
    }

    /// Clear the pending flag, recording `value` if the write succeeded.
    pub(crate) fn finish_command(&self, external_id: &str, value: Option<PointValue>) {
        if let Some(mut entry) = self.entries.get_mut(external_id) {
            entry.pending = false;
            if let Some(value) = value {
                entry.value = Some(value);
                entry.updated_at = Some(Utc::now());
            }
        }
        self.bump_version();
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn bump_version(&self) {
        // `send_modify` updates unconditionally, even with zero receivers.
        self.version.send_modify(|v| *v += 1);
    }
}
