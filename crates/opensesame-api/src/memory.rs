//! In-process state store.
//!
//! Behaves like a real store from the bridge's point of view (async calls,
//! push notifications, write rejections) and exposes fault-injection hooks
//! so callers can exercise every failure path deterministically.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use dashmap::{DashMap, DashSet};
use futures_util::StreamExt;
use tokio::sync::{broadcast, watch};
use tokio_stream::wrappers::BroadcastStream;

use crate::error::Error;
use crate::store::{NotificationStream, StateStore};
use crate::types::{Notification, ObjectMeta, PointState, PointValue, ScanResult};

const NOTIFY_CHANNEL_CAPACITY: usize = 64;

/// A cheaply cloneable in-memory [`StateStore`].
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

struct Inner {
    objects: DashMap<String, PointState>,
    channels: DashMap<String, broadcast::Sender<Notification>>,
    rejected: DashMap<String, String>,
    failing_reads: DashSet<String>,
    writes: Mutex<Vec<(String, PointValue)>>,
    writes_paused: watch::Sender<bool>,
    clock: AtomicI64,
}

impl Default for Inner {
    fn default() -> Self {
        let (writes_paused, _) = watch::channel(false);
        Self {
            objects: DashMap::new(),
            channels: DashMap::new(),
            rejected: DashMap::new(),
            failing_reads: DashSet::new(),
            writes: Mutex::new(Vec::new()),
            writes_paused,
            clock: AtomicI64::new(0),
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Seeding ──────────────────────────────────────────────────────

    /// Insert (or replace) a state object.
    pub fn insert(&self, id: impl Into<String>, meta: ObjectMeta, value: Option<PointValue>) {
        let ts = self.inner.tick();
        self.inner.objects.insert(
            id.into(),
            PointState {
                value,
                ack: true,
                ts: Some(ts),
                meta,
            },
        );
    }

    /// Remove an object, as if it had been deleted from the store.
    pub fn remove(&self, id: &str) {
        self.inner.objects.remove(id);
    }

    /// Change a value from the device side and notify subscribers.
    pub fn push(&self, id: &str, value: PointValue, ack: bool) {
        self.inner.update(id, Some(value), ack);
    }

    // ── Fault injection ──────────────────────────────────────────────

    /// Reject every subsequent write to `id` with the given reason.
    pub fn reject_writes(&self, id: impl Into<String>, reason: impl Into<String>) {
        self.inner.rejected.insert(id.into(), reason.into());
    }

    /// Make every subsequent `get` of `id` fail, even though the object exists.
    pub fn fail_reads(&self, id: impl Into<String>) {
        self.inner.failing_reads.insert(id.into());
    }

    /// Hold all writes until [`resume_writes`](Self::resume_writes) is called.
    pub fn pause_writes(&self) {
        self.inner.writes_paused.send_replace(true);
    }

    pub fn resume_writes(&self) {
        self.inner.writes_paused.send_replace(false);
    }

    /// Drop every notification channel; open streams end.
    pub fn close(&self) {
        self.inner.channels.clear();
    }

    // ── Inspection ───────────────────────────────────────────────────

    /// Every write attempt received so far, in arrival order.
    pub fn writes(&self) -> Vec<(String, PointValue)> {
        self.inner
            .writes
            .lock()
            .map(|w| w.clone())
            .unwrap_or_default()
    }

    pub fn write_count(&self, id: &str) -> usize {
        self.writes().iter().filter(|(w, _)| w == id).count()
    }

    /// Current stored value of a point.
    pub fn value(&self, id: &str) -> Option<PointValue> {
        self.inner.objects.get(id).and_then(|s| s.value.clone())
    }
}

impl Inner {
    fn tick(&self) -> i64 {
        self.clock.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn update(&self, id: &str, value: Option<PointValue>, ack: bool) {
        let ts = self.tick();
        if let Some(mut state) = self.objects.get_mut(id) {
            state.value.clone_from(&value);
            state.ack = ack;
            state.ts = Some(ts);
        }

        let tx = self.channels.get(id).map(|tx| tx.clone());
        if let Some(tx) = tx {
            // No receivers is fine: nobody is subscribed yet.
            let _ = tx.send(Notification {
                id: id.to_owned(),
                value,
                ack,
                ts: Some(ts),
            });
        }
    }
}

impl StateStore for MemoryStore {
    fn scan_objects(
        &self,
        _type_filter: &str,
    ) -> impl Future<Output = Result<ScanResult, Error>> + Send {
        let scan: ScanResult = self
            .inner
            .objects
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().meta.clone()))
            .collect();
        async move { Ok(scan) }
    }

    fn get_point(&self, id: &str) -> impl Future<Output = Result<PointState, Error>> + Send {
        let inner = Arc::clone(&self.inner);
        let id = id.to_owned();
        async move {
            tokio::task::yield_now().await;
            if inner.failing_reads.contains(&id) {
                return Err(Error::Store {
                    status: 500,
                    message: format!("read of {id} failed"),
                });
            }
            inner
                .objects
                .get(&id)
                .map(|state| state.clone())
                .ok_or(Error::NotFound { id })
        }
    }

    fn set_point(
        &self,
        id: &str,
        value: PointValue,
    ) -> impl Future<Output = Result<(), Error>> + Send {
        let inner = Arc::clone(&self.inner);
        let id = id.to_owned();
        async move {
            if let Ok(mut writes) = inner.writes.lock() {
                writes.push((id.clone(), value.clone()));
            }

            let mut paused = inner.writes_paused.subscribe();
            paused
                .wait_for(|paused| !*paused)
                .await
                .map(drop)
                .map_err(|_| Error::Closed)?;

            if let Some(reason) = inner.rejected.get(&id).map(|r| r.clone()) {
                return Err(Error::Rejected {
                    id,
                    message: reason,
                });
            }
            if !inner.objects.contains_key(&id) {
                return Err(Error::NotFound { id });
            }

            // A commanded value is requested, not yet confirmed by the device.
            inner.update(&id, Some(value), false);
            Ok(())
        }
    }

    fn subscribe(&self, id: &str) -> Result<NotificationStream, Error> {
        let rx = self
            .inner
            .channels
            .entry(id.to_owned())
            .or_insert_with(|| broadcast::channel(NOTIFY_CHANNEL_CAPACITY).0)
            .subscribe();

        Ok(BroadcastStream::new(rx)
            .filter_map(|item| std::future::ready(item.ok()))
            .boxed())
    }
}
