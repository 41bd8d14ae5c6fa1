// ── Bridge lifecycle ──
//
// Startup wiring for one bridge instance: catalog scan, registry, mirror,
// synchronizer and gateway. Owns the background subscription tasks and
// stops them on shutdown.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use opensesame_api::StateStore;

use crate::config::BridgeConfig;
use crate::error::CoreError;
use crate::gateway::Gateway;
use crate::registry::Registry;
use crate::store::Mirror;
use crate::sync::{self, SyncPolicy, SyncReport};

/// Object type scanned for the catalog.
const SCAN_TYPE: &str = "state";

/// A running bridge.
///
/// Cheaply cloneable via `Arc<BridgeInner>`. Built once by
/// [`start`](Self::start); every request path reaches the bridge through
/// the [`Gateway`] it vends.
pub struct Bridge<S> {
    inner: Arc<BridgeInner<S>>,
}

struct BridgeInner<S> {
    registry: Arc<Registry>,
    mirror: Arc<Mirror>,
    gateway: Gateway<S>,
    report: SyncReport,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl<S> Clone for Bridge<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: StateStore> Bridge<S> {
    /// Build the registry, seed the mirror and start the subscriptions.
    ///
    /// Fails only with [`CoreError::Config`] when no point can be
    /// registered. Per-point fetch and subscription failures are logged and
    /// reported in [`report`](Self::report).
    pub async fn start(config: BridgeConfig, store: S) -> Result<Self, CoreError> {
        let store = Arc::new(store);
        let registry = Arc::new(load_registry(&config, store.as_ref()).await?);
        let mirror = Arc::new(Mirror::new(Arc::clone(&registry)));

        let cancel = CancellationToken::new();
        let policy = SyncPolicy {
            apply_unacknowledged: config.apply_unacknowledged,
        };
        let (report, handles) = sync::start(&registry, &store, &mirror, policy, &cancel).await;
        info!(
            watched = registry.watched_len(),
            catalog = registry.catalog_len(),
            seeded = report.seeded,
            failed = report.failed,
            subscribed = report.subscribed,
            "bridge started"
        );

        let gateway = Gateway::new(
            Arc::clone(&registry),
            Arc::clone(&mirror),
            store,
            config.fanout_concurrency,
        );

        Ok(Self {
            inner: Arc::new(BridgeInner {
                registry,
                mirror,
                gateway,
                report,
                cancel,
                task_handles: Mutex::new(handles),
            }),
        })
    }

    /// A handle for the transport layer.
    pub fn gateway(&self) -> Gateway<S> {
        self.inner.gateway.clone()
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.inner.registry
    }

    pub fn mirror(&self) -> &Arc<Mirror> {
        &self.inner.mirror
    }

    /// Outcome of the startup synchronization.
    pub fn report(&self) -> SyncReport {
        self.inner.report
    }

    /// Stop every subscription task and wait for them to finish.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
        debug!("bridge stopped");
    }
}

/// Scan the store (when enabled) and build the registry.
///
/// A failed scan is logged and treated as no scan, so configured points
/// still work while the catalog is unavailable.
pub async fn load_registry<S: StateStore>(
    config: &BridgeConfig,
    store: &S,
) -> Result<Registry, CoreError> {
    let scan = if config.scan {
        match store.scan_objects(SCAN_TYPE).await {
            Ok(scan) => {
                debug!(objects = scan.len(), "catalog scanned");
                Some(scan)
            }
            Err(e) => {
                warn!(error = %e, "catalog scan failed");
                None
            }
        }
    } else {
        None
    };

    Registry::build(&config.points, scan.as_ref(), &config.roles)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::time::Duration;

    use opensesame_api::{MemoryStore, ObjectMeta, PointValue};

    use crate::config::PointEntry;
    use crate::model::WebId;

    fn meta(role: &str) -> ObjectMeta {
        ObjectMeta {
            name: None,
            value_type: Some("boolean".into()),
            role: Some(role.into()),
        }
    }

    fn store() -> MemoryStore {
        let store = MemoryStore::new();
        store.insert("hm-rpc.1.ABC123.1.STATE", meta("switch"), Some(false.into()));
        store.insert("zwave.0.lamp", meta("switch"), Some(true.into()));
        store.insert("zwave.0.temp", meta("value.temperature"), None);
        store
    }

    #[tokio::test]
    async fn start_with_configured_points() {
        let config = BridgeConfig::default()
            .with_points(vec![PointEntry::named("hm-rpc.1.ABC123.1.STATE", "Garage")]);

        let bridge = Bridge::start(config, store()).await.unwrap();

        assert_eq!(bridge.registry().watched_len(), 1);
        assert_eq!(bridge.registry().catalog_len(), 2);
        assert_eq!(bridge.report().seeded, 1);

        let snap = bridge
            .gateway()
            .point(&WebId::from("hm-rpc_1_ABC123_1_STATE"))
            .unwrap();
        assert_eq!(snap.name, "Garage");
        assert_eq!(snap.value, Some(PointValue::Bool(false)));

        bridge.shutdown().await;
    }

    #[tokio::test]
    async fn start_without_points_watches_the_catalog() {
        let bridge = Bridge::start(BridgeConfig::default(), store()).await.unwrap();

        let ids: Vec<_> = bridge
            .registry()
            .watched()
            .map(|p| p.external_id.clone())
            .collect();
        assert_eq!(ids, vec!["hm-rpc.1.ABC123.1.STATE", "zwave.0.lamp"]);
        bridge.shutdown().await;
    }

    #[tokio::test]
    async fn empty_scan_and_no_points_is_a_config_error() {
        let result = Bridge::start(BridgeConfig::default(), MemoryStore::new()).await;
        assert!(matches!(result, Err(CoreError::Config { .. })));
    }

    #[tokio::test]
    async fn scan_disabled_requires_points() {
        let config = BridgeConfig {
            scan: false,
            ..BridgeConfig::default()
        };
        let result = Bridge::start(config, store()).await;
        assert!(matches!(result, Err(CoreError::Config { .. })));
    }

    #[tokio::test]
    async fn shutdown_joins_subscriptions() {
        let config = BridgeConfig::default().with_points(vec![
            PointEntry::new("zwave.0.lamp"),
            PointEntry::new("hm-rpc.1.ABC123.1.STATE"),
        ]);
        let bridge = Bridge::start(config, store()).await.unwrap();
        assert_eq!(bridge.report().subscribed, 2);

        tokio::time::timeout(Duration::from_secs(5), bridge.shutdown())
            .await
            .unwrap();
    }
}
