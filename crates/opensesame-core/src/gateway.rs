// ── Bridge gateway ──
//
// The seam between the transport layer and the bridge components. Cheap
// to clone; every clone shares the same registry, mirror and store.

use std::sync::Arc;

use strum::{Display, EnumString};

use opensesame_api::StateStore;

use crate::command::{Command, Dispatcher};
use crate::error::CoreError;
use crate::model::{Point, PointSnapshot, WebId};
use crate::query::Aggregator;
use crate::registry::Registry;
use crate::store::Mirror;

/// Which points a read covers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum ReadScope {
    /// Watched points, served from the mirror.
    #[default]
    Watched,
    /// The full catalog, read from the store.
    All,
}

/// Request-facing facade over the mirror, dispatcher and aggregator.
pub struct Gateway<S> {
    inner: Arc<GatewayInner<S>>,
}

struct GatewayInner<S> {
    registry: Arc<Registry>,
    mirror: Arc<Mirror>,
    dispatcher: Dispatcher<S>,
    aggregator: Aggregator<S>,
}

impl<S> Clone for Gateway<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: StateStore> Gateway<S> {
    pub fn new(
        registry: Arc<Registry>,
        mirror: Arc<Mirror>,
        store: Arc<S>,
        fanout_concurrency: usize,
    ) -> Self {
        Self {
            inner: Arc::new(GatewayInner {
                dispatcher: Dispatcher::new(Arc::clone(&store), Arc::clone(&mirror)),
                aggregator: Aggregator::new(store, Arc::clone(&mirror), fanout_concurrency),
                registry,
                mirror,
            }),
        }
    }

    /// Snapshots of the points in `scope`.
    ///
    /// `Watched` never touches the store. `All` reads every catalog point
    /// from the store and fails entirely if any lookup fails.
    pub async fn read(&self, scope: ReadScope) -> Result<Vec<PointSnapshot>, CoreError> {
        match scope {
            ReadScope::Watched => Ok(self.inner.mirror.snapshot_all()),
            ReadScope::All => {
                let points: Vec<Arc<Point>> = self.inner.registry.catalog().cloned().collect();
                self.inner.aggregator.read_all(&points).await
            }
        }
    }

    /// Open a watched point, then return the snapshots of every watched
    /// point.
    pub async fn command(&self, web_id: &WebId) -> Result<Vec<PointSnapshot>, CoreError> {
        self.inner
            .dispatcher
            .execute(Command::Open {
                web_id: web_id.clone(),
            })
            .await?;
        Ok(self.inner.mirror.snapshot_all())
    }

    /// Snapshot of a single watched point.
    pub fn point(&self, web_id: &WebId) -> Result<PointSnapshot, CoreError> {
        self.inner.mirror.get(web_id)
    }

    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    pub fn mirror(&self) -> &Mirror {
        &self.inner.mirror
    }
}
