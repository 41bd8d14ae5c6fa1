// ── Read aggregation ──
//
// Fan-out reads straight from the store, joined all-or-nothing. Results
// are never written back to the mirror.

use std::sync::Arc;

use chrono::Utc;
use futures_util::{StreamExt, TryStreamExt, stream};

use opensesame_api::StateStore;

use crate::error::CoreError;
use crate::model::{Point, PointMeta, PointSnapshot};
use crate::store::Mirror;

/// Answers multi-point reads with parallel store lookups.
pub struct Aggregator<S> {
    store: Arc<S>,
    mirror: Arc<Mirror>,
    concurrency: usize,
}

impl<S: StateStore> Aggregator<S> {
    pub fn new(store: Arc<S>, mirror: Arc<Mirror>, concurrency: usize) -> Self {
        Self {
            store,
            mirror,
            concurrency: concurrency.max(1),
        }
    }

    /// Look up every point in parallel.
    ///
    /// The result has the input's length and order. The first failed
    /// lookup fails the whole call with [`CoreError::PartialReadFailure`]
    /// and the remaining lookups are abandoned.
    pub async fn read_all(&self, points: &[Arc<Point>]) -> Result<Vec<PointSnapshot>, CoreError> {
        let lookups: Vec<_> = points.iter().map(|point| self.lookup(point)).collect();
        stream::iter(lookups)
            .buffered(self.concurrency)
            .try_collect()
            .await
    }

    async fn lookup(&self, point: &Point) -> Result<PointSnapshot, CoreError> {
        let state = self
            .store
            .get_point(&point.external_id)
            .await
            .map_err(|cause| CoreError::PartialReadFailure {
                failed_id: point.external_id.clone(),
                cause,
            })?;

        let mut meta = point.meta.clone();
        meta.refresh(PointMeta::from(&state.meta));
        let pending = self.mirror.is_pending(&point.external_id);

        Ok(PointSnapshot::build(
            point,
            &meta,
            state.value,
            pending,
            Some(Utc::now()),
        ))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use opensesame_api::{MemoryStore, ObjectMeta, PointValue};
    use pretty_assertions::assert_eq;

    use crate::config::{DEFAULT_ROLES, PointEntry};
    use crate::registry::Registry;

    fn setup(ids: &[&str], concurrency: usize) -> (Arc<MemoryStore>, Arc<Registry>, Aggregator<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        for (n, id) in ids.iter().enumerate() {
            store.insert(
                *id,
                ObjectMeta {
                    name: None,
                    value_type: Some("number".into()),
                    role: Some("level.blind".into()),
                },
                Some(PointValue::from(i64::try_from(n).unwrap())),
            );
        }
        let entries: Vec<_> = ids.iter().map(|id| PointEntry::new(*id)).collect();
        let roles: Vec<String> = DEFAULT_ROLES.iter().map(|r| (*r).to_owned()).collect();
        let registry = Arc::new(Registry::build(&entries, None, &roles).unwrap());
        let mirror = Arc::new(Mirror::new(Arc::clone(&registry)));
        let aggregator = Aggregator::new(Arc::clone(&store), mirror, concurrency);
        (store, registry, aggregator)
    }

    fn points(registry: &Registry) -> Vec<Arc<Point>> {
        registry.watched().cloned().collect()
    }

    #[tokio::test]
    async fn returns_every_point_in_input_order() {
        let ids = ["zwave.0.c", "zwave.0.a", "zwave.0.d", "zwave.0.b"];
        let (_store, registry, aggregator) = setup(&ids, 2);

        let snaps = aggregator.read_all(&points(&registry)).await.unwrap();

        let got: Vec<_> = snaps.iter().map(|s| s.external_id.as_str()).collect();
        assert_eq!(got, ids.to_vec());
        assert_eq!(snaps[2].value, Some(PointValue::from(2_i64)));
        assert_eq!(snaps[2].value_type.as_deref(), Some("number"));
    }

    #[tokio::test]
    async fn one_failure_fails_everything() {
        let ids = ["zwave.0.a", "zwave.0.b", "zwave.0.c"];
        let (store, registry, aggregator) = setup(&ids, 16);
        store.fail_reads("zwave.0.b");

        let err = aggregator.read_all(&points(&registry)).await.unwrap_err();

        assert!(
            matches!(&err, CoreError::PartialReadFailure { failed_id, .. } if failed_id == "zwave.0.b"),
            "got: {err:?}"
        );
    }

    #[tokio::test]
    async fn deleted_point_fails_the_read() {
        let ids = ["zwave.0.a", "zwave.0.b"];
        let (store, registry, aggregator) = setup(&ids, 16);
        store.remove("zwave.0.a");

        let err = aggregator.read_all(&points(&registry)).await.unwrap_err();
        assert!(matches!(err, CoreError::PartialReadFailure { .. }));
    }

    #[tokio::test]
    async fn empty_input_is_empty_output() {
        let (_store, _registry, aggregator) = setup(&["zwave.0.a"], 16);
        assert!(aggregator.read_all(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn zero_concurrency_still_reads() {
        let ids = ["zwave.0.a", "zwave.0.b"];
        let (_store, registry, aggregator) = setup(&ids, 0);
        assert_eq!(aggregator.read_all(&points(&registry)).await.unwrap().len(), 2);
    }
}
