// ── Point registry ──
//
// The set of points the bridge knows about, built once at startup from the
// configured list and the store's catalog scan. Immutable afterwards.

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use tracing::debug;

use opensesame_api::ScanResult;

use crate::config::PointEntry;
use crate::error::CoreError;
use crate::model::{Point, PointMeta, WebId};

/// Ordered, deduplicated collection of points with two views:
///
/// - **watched**: the configured points in configuration order, or the
///   catalog when nothing is configured. Mirrored and commandable.
/// - **catalog**: scanned points whose role is in the allow-set, sorted by
///   external id. Readable through a fan-out read.
#[derive(Debug)]
pub struct Registry {
    points: IndexMap<String, Arc<Point>>,
    by_web_id: HashMap<WebId, String>,
    watched: IndexSet<String>,
    catalog: IndexSet<String>,
}

impl Registry {
    /// Build the registry.
    ///
    /// Configured entries come first and win over scanned duplicates. Fails
    /// with [`CoreError::Config`] when an external id is empty, when two
    /// external ids derive the same web id, or when no point remains.
    pub fn build(
        configured: &[PointEntry],
        scan: Option<&ScanResult>,
        roles: &[String],
    ) -> Result<Self, CoreError> {
        let mut registry = Self {
            points: IndexMap::new(),
            by_web_id: HashMap::new(),
            watched: IndexSet::new(),
            catalog: IndexSet::new(),
        };

        for entry in configured {
            let meta = scan
                .and_then(|s| s.get(&entry.id))
                .map(PointMeta::from)
                .unwrap_or_default();
            if registry.insert(&entry.id, entry.name.clone(), meta)? {
                registry.watched.insert(entry.id.clone());
            } else {
                debug!(id = %entry.id, "duplicate configured point ignored");
            }
        }

        if let Some(scan) = scan {
            for (id, meta) in scan {
                if !is_adapter_instance_id(id) {
                    continue;
                }
                let Some(role) = meta.role.as_deref() else {
                    continue;
                };
                if !roles.iter().any(|r| r == role) {
                    continue;
                }
                registry.insert(id, None, PointMeta::from(meta))?;
                registry.catalog.insert(id.clone());
            }
        }

        if registry.watched.is_empty() {
            if registry.catalog.is_empty() {
                return Err(CoreError::config(
                    "no points configured and the store catalog yielded none",
                ));
            }
            registry.watched = registry.catalog.clone();
        }

        debug!(
            points = registry.points.len(),
            watched = registry.watched.len(),
            catalog = registry.catalog.len(),
            "registry built"
        );
        Ok(registry)
    }

    /// Register a point unless its external id is known. Returns `true`
    /// when the point was new.
    fn insert(
        &mut self,
        external_id: &str,
        name: Option<String>,
        meta: PointMeta,
    ) -> Result<bool, CoreError> {
        if external_id.trim().is_empty() {
            return Err(CoreError::config("point with an empty external id"));
        }
        if self.points.contains_key(external_id) {
            return Ok(false);
        }

        let point = Point::new(external_id.to_owned(), name, meta);
        if let Some(existing) = self.by_web_id.get(&point.web_id) {
            return Err(CoreError::config(format!(
                "points {existing} and {external_id} both map to web id {}",
                point.web_id
            )));
        }

        self.by_web_id
            .insert(point.web_id.clone(), external_id.to_owned());
        self.points.insert(external_id.to_owned(), Arc::new(point));
        Ok(true)
    }

    // ── Lookups ──────────────────────────────────────────────────────

    /// Look up any registered point by its web id.
    pub fn resolve(&self, web_id: &WebId) -> Option<&Arc<Point>> {
        self.by_web_id
            .get(web_id)
            .and_then(|external_id| self.points.get(external_id))
    }

    /// Look up any registered point by its external id.
    pub fn get(&self, external_id: &str) -> Option<&Arc<Point>> {
        self.points.get(external_id)
    }

    pub fn is_watched(&self, external_id: &str) -> bool {
        self.watched.contains(external_id)
    }

    /// Watched points, in configuration order.
    pub fn watched(&self) -> impl Iterator<Item = &Arc<Point>> + '_ {
        self.watched.iter().filter_map(|id| self.points.get(id))
    }

    /// Catalog points, sorted by external id.
    pub fn catalog(&self) -> impl Iterator<Item = &Arc<Point>> + '_ {
        self.catalog.iter().filter_map(|id| self.points.get(id))
    }

    pub fn watched_len(&self) -> usize {
        self.watched.len()
    }

    pub fn catalog_len(&self) -> usize {
        self.catalog.len()
    }

    /// Number of distinct points across both views.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// `true` for ids below an adapter instance, e.g. `hm-rpc.1.…` or
/// `zwave2.0.…`, as opposed to `system.…` or `enum.…` objects.
fn is_adapter_instance_id(id: &str) -> bool {
    let Some((adapter, rest)) = id.split_once('.') else {
        return false;
    };
    let instance = rest.split('.').next().unwrap_or_default();

    !adapter.is_empty()
        && adapter
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        && !instance.is_empty()
        && instance.chars().all(|c| c.is_ascii_digit())
}
