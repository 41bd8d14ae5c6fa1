// ── Point domain types ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use opensesame_api::{ObjectMeta, PointValue};

use super::WebId;

// ── PointMeta ───────────────────────────────────────────────────────

/// Descriptive metadata of a point, resolved from the store's object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointMeta {
    pub name: Option<String>,
    pub value_type: Option<String>,
    pub role: Option<String>,
}

impl From<&ObjectMeta> for PointMeta {
    fn from(meta: &ObjectMeta) -> Self {
        Self {
            name: meta.display_name().map(str::to_owned),
            value_type: meta.value_type.clone(),
            role: meta.role.clone(),
        }
    }
}

impl PointMeta {
    /// Fill absent fields from `fresh`; present fields are replaced.
    pub(crate) fn refresh(&mut self, fresh: PointMeta) {
        if fresh.name.is_some() {
            self.name = fresh.name;
        }
        if fresh.value_type.is_some() {
            self.value_type = fresh.value_type;
        }
        if fresh.role.is_some() {
            self.role = fresh.role;
        }
    }
}

// ── Point ───────────────────────────────────────────────────────────

/// A registered point. Immutable once the registry is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Point {
    /// Stable key in the state store.
    pub external_id: String,
    pub web_id: WebId,
    /// Name from configuration; takes precedence over the store's name.
    pub configured_name: Option<String>,
    /// Metadata known at registry build time (from the scan, if any).
    pub meta: PointMeta,
}

impl Point {
    pub(crate) fn new(external_id: String, configured_name: Option<String>, meta: PointMeta) -> Self {
        Self {
            web_id: WebId::derive(&external_id),
            external_id,
            configured_name,
            meta,
        }
    }

    /// Name shown to clients: configured name, else the store's, else the id.
    pub fn display_name(&self, meta: &PointMeta) -> String {
        self.configured_name
            .as_deref()
            .or(meta.name.as_deref())
            .unwrap_or(&self.external_id)
            .to_owned()
    }
}

// ── PointSnapshot ───────────────────────────────────────────────────

/// Immutable copy of a point's state, taken at read time.
///
/// This is the JSON shape of every element returned by the HTTP surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointSnapshot {
    pub web_id: WebId,
    pub external_id: String,
    pub name: String,
    pub value: Option<PointValue>,
    #[serde(rename = "type")]
    pub value_type: Option<String>,
    pub role: Option<String>,
    pub pending: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl PointSnapshot {
    pub(crate) fn build(
        point: &Point,
        meta: &PointMeta,
        value: Option<PointValue>,
        pending: bool,
        updated_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            web_id: point.web_id.clone(),
            external_id: point.external_id.clone(),
            name: point.display_name(meta),
            value,
            value_type: meta.value_type.clone(),
            role: meta.role.clone(),
            pending,
            updated_at,
        }
    }
}
