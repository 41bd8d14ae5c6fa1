// ── Bridge configuration ──
//
// Runtime settings consumed by `Bridge::start`. Built by the binary from
// `opensesame-config`; constructed directly in tests.

use serde::{Deserialize, Serialize};

/// Roles a scanned object must carry to enter the catalog.
pub const DEFAULT_ROLES: [&str; 4] = ["switch", "level.blind", "indicator.switch", "indicator.level"];

/// Default bound on concurrent store lookups of a fan-out read.
pub const DEFAULT_FANOUT_CONCURRENCY: usize = 16;

/// One configured point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointEntry {
    /// External id in the store.
    pub id: String,
    /// Optional display name overriding the store's.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl PointEntry {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
        }
    }

    pub fn named(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: Some(name.into()),
        }
    }
}

/// Settings of one bridge instance.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Configured points, in display order.
    pub points: Vec<PointEntry>,

    /// Scan the store's catalog at startup.
    pub scan: bool,

    /// Role allow-set for catalog entries.
    pub roles: Vec<String>,

    /// Apply un-acknowledged pushes to the mirror.
    pub apply_unacknowledged: bool,

    /// Bound on concurrent store lookups of a fan-out read.
    pub fanout_concurrency: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            points: Vec::new(),
            scan: true,
            roles: DEFAULT_ROLES.iter().map(|r| (*r).to_owned()).collect(),
            apply_unacknowledged: true,
            fanout_concurrency: DEFAULT_FANOUT_CONCURRENCY,
        }
    }
}

impl BridgeConfig {
    pub fn with_points(mut self, points: Vec<PointEntry>) -> Self {
        self.points = points;
        self
    }
}
