// ── Store wire types ──
//
// Values, metadata and notifications exchanged with the state store.
// These shapes are shared by every `StateStore` implementation.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Result of a catalog scan: external id -> object metadata, sorted by id.
pub type ScanResult = BTreeMap<String, ObjectMeta>;

// ── PointValue ──────────────────────────────────────────────────────

/// The value carried by a point.
///
/// Stores hold loosely typed values; the bridge only distinguishes the
/// three scalar shapes a control surface can render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PointValue {
    Bool(bool),
    Number(serde_json::Number),
    Text(String),
}

impl PointValue {
    /// Convert an arbitrary JSON value. `null` maps to `None`; arrays and
    /// objects are kept as their JSON text.
    pub fn from_json(value: serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Null => None,
            serde_json::Value::Bool(b) => Some(Self::Bool(b)),
            serde_json::Value::Number(n) => Some(Self::Number(n)),
            serde_json::Value::String(s) => Some(Self::Text(s)),
            other => Some(Self::Text(other.to_string())),
        }
    }
}

impl fmt::Display for PointValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<bool> for PointValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for PointValue {
    fn from(n: i64) -> Self {
        Self::Number(n.into())
    }
}

impl From<&str> for PointValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<String> for PointValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

// ── DisplayName ─────────────────────────────────────────────────────

/// Object names are either a plain string or a map of translations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DisplayName {
    Plain(String),
    Translated(BTreeMap<String, String>),
}

impl DisplayName {
    /// Resolve to a single string, preferring the English translation.
    pub fn resolve(&self) -> Option<&str> {
        match self {
            Self::Plain(s) => Some(s.as_str()),
            Self::Translated(map) => map
                .get("en")
                .or_else(|| map.values().next())
                .map(String::as_str),
        }
    }
}

impl From<&str> for DisplayName {
    fn from(s: &str) -> Self {
        Self::Plain(s.to_owned())
    }
}

// ── ObjectMeta ──────────────────────────────────────────────────────

/// Descriptive metadata of a state object (the `common` section).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMeta {
    #[serde(default)]
    pub name: Option<DisplayName>,

    /// Declared value type, e.g. `"boolean"`, `"number"`.
    #[serde(default, rename = "type")]
    pub value_type: Option<String>,

    /// Semantic role, e.g. `"switch"`, `"level.blind"`.
    #[serde(default)]
    pub role: Option<String>,
}

impl ObjectMeta {
    pub fn display_name(&self) -> Option<&str> {
        self.name.as_ref().and_then(DisplayName::resolve)
    }
}

// ── PointState ──────────────────────────────────────────────────────

/// A single point as returned by a `get`: current value plus metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct PointState {
    pub value: Option<PointValue>,
    /// `true` when the value was confirmed by the owning device/adapter.
    pub ack: bool,
    /// Store timestamp of the value, in milliseconds since the epoch.
    pub ts: Option<i64>,
    pub meta: ObjectMeta,
}

// ── Notification ────────────────────────────────────────────────────

/// A pushed change of a point's value.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub id: String,
    pub value: Option<PointValue>,
    /// `false` for a requested-but-unconfirmed value (a command in flight).
    pub ack: bool,
    pub ts: Option<i64>,
}
