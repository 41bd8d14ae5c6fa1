// ── Web-safe point identity ──
//
// External ids are dotted store paths (`hm-rpc.1.ABC123.1.STATE`). Browsers
// and query strings get a flattened form in which every path separator is
// an underscore.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Web-safe identifier of a point.
///
/// Derived from an external id with [`WebId::derive`], or taken verbatim
/// from a request with [`From<&str>`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WebId(String);

impl WebId {
    /// Replace every path separator (`.` and `/`) of `external_id` with `_`.
    ///
    /// Pure and deterministic. Not injective: `a.b` and `a_b` collide, which
    /// the registry rejects at build time.
    pub fn derive(external_id: &str) -> Self {
        Self(
            external_id
                .chars()
                .map(|c| if is_separator(c) { '_' } else { c })
                .collect(),
        )
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn is_separator(c: char) -> bool {
    matches!(c, '.' | '/')
}

impl fmt::Display for WebId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for WebId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for WebId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for WebId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_replaces_separators() {
        assert_eq!(
            WebId::derive("hm-rpc.1.ABC123.1.STATE").as_str(),
            "hm-rpc_1_ABC123_1_STATE"
        );
        assert_eq!(WebId::derive("mqtt.0/garage/door").as_str(), "mqtt_0_garage_door");
    }

    #[test]
    fn derive_is_deterministic() {
        let id = "zwave2.0.nodeID_12.doorLock.currentMode";
        assert_eq!(WebId::derive(id), WebId::derive(id));
    }

    #[test]
    fn derive_collides_on_existing_underscores() {
        assert_eq!(WebId::derive("a.0.b_c"), WebId::derive("a.0.b.c"));
    }

    #[test]
    fn serializes_as_plain_string() {
        let json = serde_json::to_string(&WebId::derive("a.0.b")).unwrap_or_default();
        assert_eq!(json, "\"a_0_b\"");
    }
}
