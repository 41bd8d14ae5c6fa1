// ── Domain model ──

pub mod point;
pub mod web_id;

pub use point::{Point, PointMeta, PointSnapshot};
pub use web_id::WebId;
