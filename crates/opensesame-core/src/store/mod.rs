// ── Bridge-side state storage ──

mod mirror;

pub use mirror::{Mirror, Update};
