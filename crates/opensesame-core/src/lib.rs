//! State mirror and command bridge between a push-based state store and an
//! HTTP control surface.
//!
//! - **[`Registry`]**: the points the bridge knows, built once at startup
//!   from configuration and the store's catalog scan. Every point carries its
//!   store key (external id) and a derived web-safe [`WebId`].
//!
//! - **[`Mirror`]**: concurrent cache of each watched point's last known
//!   value and metadata (`DashMap` + `tokio::sync::watch` version channel).
//!   Reads never wait on the store.
//!
//! - **Synchronizer**: seeds the mirror with one fetch per point, then
//!   applies pushed [`Update`]s in receipt order, one task per point.
//!
//! - **[`Dispatcher`]**: writes [`Command`]s through to the store with at
//!   most one command in flight per point.
//!
//! - **[`Aggregator`]**: answers catalog-wide reads with bounded parallel
//!   lookups, joined all-or-nothing.
//!
//! - **[`Bridge`]** / **[`Gateway`]**: the startup context that wires the
//!   above together, and the cloneable facade the HTTP layer talks to.

pub mod bridge;
pub mod command;
pub mod config;
pub mod error;
pub mod gateway;
pub mod model;
pub mod query;
pub mod registry;
pub mod store;
pub mod sync;

// ── Primary re-exports ──────────────────────────────────────────────
pub use bridge::{Bridge, load_registry};
pub use command::{Command, Dispatcher};
pub use config::{BridgeConfig, DEFAULT_FANOUT_CONCURRENCY, DEFAULT_ROLES, PointEntry};
pub use error::CoreError;
pub use gateway::{Gateway, ReadScope};
pub use model::{Point, PointMeta, PointSnapshot, WebId};
pub use query::Aggregator;
pub use registry::Registry;
pub use store::{Mirror, Update};
pub use sync::{SyncPolicy, SyncReport};
