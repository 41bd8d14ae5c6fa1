//! Async access to a push-based key/value state store.
//!
//! The bridge only ever needs four primitives from the store, captured by
//! the [`StateStore`] trait:
//!
//! - **scan**: enumerate every state object with its metadata, once at startup
//! - **get**: fetch a single point (value + metadata)
//! - **set**: write a value to a point
//! - **subscribe**: receive a stream of change notifications for a point
//!
//! Two implementations ship with the crate:
//!
//! - **[`RestStore`]** talks to an ioBroker instance through the `simple-api`
//!   adapter. Subscriptions are served by per-point polling with backoff.
//! - **[`MemoryStore`]** is a fully in-process store with fault injection
//!   hooks, used by the workspace's tests and for local demos.

pub mod error;
pub mod memory;
pub mod rest;
pub mod store;
pub mod transport;
pub mod types;

pub use error::Error;
pub use memory::MemoryStore;
pub use rest::{PollConfig, RestStore};
pub use store::{NotificationStream, StateStore};
pub use transport::{TlsMode, TransportConfig};
pub use types::{DisplayName, Notification, ObjectMeta, PointState, PointValue, ScanResult};
