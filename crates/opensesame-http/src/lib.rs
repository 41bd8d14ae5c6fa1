//! HTTP surface of the opensesame bridge.
//!
//! - `GET /get` returns the watched points from the mirror; `GET /get?all`
//!   reads the whole catalog from the store.
//! - `GET /open?id=<webId>` opens a watched point and returns the watched
//!   snapshots afterwards.
//! - `GET /health` is a liveness probe.
//!
//! Failures are JSON `{error, code}` bodies, see [`HttpError`].

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;

pub use error::{ErrorBody, HttpError, ServerError};
pub use router::create_router;
pub use server::{bind, serve, shutdown_signal};
