// ── StateStore abstraction ──
//
// The four primitives the bridge consumes from the store. Implementations
// carry their own timeout semantics; a timed-out call is just an error.

use std::future::Future;

use futures_util::stream::BoxStream;

use crate::error::Error;
use crate::types::{Notification, PointState, PointValue, ScanResult};

/// Stream of change notifications for one point.
///
/// Ends when the store is shut down. Delivery is at-most-once per change.
pub type NotificationStream = BoxStream<'static, Notification>;

/// A push-based key/value store of named points.
pub trait StateStore: Send + Sync + 'static {
    /// Enumerate every object of the given type (e.g. `"state"`) with its metadata.
    fn scan_objects(
        &self,
        type_filter: &str,
    ) -> impl Future<Output = Result<ScanResult, Error>> + Send;

    /// Fetch a single point. Fails with [`Error::NotFound`] for unknown ids.
    fn get_point(&self, id: &str) -> impl Future<Output = Result<PointState, Error>> + Send;

    /// Write a value. Fails with [`Error::Rejected`] when the store refuses it.
    fn set_point(
        &self,
        id: &str,
        value: PointValue,
    ) -> impl Future<Output = Result<(), Error>> + Send;

    /// Register for change notifications of a point.
    ///
    /// A store that cannot push may open the stream with the point's current
    /// state, so nothing between a caller's fetch and the subscription is lost.
    fn subscribe(&self, id: &str) -> Result<NotificationStream, Error>;
}
