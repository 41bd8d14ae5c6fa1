// ── Command dispatch ──
//
// Write-through of commands to the store with at most one command in
// flight per point. The mirror is updated only after the store accepts
// the write.

use std::sync::Arc;

use tracing::{info, warn};

use opensesame_api::{PointValue, StateStore};

use crate::error::CoreError;
use crate::model::{PointSnapshot, WebId};
use crate::store::Mirror;

/// A mutation request against a watched point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Drive the point to `true` (open the door, switch on the light).
    Open { web_id: WebId },
}

impl Command {
    pub fn web_id(&self) -> &WebId {
        match self {
            Self::Open { web_id } => web_id,
        }
    }

    /// Value written to the store.
    fn target_value(&self) -> PointValue {
        match self {
            Self::Open { .. } => PointValue::Bool(true),
        }
    }
}

/// Routes commands to the store and reconciles the mirror.
pub struct Dispatcher<S> {
    store: Arc<S>,
    mirror: Arc<Mirror>,
}

impl<S: StateStore> Dispatcher<S> {
    pub fn new(store: Arc<S>, mirror: Arc<Mirror>) -> Self {
        Self { store, mirror }
    }

    /// Execute a command and return the point's snapshot afterwards.
    ///
    /// Fails with [`CoreError::PointNotFound`] for points that are not
    /// watched, [`CoreError::CommandInFlight`] while an earlier command for
    /// the same point awaits the store (no write is issued), and
    /// [`CoreError::WriteRejected`] when the store refuses the write (the
    /// mirror keeps its previous value).
    pub async fn execute(&self, command: Command) -> Result<PointSnapshot, CoreError> {
        let web_id = command.web_id();
        let point = self
            .mirror
            .resolve(web_id)
            .ok_or_else(|| CoreError::PointNotFound {
                web_id: web_id.to_string(),
            })?;

        let guard = PendingGuard::acquire(&self.mirror, &point.external_id).ok_or_else(|| {
            CoreError::CommandInFlight {
                web_id: web_id.to_string(),
            }
        })?;

        let value = command.target_value();
        info!(id = %point.external_id, %value, "writing command");

        match self.store.set_point(&point.external_id, value.clone()).await {
            Ok(()) => {
                guard.succeed(value);
                self.mirror.get(web_id)
            }
            Err(cause) => {
                drop(guard);
                warn!(id = %point.external_id, error = %cause, "command write failed");
                Err(CoreError::WriteRejected {
                    external_id: point.external_id.clone(),
                    cause,
                })
            }
        }
    }

    /// Shorthand for [`Command::Open`].
    pub async fn open(&self, web_id: &WebId) -> Result<PointSnapshot, CoreError> {
        self.execute(Command::Open {
            web_id: web_id.clone(),
        })
        .await
    }
}

// ── Pending guard ───────────────────────────────────────────────────

/// Holds a point's pending flag for the duration of a command.
///
/// Dropping the guard always clears the flag, so an abandoned request
/// (client disconnect cancels the handler future) cannot leave the point
/// pending forever.
struct PendingGuard<'a> {
    mirror: &'a Mirror,
    external_id: &'a str,
    value: Option<PointValue>,
}

impl<'a> PendingGuard<'a> {
    fn acquire(mirror: &'a Mirror, external_id: &'a str) -> Option<Self> {
        mirror.try_begin_command(external_id).then(|| Self {
            mirror,
            external_id,
            value: None,
        })
    }

    /// Record the acknowledged value; applied when the guard drops.
    fn succeed(mut self, value: PointValue) {
        self.value = Some(value);
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.mirror.finish_command(self.external_id, self.value.take());
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::time::Duration;

    use opensesame_api::{MemoryStore, ObjectMeta};

    use crate::config::{DEFAULT_ROLES, PointEntry};
    use crate::registry::Registry;
    use crate::store::Update;

    const DOOR: &str = "hm-rpc.1.ABC123.1.STATE";

    fn setup() -> (Arc<MemoryStore>, Arc<Mirror>, Dispatcher<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        store.insert(
            DOOR,
            ObjectMeta {
                name: None,
                value_type: Some("boolean".into()),
                role: Some("switch".into()),
            },
            Some(false.into()),
        );
        let roles: Vec<String> = DEFAULT_ROLES.iter().map(|r| (*r).to_owned()).collect();
        let registry = Registry::build(&[PointEntry::new(DOOR)], None, &roles).unwrap();
        let mirror = Arc::new(Mirror::new(Arc::new(registry)));
        mirror.apply(DOOR, Update::Acknowledged(Some(false.into())), None);
        let dispatcher = Dispatcher::new(Arc::clone(&store), Arc::clone(&mirror));
        (store, mirror, dispatcher)
    }

    fn door() -> WebId {
        WebId::from("hm-rpc_1_ABC123_1_STATE")
    }

    #[tokio::test]
    async fn open_writes_true_and_updates_mirror() {
        let (store, mirror, dispatcher) = setup();

        let snap = dispatcher.open(&door()).await.unwrap();

        assert_eq!(snap.value, Some(PointValue::Bool(true)));
        assert!(!snap.pending);
        assert_eq!(store.writes(), vec![(DOOR.to_owned(), PointValue::Bool(true))]);
        assert_eq!(mirror.get(&door()).unwrap().value, Some(PointValue::Bool(true)));
    }

    #[tokio::test]
    async fn rejected_write_leaves_mirror_unchanged() {
        let (store, mirror, dispatcher) = setup();
        store.reject_writes(DOOR, "device unreachable");

        let err = dispatcher.open(&door()).await.unwrap_err();

        assert!(
            matches!(&err, CoreError::WriteRejected { external_id, .. } if external_id == DOOR),
            "got: {err:?}"
        );
        let snap = mirror.get(&door()).unwrap();
        assert_eq!(snap.value, Some(PointValue::Bool(false)));
        assert!(!snap.pending);
    }

    #[tokio::test]
    async fn unknown_point_is_not_found() {
        let (store, _mirror, dispatcher) = setup();

        let err = dispatcher.open(&WebId::from("nope")).await.unwrap_err();

        assert!(matches!(err, CoreError::PointNotFound { .. }));
        assert!(store.writes().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn second_open_while_pending_is_refused() {
        let (store, mirror, dispatcher) = setup();
        let dispatcher = Arc::new(dispatcher);
        store.pause_writes();

        let first = tokio::spawn({
            let dispatcher = Arc::clone(&dispatcher);
            async move { dispatcher.open(&door()).await }
        });

        let mut rx = mirror.subscribe();
        tokio::time::timeout(
            Duration::from_secs(5),
            rx.wait_for(|_| mirror.is_pending(DOOR)),
        )
        .await
        .unwrap()
        .unwrap();

        let err = dispatcher.open(&door()).await.unwrap_err();
        assert!(matches!(err, CoreError::CommandInFlight { .. }), "got: {err:?}");

        store.resume_writes();
        let snap = first.await.unwrap().unwrap();
        assert_eq!(snap.value, Some(PointValue::Bool(true)));
        assert!(!mirror.is_pending(DOOR));
        // The refused command never reached the store.
        assert_eq!(store.write_count(DOOR), 1);
    }

    #[tokio::test]
    async fn cancelled_command_releases_pending() {
        let (store, mirror, dispatcher) = setup();
        store.pause_writes();

        let abandoned = tokio::time::timeout(Duration::from_millis(50), dispatcher.open(&door())).await;
        assert!(abandoned.is_err());

        assert!(!mirror.is_pending(DOOR));
        assert_eq!(mirror.get(&door()).unwrap().value, Some(PointValue::Bool(false)));

        store.resume_writes();
        dispatcher.open(&door()).await.unwrap();
    }
}
