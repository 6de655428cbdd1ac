//! Optimistic local mutations with all-or-nothing rollback.
//!
//! A mutation is applied to the local row set synchronously, marked pending,
//! and reconciled when the remote call resolves: on success the server value
//! is authoritative, on failure the affected entity is restored exactly as
//! it was, at its original position.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, warn};
use tracker_api::error::ApiError;

/// Rows managed by a [`MutationController`] expose a stable key.
pub trait Keyed {
    type Key: Clone + Eq + Hash + fmt::Debug;

    fn key(&self) -> Self::Key;
}

/// Resolution of one optimistic mutation. Callers must branch: a rollback
/// carries the user-visible error.
#[must_use]
#[derive(Debug)]
pub enum MutationOutcome<R> {
    Committed(R),
    RolledBack(ApiError),
}

impl<R> MutationOutcome<R> {
    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Committed(_))
    }

    pub fn into_result(self) -> Result<R, ApiError> {
        match self {
            Self::Committed(value) => Ok(value),
            Self::RolledBack(err) => Err(err),
        }
    }

    /// The message to surface when the mutation was rolled back.
    pub fn error_message(&self) -> Option<String> {
        match self {
            Self::Committed(_) => None,
            Self::RolledBack(err) => Some(err.user_message()),
        }
    }
}

/// Client-only record of an in-flight mutation: the prior state of the
/// affected entity (position and value, or absence) and a status tag. It
/// exists from the moment of optimistic application until the remote result
/// is known.
#[derive(Debug)]
struct PendingMutation<T: Keyed> {
    key: T::Key,
    prior: Option<(usize, T)>,
    status: MutationStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MutationStatus {
    InFlight,
    Committed,
    Failed,
}

struct LocalState<T: Keyed> {
    rows: Vec<T>,
    pending: HashSet<T::Key>,
}

/// Controller over one locally-held collection. At most one mutation per key
/// is optimistic at a time; a second mutation on the same key waits for the
/// first to resolve before capturing its own snapshot, so captures never
/// nest. Mutations on different keys are fully independent.
pub struct MutationController<T: Keyed + Clone> {
    state: Mutex<LocalState<T>>,
    gates: Mutex<HashMap<T::Key, Arc<Mutex<()>>>>,
}

impl<T: Keyed + Clone> Default for MutationController<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Keyed + Clone> MutationController<T> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(LocalState {
                rows: Vec::new(),
                pending: HashSet::new(),
            }),
            gates: Mutex::new(HashMap::new()),
        }
    }

    /// Replaces the local rows wholesale, e.g. after a refresh from the
    /// backend. Pending markers are untouched; refreshes are expected to
    /// follow mutation resolution, not interleave with it.
    pub async fn replace_rows(&self, rows: Vec<T>) {
        self.state.lock().await.rows = rows;
    }

    /// Direct, non-optimistic edit of the local rows, for folding in a
    /// value the backend has already confirmed.
    pub async fn update_rows(&self, f: impl FnOnce(&mut Vec<T>)) {
        f(&mut self.state.lock().await.rows);
    }

    /// Snapshot of the current rows for rendering. Derived views are always
    /// recomputed from this; there is no mutated display cache.
    pub async fn rows(&self) -> Vec<T> {
        self.state.lock().await.rows.clone()
    }

    pub async fn get(&self, key: &T::Key) -> Option<T> {
        let state = self.state.lock().await;
        state.rows.iter().find(|row| &row.key() == key).cloned()
    }

    pub async fn is_pending(&self, key: &T::Key) -> bool {
        self.state.lock().await.pending.contains(key)
    }

    async fn gate(&self, key: &T::Key) -> Arc<Mutex<()>> {
        let mut gates = self.gates.lock().await;
        Arc::clone(gates.entry(key.clone()).or_default())
    }

    /// Drops this mutation's handle on its gate and removes the map entry
    /// when nothing else holds one, so the map does not accumulate an entry
    /// per key ever mutated. A waiter that already cloned the gate keeps the
    /// entry alive.
    async fn release_gate(&self, key: &T::Key, gate: Arc<Mutex<()>>) {
        let mut gates = self.gates.lock().await;
        drop(gate);
        if gates.get(key).is_some_and(|entry| Arc::strong_count(entry) == 1) {
            gates.remove(key);
        }
    }

    /// Applies `mutate` locally, issues `remote`, and reconciles.
    ///
    /// On success `reconcile` folds the authoritative server value into the
    /// rows (local state already reflects the optimistic guess; the hook is
    /// where a disagreeing server value replaces it). On failure the entity
    /// keyed by `key` is restored byte-for-byte to its prior state at its
    /// prior position, and the error is returned for display.
    pub async fn apply<R, Fut>(
        &self,
        key: T::Key,
        mutate: impl FnOnce(&mut Vec<T>),
        remote: Fut,
        reconcile: impl FnOnce(&mut Vec<T>, &R),
    ) -> MutationOutcome<R>
    where
        Fut: Future<Output = Result<R, ApiError>>,
    {
        self.apply_with(key, |rows| mutate(rows), move |()| remote, reconcile)
            .await
    }

    /// Like [`Self::apply`], except `mutate` runs under the per-key gate and
    /// hands a prepared value to the `remote` builder. A mutation that
    /// derives its target from the row's current state (a relative progress
    /// step, say) must compute it here, not before calling in, or a queued
    /// same-key mutation would compute from a stale base.
    pub async fn apply_with<P, R, Fut>(
        &self,
        key: T::Key,
        mutate: impl FnOnce(&mut Vec<T>) -> P,
        remote: impl FnOnce(P) -> Fut,
        reconcile: impl FnOnce(&mut Vec<T>, &R),
    ) -> MutationOutcome<R>
    where
        Fut: Future<Output = Result<R, ApiError>>,
    {
        // Serialize mutations per key: the snapshot must not be captured
        // while another mutation on the same entity is unresolved.
        let gate = self.gate(&key).await;
        let in_flight = gate.lock().await;

        let (mut mutation, prepared) = {
            let mut state = self.state.lock().await;
            let prior = state
                .rows
                .iter()
                .position(|row| row.key() == key)
                .map(|index| (index, state.rows[index].clone()));
            let prepared = mutate(&mut state.rows);
            state.pending.insert(key.clone());
            debug!(?key, "optimistic mutation applied");
            let mutation = PendingMutation {
                key,
                prior,
                status: MutationStatus::InFlight,
            };
            (mutation, prepared)
        };

        let outcome = match remote(prepared).await {
            Ok(value) => {
                mutation.status = MutationStatus::Committed;
                let mut state = self.state.lock().await;
                state.pending.remove(&mutation.key);
                reconcile(&mut state.rows, &value);
                debug!(key = ?mutation.key, status = ?mutation.status, "mutation resolved");
                MutationOutcome::Committed(value)
            }
            Err(err) => {
                mutation.status = MutationStatus::Failed;
                warn!(key = ?mutation.key, status = ?mutation.status, %err, "rolling back");
                let mut state = self.state.lock().await;
                state.pending.remove(&mutation.key);
                restore(&mut state.rows, &mutation.key, mutation.prior.take());
                MutationOutcome::RolledBack(err)
            }
        };

        drop(in_flight);
        self.release_gate(&mutation.key, gate).await;
        outcome
    }

    #[cfg(test)]
    async fn gate_count(&self) -> usize {
        self.gates.lock().await.len()
    }
}

/// Puts the entity back exactly as captured: removed rows reappear at their
/// original index, created rows vanish, edited rows regain their old value.
fn restore<T: Keyed>(rows: &mut Vec<T>, key: &T::Key, prior: Option<(usize, T)>) {
    rows.retain(|row| &row.key() != key);
    if let Some((index, row)) = prior {
        let index = index.min(rows.len());
        rows.insert(index, row);
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::oneshot;

    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Row {
        id: &'static str,
        value: u32,
    }

    impl Keyed for Row {
        type Key = &'static str;

        fn key(&self) -> Self::Key {
            self.id
        }
    }

    fn rejected() -> ApiError {
        ApiError::Validation("backend said no".into())
    }

    async fn controller(rows: Vec<Row>) -> MutationController<Row> {
        let controller = MutationController::new();
        controller.replace_rows(rows).await;
        controller
    }

    #[tokio::test]
    async fn committed_mutation_keeps_the_local_change() {
        let controller = controller(vec![Row { id: "a", value: 1 }]).await;

        let outcome = controller
            .apply(
                "a",
                |rows| rows[0].value = 2,
                async { Ok::<_, ApiError>(()) },
                |_, _| {},
            )
            .await;

        assert!(outcome.is_committed());
        assert_eq!(controller.rows().await, vec![Row { id: "a", value: 2 }]);
        assert!(!controller.is_pending(&"a").await);
    }

    #[tokio::test]
    async fn rolled_back_delete_restores_the_row_at_its_original_position() {
        let rows = vec![
            Row { id: "a", value: 1 },
            Row { id: "b", value: 2 },
            Row { id: "c", value: 3 },
        ];
        let controller = controller(rows.clone()).await;

        let outcome = controller
            .apply(
                "b",
                |rows| rows.retain(|row| row.id != "b"),
                async { Err::<(), _>(rejected()) },
                |_, _| {},
            )
            .await;

        assert!(!outcome.is_committed());
        assert!(outcome.error_message().is_some());
        // Indistinguishable from a state where the mutation never happened.
        assert_eq!(controller.rows().await, rows);
        assert!(!controller.is_pending(&"b").await);
    }

    #[tokio::test]
    async fn rolled_back_creation_removes_the_provisional_row() {
        let controller = controller(vec![Row { id: "a", value: 1 }]).await;

        let outcome = controller
            .apply(
                "new",
                |rows| rows.push(Row { id: "new", value: 0 }),
                async { Err::<(), _>(rejected()) },
                |_, _| {},
            )
            .await;

        assert!(!outcome.is_committed());
        assert_eq!(controller.rows().await, vec![Row { id: "a", value: 1 }]);
    }

    #[tokio::test]
    async fn remote_value_is_authoritative_on_commit() {
        let controller = controller(vec![Row { id: "a", value: 1 }]).await;

        let outcome = controller
            .apply(
                "a",
                |rows| rows[0].value = 50,
                async { Ok::<_, ApiError>(70u32) },
                |rows, server_value| rows[0].value = *server_value,
            )
            .await;

        assert!(outcome.is_committed());
        assert_eq!(controller.rows().await, vec![Row { id: "a", value: 70 }]);
    }

    #[tokio::test]
    async fn same_key_mutations_resolve_in_submit_order() {
        let controller = Arc::new(controller(vec![Row { id: "a", value: 1 }]).await);
        let (release_first, first_released) = oneshot::channel::<()>();

        let first = controller.apply(
            "a",
            |rows| rows[0].value = 2,
            async move {
                first_released.await.unwrap();
                Ok::<_, ApiError>(())
            },
            |_, _| {},
        );

        // Submitted while the first is still pending: must wait for its
        // resolution before capturing a snapshot, then fail and roll back to
        // the first mutation's committed state, not the original.
        let second = controller.apply(
            "a",
            |rows| rows[0].value = 3,
            async { Err::<(), _>(rejected()) },
            |_, _| {},
        );

        let (first_outcome, second_outcome, _) =
            tokio::join!(first, second, async { release_first.send(()).unwrap() });

        assert!(first_outcome.is_committed());
        assert!(!second_outcome.is_committed());
        assert_eq!(controller.rows().await, vec![Row { id: "a", value: 2 }]);
    }

    #[tokio::test]
    async fn queued_mutation_computes_from_the_resolved_value() {
        let controller = Arc::new(controller(vec![Row { id: "a", value: 50 }]).await);
        let (release_first, first_released) = oneshot::channel::<()>();

        // Each step derives its target from the row it finds under the gate,
        // so the second step sees the first step's committed value as its
        // base and neither increment is lost.
        let first = controller.apply_with(
            "a",
            |rows| {
                rows[0].value += 10;
                rows[0].value
            },
            move |target| async move {
                first_released.await.unwrap();
                Ok::<_, ApiError>(target)
            },
            |_, _| {},
        );

        let second = controller.apply_with(
            "a",
            |rows| {
                rows[0].value += 10;
                rows[0].value
            },
            |target| async move { Ok::<_, ApiError>(target) },
            |_, _| {},
        );

        let (first_outcome, second_outcome, _) =
            tokio::join!(first, second, async { release_first.send(()).unwrap() });

        assert_eq!(first_outcome.into_result().unwrap(), 60);
        assert_eq!(second_outcome.into_result().unwrap(), 70);
        assert_eq!(controller.rows().await, vec![Row { id: "a", value: 70 }]);
    }

    #[tokio::test]
    async fn resolved_mutations_leave_no_gate_behind() {
        let controller = controller(vec![Row { id: "a", value: 1 }]).await;

        let committed = controller
            .apply(
                "a",
                |rows| rows[0].value = 2,
                async { Ok::<_, ApiError>(()) },
                |_, _| {},
            )
            .await;
        assert!(committed.is_committed());

        let rolled_back = controller
            .apply(
                "b",
                |rows| rows.push(Row { id: "b", value: 0 }),
                async { Err::<(), _>(rejected()) },
                |_, _| {},
            )
            .await;
        assert!(!rolled_back.is_committed());

        assert_eq!(controller.gate_count().await, 0);
    }

    #[tokio::test]
    async fn different_keys_roll_back_independently() {
        let controller = Arc::new(controller(vec![
            Row { id: "a", value: 1 },
            Row { id: "b", value: 10 },
        ]).await);
        let (release_a, a_released) = oneshot::channel::<()>();

        // `a` fails slowly; `b` commits while `a` is still in flight. The
        // rollback of `a` must not clobber `b`'s committed change.
        let failing_a = controller.apply(
            "a",
            |rows| rows[0].value = 2,
            async move {
                a_released.await.unwrap();
                Err::<(), _>(rejected())
            },
            |_, _| {},
        );

        let committing_b = controller.apply(
            "b",
            |rows| {
                let row = rows.iter_mut().find(|row| row.id == "b").unwrap();
                row.value = 20;
            },
            async { Ok::<_, ApiError>(()) },
            |_, _| {},
        );

        let (a_outcome, b_outcome, _) = tokio::join!(failing_a, committing_b, async {
            release_a.send(()).unwrap()
        });

        assert!(!a_outcome.is_committed());
        assert!(b_outcome.is_committed());
        assert_eq!(
            controller.rows().await,
            vec![Row { id: "a", value: 1 }, Row { id: "b", value: 20 }]
        );
    }
}
