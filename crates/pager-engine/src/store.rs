//! Where loading states live.
//!
//! The engine never owns the state it drives. It reads and writes through a
//! [`StateStore`], so the same engine can feed a view model, a test probe or
//! a [`StateCell`] that other tasks watch.

use std::sync::Arc;

use pager_model::LoadingState;
use tokio::sync::watch;
use tracing::trace;

/// Read/write access to one loading state.
pub trait StateStore<M, E>: Send + Sync {
    /// Snapshot of the current state.
    fn current(&self) -> LoadingState<M, E>;

    /// Replace the current state.
    fn set(&self, state: LoadingState<M, E>);
}

/// Observable state slot backed by a `tokio::sync::watch` channel.
///
/// Every [`set`](StateStore::set) is delivered to subscribers, which always
/// see the latest value (intermediate states may be skipped by slow readers).
pub struct StateCell<M, E> {
    tx: Arc<watch::Sender<LoadingState<M, E>>>,
}

impl<M, E> Clone for StateCell<M, E> {
    fn clone(&self) -> Self {
        Self {
            tx: Arc::clone(&self.tx),
        }
    }
}

impl<M, E> Default for StateCell<M, E> {
    fn default() -> Self {
        Self::new(LoadingState::Idle)
    }
}

impl<M, E> StateCell<M, E> {
    /// Create a cell holding `initial`.
    pub fn new(initial: LoadingState<M, E>) -> Self {
        let (tx, _) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    /// Watch the state. The receiver starts at the current value.
    pub fn subscribe(&self) -> watch::Receiver<LoadingState<M, E>> {
        self.tx.subscribe()
    }

    /// Run `f` against the current state without cloning it.
    pub fn with_current<R>(&self, f: impl FnOnce(&LoadingState<M, E>) -> R) -> R {
        f(&self.tx.borrow())
    }
}

impl<M, E> StateStore<M, E> for StateCell<M, E>
where
    M: Clone + Send + Sync,
    E: Clone + Send + Sync,
{
    fn current(&self) -> LoadingState<M, E> {
        self.tx.borrow().clone()
    }

    fn set(&self, state: LoadingState<M, E>) {
        trace!(state = state.name(), "state transition");
        self.tx.send_replace(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pager_model::{EmptyState, LoadMoreState};

    type Cell = StateCell<Vec<u8>, String>;

    #[test]
    fn test_starts_idle() {
        let cell = Cell::default();
        assert!(cell.current().is_idle());
    }

    #[test]
    fn test_set_is_visible_without_subscribers() {
        let cell = Cell::default();
        cell.set(LoadingState::loaded(vec![1], LoadMoreState::Unavailable));
        assert_eq!(cell.current().model(), Some(&vec![1]));
    }

    #[tokio::test]
    async fn test_subscribers_see_latest_state() {
        let cell = Cell::default();
        let mut rx = cell.subscribe();
        cell.set(LoadingState::Empty(EmptyState::default()));
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().name(), "empty");
    }

    #[test]
    fn test_clones_share_the_slot() {
        let cell = Cell::default();
        let other = cell.clone();
        other.set(LoadingState::loaded(vec![2], LoadMoreState::Ready));
        assert!(cell.with_current(LoadingState::is_loaded));
    }
}
