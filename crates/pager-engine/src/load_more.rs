//! Load-more coordination for paged models.

use std::sync::{Mutex, MutexGuard, PoisonError};

use pager_model::{CancelHandle, LoadError, LoadMoreState, LoadingState, Paged};
use tracing::{debug, warn};

use crate::store::StateStore;
use crate::task::{InFlight, Outcome};

enum Step<M, E> {
    Idle,
    Join(Outcome<M, E>),
    Start(InFlight<M, E>, M),
}

/// Fetches the next page of a loaded [`Paged`] model, one fetch at a time.
///
/// A load-more call while one is running joins it. Outcomes are written to
/// the store only while it still shows the running fetch as in progress, so a
/// fresh load that replaced the model is never overwritten by a stale page.
pub struct LoadMoreCoordinator<M, E> {
    in_flight: Mutex<Option<InFlight<M, E>>>,
}

impl<M, E> Default for LoadMoreCoordinator<M, E> {
    fn default() -> Self {
        Self {
            in_flight: Mutex::new(None),
        }
    }
}

impl<M, E> LoadMoreCoordinator<M, E>
where
    M: Paged<Error = E> + Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// Create an idle coordinator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the next page of the model in `store`.
    ///
    /// Does nothing unless the store is `Loaded` with load-more `Ready` (or a
    /// fetch is already running, which is joined). On success the store gets
    /// the extended model; on failure or cancellation it keeps the previous
    /// model with load-more `Ready` again. Failures also call
    /// `invalidate_cache` so the next full load refetches from scratch.
    ///
    /// Dropping the returned future before the page arrives cancels the fetch.
    pub async fn load_more<S>(
        &self,
        store: &S,
        invalidate_cache: impl FnOnce(),
    ) -> Result<(), LoadError<E>>
    where
        S: StateStore<M, LoadError<E>> + ?Sized,
    {
        let (handle, outcome) = match self.step(store)? {
            Step::Idle => return Ok(()),
            Step::Join(outcome) => {
                debug!("joining running load-more");
                return outcome.await.map(drop);
            }
            Step::Start(in_flight, model) => {
                let handle = in_flight.handle.clone();
                let outcome = in_flight.outcome.clone();
                *self.lock() = Some(in_flight);
                store.set(LoadingState::loaded(
                    model,
                    LoadMoreState::InProgress(handle.clone()),
                ));
                (handle, outcome)
            }
        };

        let guard = AbandonGuard {
            coordinator: self,
            store,
            handle: Some(handle.clone()),
        };
        let result = outcome.await;
        guard.disarm();
        self.finish(&handle);

        let Some(current) = showing::<M, E, S>(store, &handle) else {
            debug!("state moved on, discarding load-more outcome");
            return result.map(drop);
        };

        match result {
            Ok(extended) => {
                let next = LoadMoreState::from_has_more(extended.has_more());
                debug!(has_more = next.is_ready(), "load-more finished");
                store.set(LoadingState::loaded(extended, next));
                Ok(())
            }
            Err(err) => {
                debug!(cancelled = err.is_cancelled(), "load-more did not finish");
                store.set(LoadingState::loaded(current, LoadMoreState::Ready));
                if !err.is_cancelled() {
                    invalidate_cache();
                }
                Err(err)
            }
        }
    }

    fn step<S>(&self, store: &S) -> Result<Step<M, E>, LoadError<E>>
    where
        S: StateStore<M, LoadError<E>> + ?Sized,
    {
        let LoadingState::Loaded { model, load_more } = store.current() else {
            return Ok(Step::Idle);
        };
        match load_more {
            LoadMoreState::Unavailable => Ok(Step::Idle),
            LoadMoreState::InProgress(shown) => Ok(self
                .joinable(&shown)
                .map_or(Step::Idle, Step::Join)),
            LoadMoreState::Ready => {
                let Some(next) = model.fetch_next() else {
                    warn!("load-more ready but the model has no next page");
                    store.set(LoadingState::loaded(model, LoadMoreState::Unavailable));
                    return Err(LoadError::contract(
                        "load-more was ready but the model has no next page",
                    ));
                };
                Ok(Step::Start(InFlight::spawn(next), model))
            }
        }
    }

    fn joinable(&self, shown: &CancelHandle) -> Option<Outcome<M, E>> {
        self.lock()
            .as_ref()
            .filter(|in_flight| &in_flight.handle == shown)
            .map(|in_flight| in_flight.outcome.clone())
    }

    fn finish(&self, handle: &CancelHandle) {
        let mut in_flight = self.lock();
        if in_flight.as_ref().is_some_and(|f| &f.handle == handle) {
            *in_flight = None;
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<InFlight<M, E>>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// The loaded model, if `store` still shows `handle` as the running fetch.
fn showing<M, E, S>(store: &S, handle: &CancelHandle) -> Option<M>
where
    S: StateStore<M, LoadError<E>> + ?Sized,
{
    match store.current() {
        LoadingState::Loaded {
            model,
            load_more: LoadMoreState::InProgress(shown),
        } if &shown == handle => Some(model),
        _ => None,
    }
}

/// Cancels a next-page fetch and resets load-more to `Ready` when the future
/// driving it is dropped before the page arrives.
struct AbandonGuard<'a, M, E, S>
where
    M: Paged<Error = E> + Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
    S: StateStore<M, LoadError<E>> + ?Sized,
{
    coordinator: &'a LoadMoreCoordinator<M, E>,
    store: &'a S,
    handle: Option<CancelHandle>,
}

impl<M, E, S> AbandonGuard<'_, M, E, S>
where
    M: Paged<Error = E> + Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
    S: StateStore<M, LoadError<E>> + ?Sized,
{
    fn disarm(mut self) {
        self.handle = None;
    }
}

impl<M, E, S> Drop for AbandonGuard<'_, M, E, S>
where
    M: Paged<Error = E> + Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
    S: StateStore<M, LoadError<E>> + ?Sized,
{
    fn drop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        handle.cancel();
        self.coordinator.finish(&handle);
        if let Some(current) = showing::<M, E, S>(self.store, &handle) {
            debug!("load-more abandoned, resetting to ready");
            self.store.set(LoadingState::loaded(current, LoadMoreState::Ready));
        }
    }
}
