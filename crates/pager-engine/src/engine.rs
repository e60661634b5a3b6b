//! Loading engine: one query at a time, deduplicated, cancellable.
//!
//! [`LoadingEngine::load_model`] drives a [`StateStore`] through
//! `InProgress` and then `Loaded`/`Empty`, or back to the state it started
//! from when the load fails or is cancelled. Identical loads issued while one
//! is running join it instead of fetching again, and a load for the query that
//! is already loaded returns the loaded model without fetching.

use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use pager_model::{CancelHandle, Content, EmptyState, LoadError, LoadMoreState, LoadingState};
use tracing::{debug, trace};

use crate::store::StateStore;
use crate::task::{InFlight, Outcome};

type Loader<Q, M, E> = dyn Fn(Q) -> BoxFuture<'static, Result<M, E>> + Send + Sync;
type Resolver<M> = dyn Fn(&M) -> LoadMoreState + Send + Sync;

struct Tracking<Q, M, E> {
    cached_query: Option<Q>,
    running: Option<Running<Q, M, E>>,
}

struct Running<Q, M, E> {
    task: InFlight<M, E>,
    /// Cached query to put back if this load is cancelled.
    restore: Option<Q>,
}

/// What a load call does after inspecting the tracked query.
enum Start<M, E> {
    Hit(M),
    Join(Outcome<M, E>),
    Fetch {
        handle: CancelHandle,
        outcome: Outcome<M, E>,
        previous: LoadingState<M, LoadError<E>>,
    },
}

/// Result of a load plus whether this call wrote its outcome to the store.
pub(crate) struct Finished<M, E> {
    pub(crate) result: Result<M, LoadError<E>>,
    pub(crate) applied: bool,
}

/// Runs a loader for one query at a time and records the outcome in a store.
pub struct LoadingEngine<Q, M, E> {
    loader: Box<Loader<Q, M, E>>,
    resolver: Box<Resolver<M>>,
    empty: EmptyState,
    tracking: Mutex<Tracking<Q, M, E>>,
}

impl<Q, M, E> LoadingEngine<Q, M, E>
where
    Q: Clone + PartialEq + Send + Sync + 'static,
    M: Content + Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// Create an engine around `loader`.
    ///
    /// Loaded models report [`LoadMoreState::Unavailable`] until a resolver is
    /// set with [`with_load_more_resolver`](Self::with_load_more_resolver).
    pub fn new<F, Fut>(loader: F) -> Self
    where
        F: Fn(Q) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<M, E>> + Send + 'static,
    {
        Self {
            loader: Box::new(move |query| loader(query).boxed()),
            resolver: Box::new(|_| LoadMoreState::Unavailable),
            empty: EmptyState::default(),
            tracking: Mutex::new(Tracking {
                cached_query: None,
                running: None,
            }),
        }
    }

    /// Describe empty results with `empty`.
    #[must_use]
    pub fn with_empty_state(mut self, empty: EmptyState) -> Self {
        self.empty = empty;
        self
    }

    /// Decide the load-more state of freshly loaded models.
    #[must_use]
    pub fn with_load_more_resolver(
        mut self,
        resolver: impl Fn(&M) -> LoadMoreState + Send + Sync + 'static,
    ) -> Self {
        self.resolver = Box::new(resolver);
        self
    }

    /// The state shown for empty results.
    pub const fn empty_state(&self) -> &EmptyState {
        &self.empty
    }

    /// Forget the cached query so the next load fetches again.
    pub fn invalidate_cache(&self) {
        debug!("query cache invalidated");
        self.lock().cached_query = None;
    }

    /// Load the model for `query`, recording every transition in `store`.
    ///
    /// Unless `force_reload` is set, a load for the cached query returns the
    /// loaded model or joins the running fetch. Otherwise the store moves to
    /// `InProgress` (wrapping the state it had) and the loader is spawned.
    /// Cancellation and failures put the previous state back. A failure clears
    /// the cached query; a cancellation keeps the one the previous state was
    /// loaded for. An outcome that was superseded by a newer load is returned
    /// to its caller but not written to the store.
    ///
    /// Dropping the returned future before it resolves cancels the load.
    pub async fn load_model<S>(
        &self,
        query: Q,
        force_reload: bool,
        store: &S,
    ) -> Result<M, LoadError<E>>
    where
        S: StateStore<M, LoadError<E>> + ?Sized,
    {
        self.run(query, force_reload, store).await.result
    }

    pub(crate) async fn run<S>(&self, query: Q, force_reload: bool, store: &S) -> Finished<M, E>
    where
        S: StateStore<M, LoadError<E>> + ?Sized,
    {
        let (handle, outcome, previous) = match self.start(query, force_reload, store) {
            Start::Hit(model) => {
                trace!("cached query hit");
                return Finished {
                    result: Ok(model),
                    applied: false,
                };
            }
            Start::Join(outcome) => {
                debug!("joining running load");
                return Finished {
                    result: outcome.await,
                    applied: false,
                };
            }
            Start::Fetch {
                handle,
                outcome,
                previous,
            } => (handle, outcome, previous),
        };

        store.set(LoadingState::in_progress(handle.clone(), previous.clone()));
        let guard = AbandonGuard {
            engine: self,
            store,
            handle: handle.clone(),
            previous: Some(previous),
        };
        let result = outcome.await;
        let previous = guard.disarm();

        if !self.finish(&handle, result.as_ref().err()) {
            debug!("superseded load finished");
            return Finished {
                result,
                applied: false,
            };
        }

        match &result {
            Ok(model) if model.is_empty() => {
                debug!("load finished with no results");
                store.set(LoadingState::Empty(self.empty.clone()));
            }
            Ok(model) => {
                debug!("load finished");
                store.set(LoadingState::loaded(model.clone(), (self.resolver)(model)));
            }
            Err(err) => {
                debug!(cancelled = err.is_cancelled(), "load did not finish, restoring state");
                store.set(previous);
            }
        }
        Finished {
            result,
            applied: true,
        }
    }

    fn start<S>(&self, query: Q, force_reload: bool, store: &S) -> Start<M, E>
    where
        S: StateStore<M, LoadError<E>> + ?Sized,
    {
        let mut tracking = self.lock();
        let current = store.current();

        if !force_reload && tracking.cached_query.as_ref() == Some(&query) {
            if let LoadingState::Loaded { model, .. } = &current {
                return Start::Hit(model.clone());
            }
            if let (LoadingState::InProgress { .. }, Some(running)) = (&current, &tracking.running) {
                return Start::Join(running.task.outcome.clone());
            }
        }

        let restore = match &current {
            LoadingState::Loaded { .. } => tracking.cached_query.clone(),
            LoadingState::InProgress { .. } => {
                tracking.running.as_ref().and_then(|running| running.restore.clone())
            }
            _ => None,
        };

        // A superseded load never writes its outcome, so restoring its
        // InProgress state would leave the store stuck.
        let previous = match current {
            LoadingState::InProgress { previous, .. } => *previous,
            other => other,
        };

        let task = InFlight::spawn((self.loader)(query.clone()));
        let handle = task.handle.clone();
        let outcome = task.outcome.clone();
        tracking.cached_query = Some(query);
        tracking.running = Some(Running { task, restore });
        Start::Fetch {
            handle,
            outcome,
            previous,
        }
    }

    /// Stop tracking `handle`. Returns false when a newer load replaced it.
    fn finish(&self, handle: &CancelHandle, error: Option<&LoadError<E>>) -> bool {
        let mut tracking = self.lock();
        let Some(running) = tracking
            .running
            .take_if(|running| &running.task.handle == handle)
        else {
            return false;
        };
        match error {
            None => {}
            Some(err) if err.is_cancelled() => tracking.cached_query = running.restore,
            Some(_) => tracking.cached_query = None,
        }
        true
    }

    fn lock(&self) -> MutexGuard<'_, Tracking<Q, M, E>> {
        self.tracking.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Cancels a load and restores the previous state when the future driving it
/// is dropped before the outcome arrives.
struct AbandonGuard<'a, Q, M, E, S>
where
    Q: Clone + PartialEq + Send + Sync + 'static,
    M: Content + Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
    S: StateStore<M, LoadError<E>> + ?Sized,
{
    engine: &'a LoadingEngine<Q, M, E>,
    store: &'a S,
    handle: CancelHandle,
    previous: Option<LoadingState<M, LoadError<E>>>,
}

impl<Q, M, E, S> AbandonGuard<'_, Q, M, E, S>
where
    Q: Clone + PartialEq + Send + Sync + 'static,
    M: Content + Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
    S: StateStore<M, LoadError<E>> + ?Sized,
{
    fn disarm(mut self) -> LoadingState<M, LoadError<E>> {
        self.previous.take().unwrap_or_default()
    }
}

impl<Q, M, E, S> Drop for AbandonGuard<'_, Q, M, E, S>
where
    Q: Clone + PartialEq + Send + Sync + 'static,
    M: Content + Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
    S: StateStore<M, LoadError<E>> + ?Sized,
{
    fn drop(&mut self) {
        let Some(previous) = self.previous.take() else {
            return;
        };
        self.handle.cancel();
        if self.engine.finish(&self.handle, Some(&LoadError::Cancelled)) {
            debug!("load abandoned, restoring state");
            self.store.set(previous);
        }
    }
}
