//! Data loader: a loading engine bound to its own observable state.

use std::future::Future;

use pager_model::{Content, EmptyState, LoadError, LoadMoreState, LoadingState, Paged};
use tokio::sync::watch;
use tracing::debug;

use crate::config::LoaderConfig;
use crate::engine::LoadingEngine;
use crate::load_more::LoadMoreCoordinator;
use crate::store::{StateCell, StateStore};

type QueryBuilder<Q, E> = dyn Fn() -> Result<Q, E> + Send + Sync;

/// Loads a model for the current query and publishes every state change.
///
/// The query is rebuilt from `query` on each load, so it can read whatever
/// input the caller keeps (filters, a search box, a selected id). Building the
/// query may fail; that failure is shown as an `Error` state without calling
/// the loader.
pub struct DataLoader<Q, M, E> {
    query: Box<QueryBuilder<Q, E>>,
    engine: LoadingEngine<Q, M, E>,
    more: LoadMoreCoordinator<M, E>,
    state: StateCell<M, LoadError<E>>,
}

impl<Q, M, E> DataLoader<Q, M, E>
where
    Q: Clone + PartialEq + Send + Sync + 'static,
    M: Content + Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// Create a loader from a query builder and a loader function.
    pub fn new<B, F, Fut>(query: B, loader: F) -> Self
    where
        B: Fn() -> Result<Q, E> + Send + Sync + 'static,
        F: Fn(Q) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<M, E>> + Send + 'static,
    {
        Self {
            query: Box::new(query),
            engine: LoadingEngine::new(loader),
            more: LoadMoreCoordinator::default(),
            state: StateCell::default(),
        }
    }

    /// Apply the parts of `config` that concern full loads.
    #[must_use]
    pub fn with_config(self, config: &LoaderConfig) -> Self {
        self.with_empty_state(config.empty.clone())
    }

    /// Describe empty results with `empty`.
    #[must_use]
    pub fn with_empty_state(mut self, empty: EmptyState) -> Self {
        self.engine = self.engine.with_empty_state(empty);
        self
    }

    /// Decide the load-more state of freshly loaded models.
    #[must_use]
    pub fn with_load_more_resolver(
        mut self,
        resolver: impl Fn(&M) -> LoadMoreState + Send + Sync + 'static,
    ) -> Self {
        self.engine = self.engine.with_load_more_resolver(resolver);
        self
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> LoadingState<M, LoadError<E>> {
        self.state.current()
    }

    /// Watch state changes.
    pub fn subscribe(&self) -> watch::Receiver<LoadingState<M, LoadError<E>>> {
        self.state.subscribe()
    }

    /// The observable state cell.
    pub const fn state_cell(&self) -> &StateCell<M, LoadError<E>> {
        &self.state
    }

    /// Load the model for the current query.
    ///
    /// Reuses the loaded model when the query has not changed, unless
    /// `force_reload` is set. Failures leave an `Error` state wrapping the
    /// state before the load; cancellation leaves the state before the load.
    pub async fn load(&self, force_reload: bool) -> Result<M, LoadError<E>> {
        match (self.query)() {
            Ok(query) => self.load_query(query, force_reload).await,
            Err(err) => {
                debug!("query could not be built");
                let err = LoadError::Failed(err);
                self.show_failure(err.clone());
                Err(err)
            }
        }
    }

    /// Load again, ignoring the cached query.
    pub async fn reload(&self) -> Result<M, LoadError<E>> {
        self.load(true).await
    }

    /// Cancel the running load or load-more. Returns false when nothing runs.
    pub fn cancel(&self) -> bool {
        self.state.with_current(|state| match state.cancel_handle() {
            Some(handle) => {
                handle.cancel();
                true
            }
            None => false,
        })
    }

    /// Forget the cached query so the next load fetches again.
    pub fn invalidate_cache(&self) {
        self.engine.invalidate_cache();
    }

    pub(crate) async fn load_query(&self, query: Q, force_reload: bool) -> Result<M, LoadError<E>> {
        let finished = self.engine.run(query, force_reload, &self.state).await;
        if let Err(err) = &finished.result
            && finished.applied
            && !err.is_cancelled()
        {
            self.show_failure(err.clone());
        }
        finished.result
    }

    fn show_failure(&self, err: LoadError<E>) {
        let previous = self.state.current();
        self.state.set(LoadingState::error(err, previous));
    }
}

impl<Q, M, E> DataLoader<Q, M, E>
where
    Q: Clone + PartialEq + Send + Sync + 'static,
    M: Paged<Error = E> + Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// Create a loader for a paged model.
    ///
    /// Load-more is `Ready` after a load exactly when the model has another
    /// page.
    pub fn paged<B, F, Fut>(query: B, loader: F) -> Self
    where
        B: Fn() -> Result<Q, E> + Send + Sync + 'static,
        F: Fn(Q) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<M, E>> + Send + 'static,
    {
        Self::new(query, loader)
            .with_load_more_resolver(|model| LoadMoreState::from_has_more(model.has_more()))
    }

    /// Fetch the next page of the loaded model.
    ///
    /// A failed page keeps the pages already shown, sets load-more back to
    /// `Ready` and invalidates the query cache.
    pub async fn load_more(&self) -> Result<(), LoadError<E>> {
        self.more
            .load_more(&self.state, || self.engine.invalidate_cache())
            .await
    }
}
