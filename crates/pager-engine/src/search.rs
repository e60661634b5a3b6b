//! Debounced search on top of a [`DataLoader`].

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use pager_model::{Content, LoadError, LoadingState};
use tracing::debug;

use crate::clock::{Clock, TokioClock};
use crate::config::LoaderConfig;
use crate::debounce::Debouncer;
use crate::loader::DataLoader;

/// Turns search text into a query after the input settles.
///
/// Each [`search`](Self::search) call supersedes the previous one; only the
/// last text typed within the debounce delay reaches the loader. Text that
/// maps to the query already loaded is served from the loader's cache.
pub struct SearchLoader<Q, M, E, C = TokioClock> {
    text: Arc<Mutex<String>>,
    loader: DataLoader<Q, M, E>,
    debouncer: Debouncer<C>,
}

impl<Q, M, E> SearchLoader<Q, M, E>
where
    Q: Clone + PartialEq + Send + Sync + 'static,
    M: Content + Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// Create a search loader on the tokio timer.
    ///
    /// `query` builds the loader query from the search text and may reject it.
    pub fn new<B, F, Fut>(delay: Duration, query: B, loader: F) -> Self
    where
        B: Fn(&str) -> Result<Q, E> + Send + Sync + 'static,
        F: Fn(Q) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<M, E>> + Send + 'static,
    {
        Self::with_clock(delay, TokioClock, query, loader)
    }

    /// Create a search loader from a config (debounce delay and empty state).
    pub fn from_config<B, F, Fut>(config: &LoaderConfig, query: B, loader: F) -> Self
    where
        B: Fn(&str) -> Result<Q, E> + Send + Sync + 'static,
        F: Fn(Q) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<M, E>> + Send + 'static,
    {
        let mut search = Self::new(config.debounce_delay(), query, loader);
        search.loader = search.loader.with_config(config);
        search
    }
}

impl<Q, M, E, C> SearchLoader<Q, M, E, C>
where
    Q: Clone + PartialEq + Send + Sync + 'static,
    M: Content + Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
    C: Clock,
{
    /// Create a search loader on a custom clock.
    pub fn with_clock<B, F, Fut>(delay: Duration, clock: C, query: B, loader: F) -> Self
    where
        B: Fn(&str) -> Result<Q, E> + Send + Sync + 'static,
        F: Fn(Q) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<M, E>> + Send + 'static,
    {
        let text = Arc::new(Mutex::new(String::new()));
        let current = Arc::clone(&text);
        let build = move || {
            let text = current.lock().unwrap_or_else(PoisonError::into_inner);
            query(&text)
        };
        Self {
            text,
            loader: DataLoader::new(build, loader),
            debouncer: Debouncer::with_clock(delay, clock),
        }
    }

    /// Search for `text` once typing pauses.
    ///
    /// Resolves to [`LoadError::Cancelled`] when a newer search supersedes
    /// this one before its load finishes.
    pub async fn search(&self, text: impl Into<String>) -> Result<M, LoadError<E>> {
        let text = text.into();
        debug!(text = %text, "search requested");
        self.debouncer
            .call(|| async move {
                *self.text.lock().unwrap_or_else(PoisonError::into_inner) = text;
                self.loader.load(false).await
            })
            .await?
    }

    /// Reload the current search after the debounce delay.
    pub async fn refresh(&self) -> Result<M, LoadError<E>> {
        self.debouncer.call(|| self.loader.reload()).await?
    }

    /// Drop any search still waiting for the input to settle.
    pub fn cancel_pending(&self) {
        self.debouncer.cancel();
    }

    /// The text of the last search that reached the loader.
    pub fn text(&self) -> String {
        self.text
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> LoadingState<M, LoadError<E>> {
        self.loader.state()
    }

    /// The underlying data loader, for subscribing, cancelling and load-more.
    pub const fn loader(&self) -> &DataLoader<Q, M, E> {
        &self.loader
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const NAMES: [&str; 5] = ["ada", "alan", "barbara", "grace", "linus"];

    fn names(calls: Arc<AtomicUsize>) -> SearchLoader<String, Vec<&'static str>, String> {
        SearchLoader::new(
            Duration::from_millis(500),
            |text: &str| {
                if text.len() > 20 {
                    Err("search text too long".to_string())
                } else {
                    Ok(text.to_lowercase())
                }
            },
            move |prefix: String| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    tokio::time::sleep(Duration::from_millis(30)).await;
                    Ok(NAMES
                        .into_iter()
                        .filter(|name| name.starts_with(prefix.as_str()))
                        .collect())
                }
            },
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_typing_burst_loads_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let search = Arc::new(names(Arc::clone(&calls)));

        let spawn_search = |text: &'static str| {
            let search = Arc::clone(&search);
            tokio::spawn(async move { search.search(text).await })
        };
        let a = spawn_search("a");
        tokio::time::sleep(Duration::from_millis(200)).await;
        let al = spawn_search("al");
        tokio::time::sleep(Duration::from_millis(400)).await;
        let ala = spawn_search("ALA");

        assert_eq!(a.await.unwrap(), Err(LoadError::Cancelled));
        assert_eq!(al.await.unwrap(), Err(LoadError::Cancelled));
        assert_eq!(ala.await.unwrap(), Ok(vec!["alan"]));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(search.text(), "ALA");
    }

    #[tokio::test(start_paused = true)]
    async fn test_search_superseded_while_loading_still_settles() {
        let calls = Arc::new(AtomicUsize::new(0));
        let search = Arc::new(names(Arc::clone(&calls)));
        let first = {
            let search = Arc::clone(&search);
            tokio::spawn(async move { search.search("al").await })
        };
        // the first search is fetching when the second keystroke arrives
        tokio::time::sleep(Duration::from_millis(510)).await;
        assert!(search.state().is_in_progress());
        let second = {
            let search = Arc::clone(&search);
            tokio::spawn(async move { search.search("al").await })
        };

        assert_eq!(first.await.unwrap(), Err(LoadError::Cancelled));
        assert!(search.state().is_idle());
        assert_eq!(second.await.unwrap(), Ok(vec!["alan"]));
        assert!(search.state().is_loaded());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_query_is_served_from_cache() {
        let calls = Arc::new(AtomicUsize::new(0));
        let search = names(Arc::clone(&calls));
        search.search("gr").await.unwrap();
        search.search("GR").await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        search.refresh().await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_match_is_empty() {
        let search = names(Arc::new(AtomicUsize::new(0)));
        assert_eq!(search.search("zed").await, Ok(Vec::new()));
        assert!(matches!(search.state(), LoadingState::Empty(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_text_shows_error_without_loading() {
        let calls = Arc::new(AtomicUsize::new(0));
        let search = names(Arc::clone(&calls));
        let err = search.search("a".repeat(21)).await.unwrap_err();
        assert_eq!(err.failure(), Some(&"search text too long".to_string()));
        assert!(search.state().is_error());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_pending_drops_waiting_search() {
        let calls = Arc::new(AtomicUsize::new(0));
        let search = Arc::new(names(Arc::clone(&calls)));
        let waiting = {
            let search = Arc::clone(&search);
            tokio::spawn(async move { search.search("ada").await })
        };
        tokio::time::sleep(Duration::from_millis(100)).await;
        search.cancel_pending();
        assert_eq!(waiting.await.unwrap(), Err(LoadError::Cancelled));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(search.state().is_idle());
    }
}
