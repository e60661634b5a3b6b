//! Cursor-based pagination.

use std::future::Future;
use std::sync::Arc;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use pager_model::{Continuation, Difference, Identifiable, Paginated};
use tracing::debug;

use crate::broadcast::Subscription;
use crate::session::PagedSession;

/// One page returned by a cursor loader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CursorPage<T, C> {
    /// Elements of this page.
    pub items: Vec<T>,
    /// Cursor for the next page; `None` on the last page.
    pub next_cursor: Option<C>,
}

impl<T, C> CursorPage<T, C> {
    /// Create a page.
    pub const fn new(items: Vec<T>, next_cursor: Option<C>) -> Self {
        Self { items, next_cursor }
    }

    /// Create the last page.
    pub const fn last(items: Vec<T>) -> Self {
        Self::new(items, None)
    }
}

type CursorLoader<Q, T, C, E> =
    dyn Fn(Q, Option<C>) -> BoxFuture<'static, Result<CursorPage<T, C>, E>> + Send + Sync;

struct Inner<Q, T: Identifiable, C, E> {
    loader: Box<CursorLoader<Q, T, C, E>>,
    session: PagedSession<Q, T, C, E>,
}

/// Paginates a remote source that hands out opaque cursors.
///
/// The cursor type is never inspected, only threaded back into the loader.
/// Cloning is cheap; clones share one cache.
pub struct CursorPaginator<Q, T: Identifiable, C, E> {
    inner: Arc<Inner<Q, T, C, E>>,
}

impl<Q, T: Identifiable, C, E> Clone for CursorPaginator<Q, T, C, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<Q, T, C, E> CursorPaginator<Q, T, C, E>
where
    Q: Clone + PartialEq + Send + Sync + 'static,
    T: Identifiable + Clone + Send + Sync + 'static,
    C: Clone + Send + Sync + 'static,
    E: Send + 'static,
{
    /// Create a paginator over `loader(query, cursor)`.
    ///
    /// The first page is requested with `cursor == None`.
    pub fn new<F, Fut>(loader: F) -> Self
    where
        F: Fn(Q, Option<C>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<CursorPage<T, C>, E>> + Send + 'static,
    {
        Self {
            inner: Arc::new(Inner {
                loader: Box::new(move |query, cursor| loader(query, cursor).boxed()),
                session: PagedSession::new(),
            }),
        }
    }

    /// Fetch the first page for `query`, replacing whatever was cached.
    pub async fn load(&self, query: Q) -> Result<Paginated<T, E>, E> {
        let page = (self.inner.loader)(query.clone(), None).await?;
        debug!(
            count = page.items.len(),
            has_more = page.next_cursor.is_some(),
            "first page loaded"
        );
        let this = self.clone();
        Ok(self
            .inner
            .session
            .replace(query, page.items, page.next_cursor, move |key, cursor| {
                Some(this.continuation(key.clone(), cursor.clone()))
            })
            .await)
    }

    /// Apply a local difference computed from the current contents.
    ///
    /// Returns an empty view with no continuation when nothing has been
    /// loaded yet. Otherwise the new view is broadcast to subscribers.
    pub async fn update(&self, difference: impl FnOnce(&[T]) -> Difference<T>) -> Paginated<T, E> {
        let this = self.clone();
        self.inner
            .session
            .update(difference, move |key, cursor| {
                Some(this.continuation(key.clone(), cursor.clone()))
            })
            .await
    }

    /// Look up a cached element by identity.
    pub async fn cached_element(&self, id: &T::Id) -> Option<T> {
        self.inner.session.cached_element(id).await
    }

    /// Subscribe to views produced by [`update`](Self::update).
    ///
    /// Loads and continuations are not replayed on this stream. A view with
    /// more pages holds a handle to this paginator, so views waiting in the
    /// subscription or kept by the receiver keep the paginator alive.
    pub fn subscribe(&self) -> Subscription<Paginated<T, E>> {
        self.inner.session.subscribe()
    }

    fn continuation(&self, query: Q, cursor: C) -> Continuation<T, E> {
        let this = self.clone();
        Continuation::new(move || {
            let this = this.clone();
            let (query, cursor) = (query.clone(), cursor.clone());
            async move { this.next_page(query, cursor).await }.boxed()
        })
    }

    async fn next_page(&self, query: Q, cursor: C) -> Result<Paginated<T, E>, E> {
        let page = (self.inner.loader)(query.clone(), Some(cursor)).await?;
        debug!(
            count = page.items.len(),
            has_more = page.next_cursor.is_some(),
            "next page loaded"
        );
        let this = self.clone();
        Ok(self
            .inner
            .session
            .store(query, page.items, page.next_cursor, move |key, cursor| {
                Some(this.continuation(key.clone(), cursor.clone()))
            })
            .await)
    }
}
