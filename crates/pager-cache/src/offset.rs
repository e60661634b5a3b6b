//! Offset-based pagination.

use std::future::Future;
use std::sync::Arc;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use pager_model::{Continuation, Difference, Identifiable, Paginated};
use tracing::debug;

use crate::broadcast::Subscription;
use crate::session::PagedSession;

/// One page returned by an offset loader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffsetPage<T> {
    /// Elements of this page.
    pub items: Vec<T>,
    /// Whether the source has elements past this page.
    pub has_more: bool,
}

impl<T> OffsetPage<T> {
    /// Create a page.
    pub const fn new(items: Vec<T>, has_more: bool) -> Self {
        Self { items, has_more }
    }
}

/// Accumulated offset and the last reported `has_more` flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OffsetPosition {
    /// Offset the next page is requested at.
    pub offset: usize,
    /// Whether another page exists.
    pub has_more: bool,
}

type OffsetLoader<Q, T, E> =
    dyn Fn(Q, usize) -> BoxFuture<'static, Result<OffsetPage<T>, E>> + Send + Sync;

struct Inner<Q, T: Identifiable, E> {
    loader: Box<OffsetLoader<Q, T, E>>,
    session: PagedSession<Q, T, OffsetPosition, E>,
}

/// Paginates a remote source addressed by numeric offset.
///
/// The first page is requested at offset 0. Each continuation requests at
/// the accumulated offset and advances it by the number of elements the
/// page returned. The `has_more` flag gates whether a continuation is
/// attached. Cloning is cheap; clones share one cache.
pub struct OffsetPaginator<Q, T: Identifiable, E> {
    inner: Arc<Inner<Q, T, E>>,
}

impl<Q, T: Identifiable, E> Clone for OffsetPaginator<Q, T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<Q, T, E> OffsetPaginator<Q, T, E>
where
    Q: Clone + PartialEq + Send + Sync + 'static,
    T: Identifiable + Clone + Send + Sync + 'static,
    E: Send + 'static,
{
    /// Create a paginator over `loader(query, offset)`.
    pub fn new<F, Fut>(loader: F) -> Self
    where
        F: Fn(Q, usize) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<OffsetPage<T>, E>> + Send + 'static,
    {
        Self {
            inner: Arc::new(Inner {
                loader: Box::new(move |query, offset| loader(query, offset).boxed()),
                session: PagedSession::new(),
            }),
        }
    }

    /// Fetch the first page for `query`, replacing whatever was cached.
    pub async fn load(&self, query: Q) -> Result<Paginated<T, E>, E> {
        let page = (self.inner.loader)(query.clone(), 0).await?;
        let position = OffsetPosition {
            offset: page.items.len(),
            has_more: page.has_more,
        };
        debug!(offset = position.offset, has_more = position.has_more, "first page loaded");
        let this = self.clone();
        Ok(self
            .inner
            .session
            .replace(query, page.items, Some(position), move |key, position| {
                this.continuation(key, position)
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
            .update(difference, move |key, position| {
                this.continuation(key, position)
            })
            .await
    }

    /// Look up a cached element by identity.
    pub async fn cached_element(&self, id: &T::Id) -> Option<T> {
        self.inner.session.cached_element(id).await
    }

    /// Subscribe to views produced by [`update`](Self::update).
    ///
    /// A view with more pages holds a handle to this paginator, so views
    /// waiting in the subscription or kept by the receiver keep it alive.
    pub fn subscribe(&self) -> Subscription<Paginated<T, E>> {
        self.inner.session.subscribe()
    }

    fn continuation(&self, query: &Q, position: &OffsetPosition) -> Option<Continuation<T, E>> {
        if !position.has_more {
            return None;
        }
        let this = self.clone();
        let query = query.clone();
        Some(Continuation::new(move || {
            let this = this.clone();
            let query = query.clone();
            async move { this.next_page(query).await }.boxed()
        }))
    }

    async fn next_page(&self, query: Q) -> Result<Paginated<T, E>, E> {
        let offset = self
            .inner
            .session
            .position_for(&query)
            .await
            .map_or(0, |position| position.offset);
        let page = (self.inner.loader)(query.clone(), offset).await?;
        let position = OffsetPosition {
            offset: offset + page.items.len(),
            has_more: page.has_more,
        };
        debug!(offset = position.offset, has_more = position.has_more, "next page loaded");
        let this = self.clone();
        Ok(self
            .inner
            .session
            .store(query, page.items, Some(position), move |key, position| {
                this.continuation(key, position)
            })
            .await)
    }
}
