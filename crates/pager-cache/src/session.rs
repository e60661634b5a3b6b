//! Storage shared by the cursor and offset paginators.

use pager_model::{Continuation, Difference, Identifiable, Paginated};
use tokio::sync::Mutex;

use crate::broadcast::{Broadcaster, Subscription};
use crate::page_cache::PageCache;

/// A [`PageCache`] behind an async lock plus the broadcaster for its changes.
///
/// `continuation` arguments build the next-page closure for a view from the
/// session key and the stored position; returning `None` marks the last page.
pub(crate) struct PagedSession<Q, T: Identifiable, P, E> {
    cache: Mutex<PageCache<Q, T, P>>,
    updates: Broadcaster<Paginated<T, E>>,
}

impl<Q, T, P, E> PagedSession<Q, T, P, E>
where
    Q: PartialEq,
    T: Identifiable + Clone,
{
    pub(crate) fn new() -> Self {
        Self {
            cache: Mutex::new(PageCache::new()),
            updates: Broadcaster::new(),
        }
    }

    pub(crate) async fn replace(
        &self,
        key: Q,
        elements: Vec<T>,
        position: Option<P>,
        continuation: impl FnOnce(&Q, &P) -> Option<Continuation<T, E>>,
    ) -> Paginated<T, E> {
        let mut cache = self.cache.lock().await;
        cache.replace(key, elements, position);
        view(&cache, continuation)
    }

    pub(crate) async fn store(
        &self,
        key: Q,
        elements: Vec<T>,
        position: Option<P>,
        continuation: impl FnOnce(&Q, &P) -> Option<Continuation<T, E>>,
    ) -> Paginated<T, E> {
        let mut cache = self.cache.lock().await;
        cache.store(key, elements, position);
        view(&cache, continuation)
    }

    /// Apply a locally computed difference and broadcast the new view.
    ///
    /// Without an established session this returns an empty view and
    /// broadcasts nothing.
    pub(crate) async fn update(
        &self,
        difference: impl FnOnce(&[T]) -> Difference<T>,
        continuation: impl FnOnce(&Q, &P) -> Option<Continuation<T, E>>,
    ) -> Paginated<T, E> {
        let page = {
            let mut cache = self.cache.lock().await;
            if cache.session_key().is_none() {
                return Paginated::empty();
            }
            let difference = difference(cache.elements());
            cache.apply(difference);
            view(&cache, continuation)
        };
        self.updates.send(page.clone());
        page
    }

    pub(crate) async fn cached_element(&self, id: &T::Id) -> Option<T> {
        self.cache.lock().await.get(id).cloned()
    }

    /// Stored position, if the current session was produced by `key`.
    pub(crate) async fn position_for(&self, key: &Q) -> Option<P>
    where
        P: Clone,
    {
        let cache = self.cache.lock().await;
        match cache.session_key() {
            Some(current) if current == key => cache.position().cloned(),
            _ => None,
        }
    }

    pub(crate) fn subscribe(&self) -> Subscription<Paginated<T, E>> {
        self.updates.subscribe()
    }
}

fn view<Q, T, P, E>(
    cache: &PageCache<Q, T, P>,
    continuation: impl FnOnce(&Q, &P) -> Option<Continuation<T, E>>,
) -> Paginated<T, E>
where
    T: Identifiable + Clone,
{
    let continuation = match (cache.session_key(), cache.position()) {
        (Some(key), Some(position)) => continuation(key, position),
        _ => None,
    };
    Paginated::new(cache.elements().to_vec(), continuation)
}
