//! Immutable page views.

use std::fmt;
use std::sync::Arc;

use futures_util::future::BoxFuture;

/// Future returned by a [`Continuation`].
pub type PageFuture<T, E> = BoxFuture<'static, Result<Paginated<T, E>, E>>;

/// Models that can be empty.
///
/// Engines use this to decide between `Empty` and `Loaded`.
pub trait Content {
    /// Check if the model carries no results.
    fn is_empty(&self) -> bool;
}

impl<T> Content for Vec<T> {
    fn is_empty(&self) -> bool {
        Vec::is_empty(self)
    }
}

impl<T> Content for Option<T> {
    fn is_empty(&self) -> bool {
        self.is_none()
    }
}

/// Models that can fetch their own next page.
///
/// This is the capability bound for load-more: only models implementing it
/// can be driven by a load-more coordinator.
pub trait Paged: Content + Sized {
    /// Failure type of the next-page fetch.
    type Error;

    /// Check if another page can be fetched.
    fn has_more(&self) -> bool;

    /// Start fetching the next page, if there is one.
    fn fetch_next(&self) -> Option<BoxFuture<'static, Result<Self, Self::Error>>>;
}

/// Closure that fetches the next page and returns a fresh view over
/// everything accumulated so far.
pub struct Continuation<T, E> {
    next: Arc<dyn Fn() -> PageFuture<T, E> + Send + Sync>,
}

impl<T, E> Clone for Continuation<T, E> {
    fn clone(&self) -> Self {
        Self {
            next: Arc::clone(&self.next),
        }
    }
}

impl<T, E> Continuation<T, E> {
    /// Wrap a next-page closure.
    pub fn new(next: impl Fn() -> PageFuture<T, E> + Send + Sync + 'static) -> Self {
        Self {
            next: Arc::new(next),
        }
    }

    /// Start fetching the next page.
    pub fn fetch(&self) -> PageFuture<T, E> {
        (self.next)()
    }
}

impl<T, E> fmt::Debug for Continuation<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Continuation(..)")
    }
}

/// Ordered items plus an optional continuation.
///
/// A view is produced fresh on every cache mutation and never changes
/// afterwards. `has_more` is true exactly when a continuation is attached.
pub struct Paginated<T, E> {
    items: Vec<T>,
    continuation: Option<Continuation<T, E>>,
}

impl<T, E> Paginated<T, E> {
    /// Create a view.
    pub const fn new(items: Vec<T>, continuation: Option<Continuation<T, E>>) -> Self {
        Self {
            items,
            continuation,
        }
    }

    /// Create a view with no further pages.
    pub const fn complete(items: Vec<T>) -> Self {
        Self::new(items, None)
    }

    /// An empty view with no continuation.
    pub const fn empty() -> Self {
        Self::new(Vec::new(), None)
    }

    /// The accumulated items.
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Consume the view, keeping the items.
    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    /// Number of accumulated items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the view has no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Check if another page can be fetched.
    pub const fn has_more(&self) -> bool {
        self.continuation.is_some()
    }

    /// The attached continuation.
    pub const fn continuation(&self) -> Option<&Continuation<T, E>> {
        self.continuation.as_ref()
    }

    /// Start fetching the next page, if there is one.
    pub fn next_page(&self) -> Option<PageFuture<T, E>> {
        self.continuation.as_ref().map(Continuation::fetch)
    }
}

impl<T, E> Content for Paginated<T, E> {
    fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T, E> Paged for Paginated<T, E> {
    type Error = E;

    fn has_more(&self) -> bool {
        self.continuation.is_some()
    }

    fn fetch_next(&self) -> Option<PageFuture<T, E>> {
        self.next_page()
    }
}

impl<T: Clone, E> Clone for Paginated<T, E> {
    fn clone(&self) -> Self {
        Self {
            items: self.items.clone(),
            continuation: self.continuation.clone(),
        }
    }
}

impl<T, E> Default for Paginated<T, E> {
    fn default() -> Self {
        Self::empty()
    }
}

/// Views compare by items and by whether more pages exist; continuation
/// closures themselves are not comparable.
impl<T: PartialEq, E> PartialEq for Paginated<T, E> {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items && self.has_more() == other.has_more()
    }
}

impl<T: fmt::Debug, E> fmt::Debug for Paginated<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Paginated")
            .field("items", &self.items)
            .field("has_more", &self.has_more())
            .finish()
    }
}
