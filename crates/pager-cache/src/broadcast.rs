//! Multi-subscriber change broadcast.

use std::pin::Pin;
use std::sync::{Mutex, PoisonError};
use std::task::{Context, Poll};

use futures_util::Stream;
use tokio::sync::mpsc;
use tracing::trace;

/// Publishes values to every live [`Subscription`].
///
/// Each subscription receives its own copy of every value sent after it was
/// created. Values sent while nobody is subscribed are dropped. Dropped
/// subscriptions are pruned on the next send.
pub struct Broadcaster<T> {
    subscribers: Mutex<Vec<mpsc::UnboundedSender<T>>>,
}

impl<T> Default for Broadcaster<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Broadcaster<T> {
    /// Create a broadcaster with no subscribers.
    pub const fn new() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Register a new subscriber.
    pub fn subscribe(&self) -> Subscription<T> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        Subscription { rx }
    }

    /// Number of subscriptions that are still alive.
    pub fn subscriber_count(&self) -> usize {
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        subscribers.retain(|tx| !tx.is_closed());
        subscribers.len()
    }
}

impl<T: Clone> Broadcaster<T> {
    /// Send a value to every live subscriber.
    ///
    /// Returns the number of subscribers that received it.
    pub fn send(&self, value: T) -> usize {
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        subscribers.retain(|tx| tx.send(value.clone()).is_ok());
        if subscribers.is_empty() {
            trace!("no subscribers for page update");
        } else {
            trace!(subscribers = subscribers.len(), "page update broadcast");
        }
        subscribers.len()
    }
}

/// Independent stream of values from a [`Broadcaster`].
///
/// Dropping the subscription unregisters it.
pub struct Subscription<T> {
    rx: mpsc::UnboundedReceiver<T>,
}

impl<T> Subscription<T> {
    /// Wait for the next value.
    ///
    /// Returns `None` once the broadcaster has been dropped and every
    /// buffered value has been received. Values that own the broadcaster
    /// (paginator views with more pages) delay this until they are dropped.
    pub async fn recv(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// Take the next buffered value without waiting.
    pub fn try_recv(&mut self) -> Option<T> {
        self.rx.try_recv().ok()
    }
}

impl<T> Stream for Subscription<T> {
    type Item = T;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        self.get_mut().rx.poll_recv(cx)
    }
}
