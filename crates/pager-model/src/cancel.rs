//! Cancellation handles.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::task::AbortHandle;

struct Inner {
    cancelled: AtomicBool,
    action: Box<dyn Fn() + Send + Sync>,
}

/// Opaque token wrapping the cancel action of one running operation.
///
/// Two handles are equal only when they were cloned from the same
/// [`CancelHandle::new`] call, so a handle stored in a state value can be
/// compared against the handle of the operation that is finishing.
///
/// Cancelling is idempotent: the wrapped action runs at most once.
#[derive(Clone)]
pub struct CancelHandle {
    inner: Arc<Inner>,
}

impl CancelHandle {
    /// Wrap an arbitrary cancel action.
    pub fn new(action: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            inner: Arc::new(Inner {
                cancelled: AtomicBool::new(false),
                action: Box::new(action),
            }),
        }
    }

    /// Handle that aborts a spawned tokio task.
    ///
    /// The task observes the abort at its next suspension point.
    pub fn from_abort(handle: AbortHandle) -> Self {
        Self::new(move || handle.abort())
    }

    /// Request cancellation of the underlying operation.
    pub fn cancel(&self) {
        if !self.inner.cancelled.swap(true, Ordering::AcqRel) {
            (self.inner.action)();
        }
    }

    /// Whether [`cancel`](Self::cancel) has been called on this handle or a clone of it.
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }
}

impl PartialEq for CancelHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for CancelHandle {}

impl fmt::Debug for CancelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelHandle")
            .field("id", &Arc::as_ptr(&self.inner))
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
