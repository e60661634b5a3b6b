//! Spawned operations with a shared outcome.

use std::future::Future;

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use pager_model::{CancelHandle, LoadError};
use tokio::task::JoinError;

/// Outcome of a spawned operation; every clone resolves to the same result.
pub(crate) type Outcome<M, E> = Shared<BoxFuture<'static, Result<M, LoadError<E>>>>;

/// A spawned operation that callers can join or cancel.
pub(crate) struct InFlight<M, E> {
    pub(crate) handle: CancelHandle,
    pub(crate) outcome: Outcome<M, E>,
}

impl<M, E> InFlight<M, E>
where
    M: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// Spawn `operation` on the current runtime.
    ///
    /// Cancelling the handle aborts the task; joiners then resolve to
    /// [`LoadError::Cancelled`].
    pub(crate) fn spawn(operation: impl Future<Output = Result<M, E>> + Send + 'static) -> Self {
        let task = tokio::spawn(operation);
        let handle = CancelHandle::from_abort(task.abort_handle());
        let outcome = async move {
            match task.await {
                Ok(result) => result.map_err(LoadError::Failed),
                Err(err) => Err(join_error(&err)),
            }
        }
        .boxed()
        .shared();
        Self { handle, outcome }
    }
}

fn join_error<E>(err: &JoinError) -> LoadError<E> {
    if err.is_cancelled() {
        LoadError::Cancelled
    } else {
        LoadError::contract(format!("loader task panicked: {err}"))
    }
}
