//! Value types shared by the pager caches and engines.
//!
//! Nothing in this crate performs I/O or holds locks. The types here are the
//! vocabulary the rest of the workspace speaks:
//!
//! - [`LoadingState`] - the recursive state a presentation layer renders
//! - [`LoadMoreState`] - the pagination sub-state of a loaded model
//! - [`CancelHandle`] - an identity-compared token that aborts an operation
//! - [`Paginated`] / [`Continuation`] - an immutable page view with an optional next-page closure
//! - [`Difference`] - a batch of local insertions, deletions and updates
//! - [`LoadError`] - cancellation, typed loader failure, or contract violation

mod cancel;
mod difference;
mod error;
mod paginated;
mod state;

pub use cancel::CancelHandle;
pub use difference::{Difference, Identifiable};
pub use error::{Cancelled, LoadError};
pub use paginated::{Content, Continuation, PageFuture, Paged, Paginated};
pub use state::{EmptyState, LoadMoreState, LoadingState};
