//! Loading states.
//!
//! # Architecture
//!
//! [`LoadingState`] is a plain value. Engines compute the next value and write
//! it back through a store; nothing mutates a state in place. Two variants hold
//! a boxed copy of the state that was showing when the operation began, so a
//! view can keep rendering stale content during a refresh or behind an error.

use serde::{Deserialize, Serialize};

use crate::cancel::CancelHandle;

// =============================================================================
// EMPTY STATE
// =============================================================================

/// Label and icon shown when a load completes with no results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmptyState {
    /// Text shown in place of the result list.
    pub label: String,

    /// Optional icon name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl Default for EmptyState {
    fn default() -> Self {
        Self {
            label: "No results".to_string(),
            image: None,
        }
    }
}

impl EmptyState {
    /// Create an empty state with a label and no icon.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            image: None,
        }
    }

    /// Attach an icon name.
    #[must_use]
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }
}

// =============================================================================
// LOAD MORE STATE
// =============================================================================

/// Pagination sub-state of a loaded model.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadMoreState {
    /// The model has no further pages.
    #[default]
    Unavailable,
    /// A continuation is running.
    InProgress(CancelHandle),
    /// A continuation exists and may be started.
    Ready,
}

impl LoadMoreState {
    /// `Ready` when more pages exist, `Unavailable` otherwise.
    pub const fn from_has_more(has_more: bool) -> Self {
        if has_more {
            Self::Ready
        } else {
            Self::Unavailable
        }
    }

    /// Check if a continuation is running.
    pub const fn is_in_progress(&self) -> bool {
        matches!(self, Self::InProgress(_))
    }

    /// Check if a continuation may be started.
    pub const fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }
}

// =============================================================================
// LOADING STATE
// =============================================================================

/// Observable state of a data loader.
///
/// `M` is the loaded model, `E` the failure type stored in [`LoadingState::Error`].
#[derive(Debug, Clone, PartialEq)]
pub enum LoadingState<M, E> {
    /// No load attempted yet.
    Idle,

    /// The load completed without results.
    Empty(EmptyState),

    /// A fetch is running.
    InProgress {
        /// Cancels the running fetch.
        handle: CancelHandle,
        /// State that was active when the fetch started.
        previous: Box<Self>,
    },

    /// The load succeeded with a non-empty result.
    Loaded {
        /// The loaded model.
        model: M,
        /// Whether more pages can be fetched.
        load_more: LoadMoreState,
    },

    /// The load failed.
    Error {
        /// The failure returned by the loader.
        failure: E,
        /// State that was active when the failed fetch started.
        previous: Box<Self>,
    },
}

impl<M, E> Default for LoadingState<M, E> {
    fn default() -> Self {
        Self::Idle
    }
}

impl<M, E> LoadingState<M, E> {
    /// Create an in-progress state over a snapshot of the previous state.
    pub fn in_progress(handle: CancelHandle, previous: Self) -> Self {
        Self::InProgress {
            handle,
            previous: Box::new(previous),
        }
    }

    /// Create a loaded state.
    pub const fn loaded(model: M, load_more: LoadMoreState) -> Self {
        Self::Loaded { model, load_more }
    }

    /// Create an error state over a snapshot of the previous state.
    pub fn error(failure: E, previous: Self) -> Self {
        Self::Error {
            failure,
            previous: Box::new(previous),
        }
    }

    /// Variant name, for logs.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Empty(_) => "empty",
            Self::InProgress { .. } => "in_progress",
            Self::Loaded { .. } => "loaded",
            Self::Error { .. } => "error",
        }
    }

    /// Check if no load has been attempted.
    pub const fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    /// Check if a fetch is running.
    pub const fn is_in_progress(&self) -> bool {
        matches!(self, Self::InProgress { .. })
    }

    /// Check if a model is loaded.
    pub const fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded { .. })
    }

    /// Check if the last load failed.
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    /// The loaded model, if this state is `Loaded`.
    pub const fn model(&self) -> Option<&M> {
        match self {
            Self::Loaded { model, .. } => Some(model),
            _ => None,
        }
    }

    /// The pagination sub-state, if this state is `Loaded`.
    pub const fn load_more(&self) -> Option<&LoadMoreState> {
        match self {
            Self::Loaded { load_more, .. } => Some(load_more),
            _ => None,
        }
    }

    /// The failure, if this state is `Error`.
    pub const fn failure(&self) -> Option<&E> {
        match self {
            Self::Error { failure, .. } => Some(failure),
            _ => None,
        }
    }

    /// The snapshot carried by `InProgress` and `Error`.
    pub fn previous(&self) -> Option<&Self> {
        match self {
            Self::InProgress { previous, .. } | Self::Error { previous, .. } => Some(previous),
            _ => None,
        }
    }

    /// The handle that cancels the running operation.
    ///
    /// Covers both a running fetch and a running continuation.
    pub const fn cancel_handle(&self) -> Option<&CancelHandle> {
        match self {
            Self::InProgress { handle, .. }
            | Self::Loaded {
                load_more: LoadMoreState::InProgress(handle),
                ..
            } => Some(handle),
            _ => None,
        }
    }

    /// Nearest state a view can render content from.
    ///
    /// Returns `self` for `Loaded` and `Empty`, otherwise follows the
    /// previous-state snapshots until one is found.
    pub fn fallback(&self) -> Option<&Self> {
        match self {
            Self::Loaded { .. } | Self::Empty(_) => Some(self),
            Self::Idle => None,
            Self::InProgress { previous, .. } | Self::Error { previous, .. } => {
                previous.fallback()
            }
        }
    }
}
