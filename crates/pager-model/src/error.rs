//! Error types for loading operations.

use thiserror::Error;

/// Outcome of a loading operation that did not produce a model.
///
/// Cancellation is kept apart from failures so callers can revert silently
/// instead of surfacing an error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum LoadError<E> {
    /// The operation was cancelled or superseded.
    #[error("operation was cancelled")]
    Cancelled,

    /// The loader returned a failure.
    #[error("{0}")]
    Failed(E),

    /// An internal contract was violated (for example a loader task panicked).
    #[error("internal contract violated: {message}")]
    Contract {
        /// Description of the violated contract.
        message: String,
    },
}

impl<E> LoadError<E> {
    /// Create a contract violation error.
    pub fn contract(message: impl Into<String>) -> Self {
        Self::Contract {
            message: message.into(),
        }
    }

    /// Check if this is a cancellation rather than a failure.
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Check if this is a contract violation.
    pub const fn is_contract_violation(&self) -> bool {
        matches!(self, Self::Contract { .. })
    }

    /// The loader failure, if any.
    pub const fn failure(&self) -> Option<&E> {
        match self {
            Self::Failed(err) => Some(err),
            _ => None,
        }
    }

    /// Map the loader failure type.
    pub fn map_failure<F>(self, f: impl FnOnce(E) -> F) -> LoadError<F> {
        match self {
            Self::Cancelled => LoadError::Cancelled,
            Self::Failed(err) => LoadError::Failed(f(err)),
            Self::Contract { message } => LoadError::Contract { message },
        }
    }
}

impl<E: std::fmt::Display> LoadError<E> {
    /// Get a user-friendly message for display in the UI.
    pub fn user_message(&self) -> String {
        match self {
            Self::Cancelled => "The request was cancelled.".to_string(),
            Self::Failed(err) => format!("Loading failed: {err}"),
            Self::Contract { .. } => {
                "Something went wrong while loading. Please try again.".to_string()
            }
        }
    }
}

/// A debounced call was superseded by a newer one before it ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("superseded by a newer call")]
pub struct Cancelled;

impl<E> From<Cancelled> for LoadError<E> {
    fn from(_: Cancelled) -> Self {
        Self::Cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err: LoadError<String> = LoadError::Failed("offline".to_string());
        assert_eq!(err.to_string(), "offline");
        assert_eq!(
            LoadError::<String>::contract("task panicked").to_string(),
            "internal contract violated: task panicked"
        );
        assert_eq!(LoadError::<String>::Cancelled.to_string(), "operation was cancelled");
    }

    #[test]
    fn test_classification() {
        let cancelled: LoadError<String> = Cancelled.into();
        assert!(cancelled.is_cancelled());
        assert!(cancelled.failure().is_none());

        let failed = LoadError::Failed(7u8).map_failure(u32::from);
        assert_eq!(failed.failure(), Some(&7u32));
        assert!(!failed.is_contract_violation());
    }

    #[test]
    fn test_user_messages() {
        let err: LoadError<String> = LoadError::Failed("offline".to_string());
        assert_eq!(err.user_message(), "Loading failed: offline");
        assert!(LoadError::<String>::contract("bug").user_message().contains("try again"));
    }
}
