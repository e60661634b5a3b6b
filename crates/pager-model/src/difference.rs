//! Local edits to a cached collection.

use std::hash::Hash;

/// An element with a stable identity.
pub trait Identifiable {
    /// Identity type; must be cheap to clone and hashable.
    type Id: Clone + Eq + Hash + Send + Sync + 'static;

    /// This element's identity.
    fn id(&self) -> Self::Id;
}

/// A batch of insertions, deletions and updates applied to a cached
/// collection without a remote round-trip.
///
/// Caches apply deletions first, then updates by identity, then append
/// insertions. An update only takes effect for an identity that is already
/// cached; deleting an unknown identity is a no-op.
#[derive(Debug, Clone, PartialEq)]
pub struct Difference<T: Identifiable> {
    /// Elements appended to the collection.
    pub insertions: Vec<T>,
    /// Identities removed from the collection.
    pub deletions: Vec<T::Id>,
    /// Elements replacing the cached element with the same identity.
    pub updates: Vec<T>,
}

impl<T: Identifiable> Default for Difference<T> {
    fn default() -> Self {
        Self::none()
    }
}

impl<T: Identifiable> Difference<T> {
    /// A difference that changes nothing.
    pub const fn none() -> Self {
        Self {
            insertions: Vec::new(),
            deletions: Vec::new(),
            updates: Vec::new(),
        }
    }

    /// Add an insertion.
    #[must_use]
    pub fn insert(mut self, element: T) -> Self {
        self.insertions.push(element);
        self
    }

    /// Add a deletion by identity.
    #[must_use]
    pub fn delete(mut self, id: T::Id) -> Self {
        self.deletions.push(id);
        self
    }

    /// Add an update.
    #[must_use]
    pub fn update(mut self, element: T) -> Self {
        self.updates.push(element);
        self
    }

    /// Check if applying this difference would change nothing.
    pub fn is_empty(&self) -> bool {
        self.insertions.is_empty() && self.deletions.is_empty() && self.updates.is_empty()
    }

    /// Total number of operations in the batch.
    pub fn len(&self) -> usize {
        self.insertions.len() + self.deletions.len() + self.updates.len()
    }
}
