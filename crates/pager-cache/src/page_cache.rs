//! Keyed ordered cache.
//!
//! Holds the elements accumulated for one session (the query that produced
//! them), an identity index over those elements, and the pagination position
//! (a cursor or an offset) returned with the last page.
//!
//! The index always reflects `elements` when a public method returns.

use std::collections::{HashMap, HashSet};

use pager_model::{Difference, Identifiable};
use tracing::debug;

/// How [`PageCache::store`] treated a batch of elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOutcome {
    /// The session key differed; previous contents were discarded.
    Replaced,
    /// The session key matched; elements were appended.
    Appended,
}

/// Counts of what [`PageCache::apply`] changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplySummary {
    /// Elements removed.
    pub deleted: usize,
    /// Elements replaced in place.
    pub updated: usize,
    /// Elements appended.
    pub inserted: usize,
}

/// Ordered elements with an identity index, keyed by session.
///
/// `Q` is the session key, `T` the element, `P` the pagination position.
#[derive(Debug, Clone)]
pub struct PageCache<Q, T: Identifiable, P> {
    elements: Vec<T>,
    index: HashMap<T::Id, usize>,
    session_key: Option<Q>,
    position: Option<P>,
}

impl<Q, T: Identifiable, P> Default for PageCache<Q, T, P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Q, T: Identifiable, P> PageCache<Q, T, P> {
    /// Create an empty cache with no session.
    pub fn new() -> Self {
        Self {
            elements: Vec::new(),
            index: HashMap::new(),
            session_key: None,
            position: None,
        }
    }

    /// The cached elements in order.
    pub fn elements(&self) -> &[T] {
        &self.elements
    }

    /// Number of cached elements.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Check if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// The query that produced the current contents.
    pub const fn session_key(&self) -> Option<&Q> {
        self.session_key.as_ref()
    }

    /// Position returned with the last stored page.
    pub const fn position(&self) -> Option<&P> {
        self.position.as_ref()
    }

    /// Look up an element by identity.
    pub fn get(&self, id: &T::Id) -> Option<&T> {
        self.index.get(id).map(|&position| &self.elements[position])
    }

    /// Check if an identity is cached.
    pub fn contains(&self, id: &T::Id) -> bool {
        self.index.contains_key(id)
    }

    /// Discard contents, session key and position.
    pub fn clear(&mut self) {
        self.elements.clear();
        self.index.clear();
        self.session_key = None;
        self.position = None;
    }

    /// Replace everything with a fresh session.
    pub fn replace(&mut self, key: Q, elements: Vec<T>, position: Option<P>) {
        self.elements.clear();
        self.index.clear();
        self.extend(elements);
        self.session_key = Some(key);
        self.position = position;
    }

    /// Apply a difference: deletions, then updates, then insertions.
    ///
    /// Deleting or updating an identity that is not cached changes nothing.
    /// Inserting an identity that is already cached replaces it in place.
    pub fn apply(&mut self, difference: Difference<T>) -> ApplySummary {
        let Difference {
            insertions,
            deletions,
            updates,
        } = difference;
        let mut summary = ApplySummary::default();

        let doomed: HashSet<T::Id> = deletions
            .into_iter()
            .filter(|id| self.index.contains_key(id))
            .collect();
        if !doomed.is_empty() {
            summary.deleted = doomed.len();
            self.elements.retain(|element| !doomed.contains(&element.id()));
            self.rebuild_index();
        }

        for element in updates {
            if let Some(&position) = self.index.get(&element.id()) {
                self.elements[position] = element;
                summary.updated += 1;
            }
        }

        let before = self.elements.len();
        self.extend(insertions);
        summary.inserted = self.elements.len() - before;

        debug!(
            deleted = summary.deleted,
            updated = summary.updated,
            inserted = summary.inserted,
            "difference applied"
        );
        summary
    }

    /// Append elements, replacing any whose identity is already cached.
    fn extend(&mut self, elements: Vec<T>) {
        for element in elements {
            let id = element.id();
            match self.index.get(&id) {
                Some(&position) => self.elements[position] = element,
                None => {
                    self.index.insert(id, self.elements.len());
                    self.elements.push(element);
                }
            }
        }
    }

    fn rebuild_index(&mut self) {
        self.index.clear();
        for (position, element) in self.elements.iter().enumerate() {
            self.index.insert(element.id(), position);
        }
    }
}

impl<Q: PartialEq, T: Identifiable, P> PageCache<Q, T, P> {
    /// Store a page under `key`.
    ///
    /// A key equal to the current session key appends; any other key
    /// replaces the contents. The position is always overwritten.
    pub fn store(&mut self, key: Q, elements: Vec<T>, position: Option<P>) -> StoreOutcome {
        if self.session_key.as_ref() == Some(&key) {
            let count = elements.len();
            self.extend(elements);
            self.position = position;
            debug!(count, total = self.elements.len(), "page appended");
            StoreOutcome::Appended
        } else {
            self.replace(key, elements, position);
            debug!(total = self.elements.len(), "session replaced");
            StoreOutcome::Replaced
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        id: u8,
        rev: u32,
    }

    impl Item {
        fn new(id: u8) -> Self {
            Self { id, rev: 0 }
        }
    }

    impl Identifiable for Item {
        type Id = u8;

        fn id(&self) -> u8 {
            self.id
        }
    }

    type Cache = PageCache<&'static str, Item, u32>;

    fn ids(cache: &Cache) -> Vec<u8> {
        cache.elements().iter().map(|item| item.id).collect()
    }

    fn index_is_consistent(cache: &Cache) -> bool {
        cache.index.len() == cache.elements.len()
            && cache
                .elements
                .iter()
                .enumerate()
                .all(|(position, item)| cache.index.get(&item.id) == Some(&position))
    }

    #[test]
    fn test_store_same_key_appends() {
        let mut cache = Cache::new();
        assert_eq!(
            cache.store("q1", vec![Item::new(1), Item::new(2)], Some(10)),
            StoreOutcome::Replaced
        );
        assert_eq!(
            cache.store("q1", vec![Item::new(3)], None),
            StoreOutcome::Appended
        );

        assert_eq!(ids(&cache), vec![1, 2, 3]);
        assert_eq!(cache.position(), None);
        assert_eq!(cache.session_key(), Some(&"q1"));
    }

    #[test]
    fn test_store_new_key_replaces_elements_and_position() {
        let mut cache = Cache::new();
        cache.store("q1", vec![Item::new(1), Item::new(2)], Some(10));
        cache.store("q2", vec![Item::new(9)], None);

        assert_eq!(ids(&cache), vec![9]);
        assert_eq!(cache.position(), None);
        assert!(cache.get(&1).is_none());
        assert!(index_is_consistent(&cache));
    }

    #[test]
    fn test_apply_order_delete_update_insert() {
        let mut cache = Cache::new();
        cache.replace("q", vec![Item::new(1), Item::new(2), Item::new(3)], None);

        let summary = cache.apply(
            Difference::none()
                .delete(1)
                .update(Item { id: 3, rev: 7 })
                .insert(Item::new(4)),
        );

        assert_eq!(
            summary,
            ApplySummary {
                deleted: 1,
                updated: 1,
                inserted: 1
            }
        );
        assert_eq!(ids(&cache), vec![2, 3, 4]);
        assert_eq!(cache.get(&3).map(|item| item.rev), Some(7));
        assert!(index_is_consistent(&cache));
    }

    #[test]
    fn test_delete_unknown_identity_is_noop() {
        let mut cache = Cache::new();
        cache.replace("q", vec![Item::new(1)], Some(3));

        let summary = cache.apply(Difference::none().delete(42));

        assert_eq!(summary, ApplySummary::default());
        assert_eq!(ids(&cache), vec![1]);
        assert_eq!(cache.position(), Some(&3));
    }

    #[test]
    fn test_update_unknown_identity_is_ignored() {
        let mut cache = Cache::new();
        cache.replace("q", vec![Item::new(1)], None);

        let summary = cache.apply(Difference::none().update(Item { id: 5, rev: 1 }));

        assert_eq!(summary.updated, 0);
        assert!(!cache.contains(&5));
    }

    #[test]
    fn test_clear_forgets_session() {
        let mut cache = Cache::new();
        cache.replace("q", vec![Item::new(1)], Some(1));
        cache.clear();

        assert!(cache.is_empty());
        assert!(cache.session_key().is_none());
        assert!(cache.position().is_none());
    }

    #[derive(Debug, Clone)]
    enum Op {
        Store(bool, Vec<u8>),
        Delete(Vec<u8>),
        Update(Vec<u8>),
        Insert(Vec<u8>),
    }

    fn op() -> impl Strategy<Value = Op> {
        let ids = || proptest::collection::vec(0u8..32, 0..8);
        prop_oneof![
            (any::<bool>(), ids()).prop_map(|(same, ids)| Op::Store(same, ids)),
            ids().prop_map(Op::Delete),
            ids().prop_map(Op::Update),
            ids().prop_map(Op::Insert),
        ]
    }

    fn items(ids: &[u8]) -> Vec<Item> {
        ids.iter().copied().map(Item::new).collect()
    }

    proptest! {
        #[test]
        fn test_prop_index_reflects_elements(ops in proptest::collection::vec(op(), 0..24)) {
            let mut cache = Cache::new();
            for op in ops {
                match op {
                    Op::Store(same, ids) => {
                        let key = if same { "same" } else { "other" };
                        cache.store(key, items(&ids), None);
                    }
                    Op::Delete(ids) => {
                        let diff = ids.into_iter().fold(Difference::<Item>::none(), Difference::delete);
                        cache.apply(diff);
                    }
                    Op::Update(ids) => {
                        let diff = items(&ids).into_iter().fold(Difference::<Item>::none(), Difference::update);
                        cache.apply(diff);
                    }
                    Op::Insert(ids) => {
                        let diff = items(&ids).into_iter().fold(Difference::<Item>::none(), Difference::insert);
                        cache.apply(diff);
                    }
                }
                prop_assert!(index_is_consistent(&cache));
            }
        }

        #[test]
        fn test_prop_deleting_absent_ids_changes_nothing(
            present in proptest::collection::hash_set(0u8..16, 0..10),
            absent in proptest::collection::vec(16u8..32, 0..10),
        ) {
            let present: Vec<u8> = present.into_iter().collect();
            let mut cache = Cache::new();
            cache.replace("q", items(&present), Some(1));
            let before = cache.elements().to_vec();

            let diff = absent.into_iter().fold(Difference::<Item>::none(), Difference::delete);
            let summary = cache.apply(diff);

            prop_assert_eq!(summary, ApplySummary::default());
            prop_assert_eq!(cache.elements(), before.as_slice());
        }

        #[test]
        fn test_prop_same_key_strictly_appends(
            first in proptest::collection::hash_set(0u8..16, 1..8),
            second in proptest::collection::hash_set(16u8..32, 1..8),
        ) {
            let first: Vec<u8> = first.into_iter().collect();
            let second: Vec<u8> = second.into_iter().collect();
            let mut cache = Cache::new();
            cache.store("q", items(&first), Some(1));
            cache.store("q", items(&second), Some(2));

            let expected: Vec<u8> = first.iter().chain(second.iter()).copied().collect();
            prop_assert_eq!(ids(&cache), expected);
            prop_assert_eq!(cache.position(), Some(&2));
        }
    }
}
