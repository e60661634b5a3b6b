//! Single-item cache with request de-duplication.
//!
//! Concurrent loads of the same key share one fetch. Completed values are
//! kept up to a fixed capacity (the oldest stored entry is evicted first)
//! and, when a TTL is configured, are refetched once they are older than it.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::hash::Hash;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use pager_model::LoadError;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, trace};

/// Bounds for an [`ItemLoader`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemCacheConfig {
    /// Maximum number of cached values. Zero disables caching (requests are
    /// still de-duplicated).
    pub capacity: usize,

    /// Seconds after which a cached value is refetched. `None` keeps values
    /// until evicted or invalidated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl_secs: Option<u64>,
}

impl Default for ItemCacheConfig {
    fn default() -> Self {
        Self {
            capacity: 256,
            ttl_secs: None,
        }
    }
}

impl ItemCacheConfig {
    /// TTL as a duration.
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl_secs.map(Duration::from_secs)
    }
}

type SharedFetch<V, E> = Shared<BoxFuture<'static, Result<V, LoadError<E>>>>;
type Fetcher<K, V, E> = dyn Fn(K) -> BoxFuture<'static, Result<V, E>> + Send + Sync;

struct Entry<V> {
    value: V,
    stored_at: Instant,
}

struct Slots<K, V, E> {
    entries: HashMap<K, Entry<V>>,
    order: VecDeque<K>,
    in_flight: HashMap<K, SharedFetch<V, E>>,
}

/// Loads single values by key, caching results and sharing in-flight fetches.
pub struct ItemLoader<K, V, E> {
    fetch: Box<Fetcher<K, V, E>>,
    config: ItemCacheConfig,
    slots: Mutex<Slots<K, V, E>>,
}

impl<K, V, E> ItemLoader<K, V, E>
where
    K: Clone + Eq + Hash + Send + 'static,
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// Create a loader over `fetch(key)`.
    pub fn new<F, Fut>(config: ItemCacheConfig, fetch: F) -> Self
    where
        F: Fn(K) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        Self {
            fetch: Box::new(move |key| fetch(key).boxed()),
            config,
            slots: Mutex::new(Slots {
                entries: HashMap::new(),
                order: VecDeque::new(),
                in_flight: HashMap::new(),
            }),
        }
    }

    /// Return the cached value for `key`, or fetch it.
    ///
    /// A fetch already running for `key` is awaited instead of starting a
    /// second one. Failures are not cached.
    pub async fn load(&self, key: K) -> Result<V, LoadError<E>> {
        let fetch = {
            let mut slots = self.lock();
            if let Some(value) = self.fresh(&mut slots, &key) {
                trace!("item cache hit");
                return Ok(value);
            }
            match slots.in_flight.get(&key) {
                Some(running) => {
                    trace!("joining in-flight item fetch");
                    running.clone()
                }
                None => {
                    let fetch = (self.fetch)(key.clone())
                        .map(|result| result.map_err(LoadError::Failed))
                        .boxed()
                        .shared();
                    slots.in_flight.insert(key.clone(), fetch.clone());
                    fetch
                }
            }
        };

        let result = fetch.clone().await;

        let mut slots = self.lock();
        let owns_slot = slots
            .in_flight
            .get(&key)
            .is_some_and(|running| Shared::ptr_eq(running, &fetch));
        if owns_slot {
            slots.in_flight.remove(&key);
            if let Ok(value) = &result {
                self.insert(&mut slots, key, value.clone());
            }
        }
        result
    }

    /// The cached value for `key`, if present and not expired.
    pub fn get(&self, key: &K) -> Option<V> {
        let mut slots = self.lock();
        self.fresh(&mut slots, key)
    }

    /// Drop the cached value for `key`. A fetch already running is unaffected.
    pub fn invalidate(&self, key: &K) {
        let mut slots = self.lock();
        if slots.entries.remove(key).is_some() {
            slots.order.retain(|stored| stored != key);
            debug!("item invalidated");
        }
    }

    /// Drop every cached value.
    pub fn invalidate_all(&self) {
        let mut slots = self.lock();
        slots.entries.clear();
        slots.order.clear();
        debug!("item cache cleared");
    }

    /// Number of cached values, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Check if no values are cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Slots<K, V, E>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn fresh(&self, slots: &mut Slots<K, V, E>, key: &K) -> Option<V> {
        let expired = match (slots.entries.get(key), self.config.ttl()) {
            (None, _) => return None,
            (Some(entry), Some(ttl)) => entry.stored_at.elapsed() >= ttl,
            (Some(_), None) => false,
        };
        if expired {
            slots.entries.remove(key);
            slots.order.retain(|stored| stored != key);
            trace!("item expired");
            return None;
        }
        slots.entries.get(key).map(|entry| entry.value.clone())
    }

    fn insert(&self, slots: &mut Slots<K, V, E>, key: K, value: V) {
        if self.config.capacity == 0 {
            return;
        }
        if slots.entries.contains_key(&key) {
            slots.order.retain(|stored| stored != &key);
        }
        slots.order.push_back(key.clone());
        slots.entries.insert(
            key,
            Entry {
                value,
                stored_at: Instant::now(),
            },
        );
        while slots.entries.len() > self.config.capacity {
            let Some(oldest) = slots.order.pop_front() else {
                break;
            };
            slots.entries.remove(&oldest);
            debug!("item evicted");
        }
    }
}
