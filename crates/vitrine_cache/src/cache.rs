// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The TTL cache and its memoization entry point.

use std::{
    any::{Any, TypeId},
    collections::HashMap,
    fmt::{self, Debug},
    hash::Hash,
    sync::Arc,
    time::Duration,
};

use futures::future::AbortHandle;
use parking_lot::Mutex;
use tick::Clock;
use uniflight::UniFlight;

use crate::{
    CacheEntry,
    builder::{CacheConfig, TtlCacheBuilder},
    telemetry::{CacheActivity, CacheOperation, CacheTelemetry},
};

/// Name identifying a cache in logs and metrics.
pub type CacheName = &'static str;

/// In-flight query groups, one per producer error type.
///
/// `UniFlight` is typed by the shared result, and `cached_query` is generic over the producer's
/// error, so each error type gets its own group, created on first use.
type Flights = Mutex<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>;

pub(crate) struct Shared<K, V> {
    pub(crate) name: CacheName,
    pub(crate) clock: Clock,
    pub(crate) config: CacheConfig,
    pub(crate) telemetry: CacheTelemetry,
    entries: Mutex<HashMap<K, CacheEntry<V>>>,
    flights: Flights,
    pub(crate) sweeper: Mutex<Option<AbortHandle>>,
}

impl<K, V> Drop for Shared<K, V> {
    fn drop(&mut self) {
        if let Some(sweeper) = self.sweeper.get_mut().take() {
            sweeper.abort();
        }
    }
}

/// An in-process key/value cache whose entries expire after a time-to-live.
///
/// `TtlCache` is a handle: clones share the same entries, and independent instances created
/// with [`TtlCache::new`] or [`TtlCache::builder`] share nothing. Pass it explicitly to the
/// components that need memoization.
///
/// Reads never return an expired entry. An expired entry found by [`get`](Self::get) or
/// [`has`](Self::has) is removed on the spot; entries that are never read again are removed by
/// the background sweep (see [`spawn_sweeper`](Self::spawn_sweeper)) or by [`clear`](Self::clear).
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use tick::ClockControl;
/// use vitrine_cache::TtlCache;
///
/// let control = ClockControl::new();
/// let cache = TtlCache::<&str, u32>::new(control.to_clock());
///
/// cache.set_with_ttl("sku-42", 12, Duration::from_secs(10));
/// assert_eq!(cache.get(&"sku-42"), Some(12));
///
/// control.advance(Duration::from_secs(11));
/// assert_eq!(cache.get(&"sku-42"), None);
/// assert_eq!(cache.len(), 0);
/// ```
pub struct TtlCache<K, V> {
    pub(crate) shared: Arc<Shared<K, V>>,
}

impl<K, V> Clone for TtlCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<K, V> Debug for TtlCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TtlCache")
            .field("name", &self.shared.name)
            .field("config", &self.shared.config)
            .field("len", &self.shared.entries.lock().len())
            .finish_non_exhaustive()
    }
}

impl TtlCache<(), ()> {
    /// Creates a builder for a cache driven by `clock`.
    #[must_use]
    pub fn builder<K, V>(clock: Clock) -> TtlCacheBuilder<K, V> {
        TtlCacheBuilder::new(clock)
    }
}

/// Construction and accessors.
impl<K, V> TtlCache<K, V>
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Creates a cache with the default settings: a five minute TTL and a one minute sweep period.
    #[must_use]
    pub fn new(clock: Clock) -> Self {
        TtlCacheBuilder::new(clock).build()
    }

    pub(crate) fn from_parts(name: CacheName, clock: Clock, config: CacheConfig, telemetry: CacheTelemetry) -> Self {
        Self {
            shared: Arc::new(Shared {
                name,
                clock,
                config,
                telemetry,
                entries: Mutex::new(HashMap::new()),
                flights: Mutex::new(HashMap::new()),
                sweeper: Mutex::new(None),
            }),
        }
    }

    /// Returns the name of this cache.
    #[must_use]
    pub fn name(&self) -> CacheName {
        self.shared.name
    }

    /// Returns a reference to the cache's clock.
    #[must_use]
    pub fn clock(&self) -> &Clock {
        &self.shared.clock
    }

    /// Returns the time-to-live applied by [`set`](Self::set).
    #[must_use]
    pub fn default_ttl(&self) -> Duration {
        self.shared.config.default_ttl
    }

    /// Returns the period of the background sweep.
    #[must_use]
    pub fn sweep_interval(&self) -> Duration {
        self.shared.config.sweep_interval
    }

    /// Returns the number of stored entries, including expired ones not evicted yet.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shared.entries.lock().len()
    }

    /// Returns `true` if no entries are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shared.entries.lock().is_empty()
    }
}

/// Cache operations.
impl<K, V> TtlCache<K, V>
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Stores `value` under `key` with the default time-to-live.
    ///
    /// Any existing entry for `key` is replaced and its lifetime restarts.
    pub fn set(&self, key: K, value: V) {
        self.set_with_ttl(key, value, self.shared.config.default_ttl);
    }

    /// Stores `value` under `key` for `ttl`.
    ///
    /// Any existing entry for `key` is replaced and its lifetime restarts.
    pub fn set_with_ttl(&self, key: K, value: V, ttl: Duration) {
        let entry = CacheEntry::new(value, self.shared.clock.system_time(), ttl);
        let size = {
            let mut entries = self.shared.entries.lock();
            entries.insert(key, entry);
            entries.len()
        };

        self.record(CacheOperation::Set, CacheActivity::Inserted);
        self.shared.telemetry.record_size(self.shared.name, size);
    }

    /// Returns the value stored under `key` if it has not expired.
    ///
    /// An expired entry is removed as a side effect and `None` is returned.
    #[must_use]
    pub fn get(&self, key: &K) -> Option<V> {
        self.lookup(key, CacheOperation::Get)
    }

    /// Returns `true` if a valid entry is stored under `key`.
    ///
    /// This is exactly `self.get(key).is_some()`: an expired entry is evicted.
    #[must_use]
    pub fn has(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    /// Removes the entry stored under `key`, expired or not.
    ///
    /// Returns `true` if an entry was removed.
    pub fn delete(&self, key: &K) -> bool {
        let (removed, size) = {
            let mut entries = self.shared.entries.lock();
            let removed = entries.remove(key).is_some();
            (removed, entries.len())
        };

        if removed {
            self.record(CacheOperation::Delete, CacheActivity::Invalidated);
            self.shared.telemetry.record_size(self.shared.name, size);
        }
        removed
    }

    /// Removes every entry.
    pub fn clear(&self) {
        self.shared.entries.lock().clear();
        self.record(CacheOperation::Clear, CacheActivity::Ok);
        self.shared.telemetry.record_size(self.shared.name, 0);
    }

    /// Removes every expired entry and returns how many were removed.
    ///
    /// This is one pass of the background sweep; it can also be called directly by owners that
    /// drive their own timers.
    pub fn evict_expired(&self) -> usize {
        let now = self.shared.clock.system_time();
        let (evicted, size) = {
            let mut entries = self.shared.entries.lock();
            let before = entries.len();
            entries.retain(|_, entry| !entry.is_expired_at(now));
            (before - entries.len(), entries.len())
        };

        if evicted > 0 {
            self.record(CacheOperation::Sweep, CacheActivity::Swept);
            self.shared.telemetry.record_size(self.shared.name, size);
        }
        evicted
    }

    /// Stops the background sweep and removes every entry.
    ///
    /// The cache stays usable afterwards; a new sweeper can be started with
    /// [`spawn_sweeper`](Self::spawn_sweeper). Calling this repeatedly is harmless.
    pub fn destroy(&self) {
        if let Some(sweeper) = self.shared.sweeper.lock().take() {
            sweeper.abort();
        }
        self.shared.entries.lock().clear();
        self.record(CacheOperation::Destroy, CacheActivity::Ok);
        self.shared.telemetry.record_size(self.shared.name, 0);
    }

    /// Returns the cached value for `key`, or runs `producer` and caches its successful result.
    ///
    /// A successful value is stored for `ttl`. An error is returned to the caller unchanged and
    /// nothing is stored, so the next call runs the producer again.
    ///
    /// Concurrent calls that miss on the same key are coalesced: one of them runs its producer
    /// and the others wait for and receive a clone of that result, error included. The
    /// remaining producers are dropped without being called.
    ///
    /// # Errors
    ///
    /// Returns the error produced by `producer`.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    ///
    /// use tick::Clock;
    /// use vitrine_cache::TtlCache;
    /// # futures::executor::block_on(async {
    ///
    /// let cache = TtlCache::<String, u32>::new(Clock::new_frozen());
    ///
    /// let stock = cache
    ///     .cached_query("stock:sku-42".to_string(), || async { Ok::<_, String>(12) }, Duration::from_secs(30))
    ///     .await;
    /// assert_eq!(stock, Ok(12));
    ///
    /// // Served from the cache, the producer is not called.
    /// let stock = cache
    ///     .cached_query("stock:sku-42".to_string(), || async { Err::<u32, _>("unreachable".to_string()) }, Duration::from_secs(30))
    ///     .await;
    /// assert_eq!(stock, Ok(12));
    /// # });
    /// ```
    pub async fn cached_query<E, F, Fut>(&self, key: K, producer: F, ttl: Duration) -> Result<V, E>
    where
        E: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.lookup(&key, CacheOperation::Query) {
            return Ok(value);
        }

        let flight = self.flight::<E>();
        let flight_key = key.clone();
        flight
            .work(key, move || async move {
                // A leader that finished while this caller was queued may already have stored the value.
                if let Some(value) = self.peek(&flight_key) {
                    return Ok(value);
                }

                match producer().await {
                    Ok(value) => {
                        self.set_with_ttl(flight_key, value.clone(), ttl);
                        Ok(value)
                    }
                    Err(error) => {
                        self.record(CacheOperation::Query, CacheActivity::Error);
                        Err(error)
                    }
                }
            })
            .await
    }

    /// Like [`cached_query`](Self::cached_query), using the cache's default time-to-live.
    ///
    /// # Errors
    ///
    /// Returns the error produced by `producer`.
    pub async fn cached_query_default_ttl<E, F, Fut>(&self, key: K, producer: F) -> Result<V, E>
    where
        E: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        self.cached_query(key, producer, self.shared.config.default_ttl).await
    }

    fn lookup(&self, key: &K, operation: CacheOperation) -> Option<V> {
        let now = self.shared.clock.system_time();
        let (activity, value) = {
            let mut entries = self.shared.entries.lock();
            match entries.get(key) {
                None => (CacheActivity::Miss, None),
                Some(entry) if entry.is_expired_at(now) => {
                    entries.remove(key);
                    (CacheActivity::Expired, None)
                }
                Some(entry) => (CacheActivity::Hit, Some(entry.value().clone())),
            }
        };

        self.record(operation, activity);
        value
    }

    // Silent read used inside a flight; expired entries are left to the regular paths.
    fn peek(&self, key: &K) -> Option<V> {
        let now = self.shared.clock.system_time();
        self.shared
            .entries
            .lock()
            .get(key)
            .filter(|entry| !entry.is_expired_at(now))
            .map(|entry| entry.value().clone())
    }

    fn flight<E>(&self) -> Arc<UniFlight<K, Result<V, E>>>
    where
        E: Send + Sync + 'static,
    {
        let group = Arc::clone(
            self.shared
                .flights
                .lock()
                .entry(TypeId::of::<E>())
                .or_insert_with(|| Arc::new(UniFlight::<K, Result<V, E>>::new())),
        );

        group
            .downcast::<UniFlight<K, Result<V, E>>>()
            .expect("flight groups are keyed by the type id of their error type")
    }

    fn record(&self, operation: CacheOperation, activity: CacheActivity) {
        self.shared.telemetry.record(self.shared.name, operation, activity);
    }
}
