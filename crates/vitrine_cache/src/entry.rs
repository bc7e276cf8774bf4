// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::{
    ops::Deref,
    time::{Duration, SystemTime},
};

/// A cached value together with the time it was stored and its time-to-live.
///
/// An entry is valid while `now - stored_at <= ttl`. Entries are created by the cache on
/// every write; a later write for the same key replaces the entry and restarts its lifetime.
///
/// # Examples
///
/// ```
/// use std::time::{Duration, SystemTime};
///
/// use vitrine_cache::CacheEntry;
///
/// let stored_at = SystemTime::UNIX_EPOCH;
/// let entry = CacheEntry::new("robe", stored_at, Duration::from_secs(60));
///
/// assert!(!entry.is_expired_at(stored_at + Duration::from_secs(60)));
/// assert!(entry.is_expired_at(stored_at + Duration::from_secs(61)));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheEntry<V> {
    value: V,
    stored_at: SystemTime,
    ttl: Duration,
}

impl<V> CacheEntry<V> {
    /// Creates an entry stored at `stored_at` that lives for `ttl`.
    pub fn new(value: V, stored_at: SystemTime, ttl: Duration) -> Self {
        Self { value, stored_at, ttl }
    }

    /// Returns a reference to the cached value.
    #[must_use]
    pub fn value(&self) -> &V {
        &self.value
    }

    /// Consumes the entry and returns the inner value.
    #[must_use]
    pub fn into_value(self) -> V {
        self.value
    }

    /// Returns the time the entry was written.
    #[must_use]
    pub fn stored_at(&self) -> SystemTime {
        self.stored_at
    }

    /// Returns the time-to-live of the entry.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the last instant at which the entry is still valid.
    ///
    /// Returns `None` when the expiry does not fit in a [`SystemTime`], in which case the
    /// entry never expires.
    #[must_use]
    pub fn expires_at(&self) -> Option<SystemTime> {
        self.stored_at.checked_add(self.ttl)
    }

    /// Returns `true` if the entry must no longer be served at `now`.
    ///
    /// The boundary is inclusive: an entry read exactly `ttl` after it was stored is still valid.
    /// If `now` is earlier than `stored_at` (the system clock went backwards), the entry is
    /// considered expired.
    #[must_use]
    pub fn is_expired_at(&self, now: SystemTime) -> bool {
        match now.duration_since(self.stored_at) {
            Ok(elapsed) => elapsed > self.ttl,
            Err(_) => true,
        }
    }
}

impl<V> Deref for CacheEntry<V> {
    type Target = V;

    fn deref(&self) -> &Self::Target {
        &self.value
    }
}
