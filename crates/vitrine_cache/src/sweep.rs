// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Periodic eviction of expired entries.

use std::{
    hash::Hash,
    sync::{Arc, Weak},
};

use anyspawn::Spawner;
use futures::{
    StreamExt,
    future::{AbortHandle, Abortable, Aborted},
};
use tick::PeriodicTimer;

use crate::{TtlCache, cache::Shared};

impl<K, V> TtlCache<K, V>
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Starts the background sweep on `spawner`.
    ///
    /// Every [`sweep_interval`](Self::sweep_interval), the sweep removes the entries that have
    /// expired, as [`evict_expired`](Self::evict_expired) does. The first pass runs one interval
    /// after this call.
    ///
    /// The task keeps only a weak reference to the cache: it ends on its own once every handle to
    /// the cache is dropped, and [`destroy`](Self::destroy) stops it immediately.
    ///
    /// Returns `false` without starting anything if a sweeper is already running.
    ///
    /// # Examples
    ///
    /// ```
    /// use anyspawn::Spawner;
    /// use tick::Clock;
    /// use vitrine_cache::TtlCache;
    ///
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() {
    /// let cache = TtlCache::<String, u32>::new(Clock::new_tokio());
    /// let spawner = Spawner::new_tokio();
    ///
    /// assert!(cache.spawn_sweeper(&spawner));
    /// assert!(!cache.spawn_sweeper(&spawner));
    ///
    /// cache.destroy();
    /// # }
    /// ```
    pub fn spawn_sweeper(&self, spawner: &Spawner) -> bool {
        let mut sweeper = self.shared.sweeper.lock();
        if sweeper.is_some() {
            return false;
        }

        let (handle, registration) = AbortHandle::new_pair();
        let timer = PeriodicTimer::new(&self.shared.clock, self.shared.config.sweep_interval);
        let name = self.shared.name;
        let task = Abortable::new(sweep_loop(Arc::downgrade(&self.shared), timer), registration);

        // Fire and forget: the abort handle is the only control over the task.
        drop(spawner.spawn(async move {
            match task.await {
                Ok(()) => tracing::debug!(cache.name = name, "sweeper stopped, cache dropped"),
                Err(Aborted) => tracing::debug!(cache.name = name, "sweeper aborted"),
            }
        }));

        *sweeper = Some(handle);
        drop(sweeper);

        tracing::debug!(cache.name = name, interval = ?self.shared.config.sweep_interval, "sweeper started");
        true
    }

    /// Returns `true` while a sweeper started by [`spawn_sweeper`](Self::spawn_sweeper) is active.
    #[must_use]
    pub fn is_sweeping(&self) -> bool {
        self.shared.sweeper.lock().is_some()
    }
}

async fn sweep_loop<K, V>(shared: Weak<Shared<K, V>>, mut timer: PeriodicTimer)
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    while timer.next().await.is_some() {
        let Some(shared) = shared.upgrade() else {
            return;
        };

        let evicted = TtlCache { shared }.evict_expired();
        tracing::trace!(evicted, "sweep pass");
    }
}
