// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Configuration and builder for [`TtlCache`].

use std::{hash::Hash, marker::PhantomData, time::Duration};

use serde::{Deserialize, Serialize};
use tick::Clock;

use crate::{TtlCache, cache::CacheName, telemetry::CacheTelemetry};

/// Default time-to-live applied by [`TtlCache::set`]: five minutes.
pub const DEFAULT_TTL: Duration = Duration::from_millis(300_000);

/// Default period of the background sweep: one minute.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

const DEFAULT_NAME: CacheName = "ttl_cache";

/// Plain-data settings of a [`TtlCache`].
///
/// Missing fields take their defaults when deserializing, so a partial configuration such as
/// `{ "default_ttl": { "secs": 60, "nanos": 0 } }` is valid.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use tick::Clock;
/// use vitrine_cache::{CacheConfig, TtlCache};
///
/// let config = CacheConfig::default().with_default_ttl(Duration::from_secs(30));
/// let cache = TtlCache::builder::<String, u32>(Clock::new_frozen()).config(config).build();
///
/// assert_eq!(cache.default_ttl(), Duration::from_secs(30));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Time-to-live of entries written without an explicit one.
    pub default_ttl: Duration,
    /// Period of the background sweep started by [`TtlCache::spawn_sweeper`].
    pub sweep_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: DEFAULT_TTL,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

impl CacheConfig {
    /// Sets the default time-to-live.
    #[must_use]
    pub fn with_default_ttl(self, default_ttl: Duration) -> Self {
        Self { default_ttl, ..self }
    }

    /// Sets the background sweep period.
    #[must_use]
    pub fn with_sweep_interval(self, sweep_interval: Duration) -> Self {
        Self { sweep_interval, ..self }
    }
}

/// Builder for [`TtlCache`].
///
/// Created by [`TtlCache::builder`].
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use tick::Clock;
/// use vitrine_cache::TtlCache;
///
/// let cache = TtlCache::builder::<String, String>(Clock::new_frozen())
///     .name("catalog")
///     .default_ttl(Duration::from_secs(120))
///     .sweep_interval(Duration::from_secs(30))
///     .build();
///
/// assert_eq!(cache.name(), "catalog");
/// ```
#[derive(Debug)]
pub struct TtlCacheBuilder<K, V> {
    name: CacheName,
    clock: Clock,
    config: CacheConfig,
    telemetry: CacheTelemetry,
    _phantom: PhantomData<(K, V)>,
}

impl<K, V> TtlCacheBuilder<K, V> {
    pub(crate) fn new(clock: Clock) -> Self {
        Self {
            name: DEFAULT_NAME,
            clock,
            config: CacheConfig::default(),
            telemetry: CacheTelemetry::default(),
            _phantom: PhantomData,
        }
    }

    /// Sets the name identifying this cache in logs and metrics.
    #[must_use]
    pub fn name(mut self, name: CacheName) -> Self {
        self.name = name;
        self
    }

    /// Replaces all settings with `config`.
    #[must_use]
    pub fn config(mut self, config: CacheConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the time-to-live used by [`TtlCache::set`].
    #[must_use]
    pub fn default_ttl(mut self, ttl: Duration) -> Self {
        self.config.default_ttl = ttl;
        self
    }

    /// Sets the period of the background sweep.
    ///
    /// Periods shorter than one millisecond are rounded up by the timer.
    #[must_use]
    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.config.sweep_interval = interval;
        self
    }

    /// Exports cache events and size through OpenTelemetry metrics.
    #[cfg(feature = "metrics")]
    #[cfg_attr(docsrs, doc(cfg(feature = "metrics")))]
    #[must_use]
    pub fn metrics(mut self, provider: &dyn opentelemetry::metrics::MeterProvider) -> Self {
        let meter = crate::telemetry::metrics::create_meter(provider);
        self.telemetry = CacheTelemetry::with_meter(&meter);
        self
    }

    /// Returns a reference to the builder's clock.
    #[must_use]
    pub fn clock(&self) -> &Clock {
        &self.clock
    }
}

impl<K, V> TtlCacheBuilder<K, V>
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Builds the cache. No background work is started.
    #[must_use]
    pub fn build(self) -> TtlCache<K, V> {
        TtlCache::from_parts(self.name, self.clock, self.config, self.telemetry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = CacheConfig::default();
        assert_eq!(config.default_ttl, Duration::from_millis(300_000));
        assert_eq!(config.sweep_interval, Duration::from_secs(60));
    }

    #[test]
    fn partial_config_deserializes_with_defaults() {
        let config: CacheConfig = serde_json::from_str(r#"{ "default_ttl": { "secs": 10, "nanos": 0 } }"#).unwrap();
        assert_eq!(config.default_ttl, Duration::from_secs(10));
        assert_eq!(config.sweep_interval, DEFAULT_SWEEP_INTERVAL);
    }

    #[test]
    fn builder_applies_settings() {
        let cache = TtlCacheBuilder::<String, i32>::new(Clock::new_frozen())
            .config(CacheConfig::default().with_sweep_interval(Duration::from_secs(5)))
            .default_ttl(Duration::from_secs(1))
            .name("orders")
            .build();

        assert_eq!(cache.name(), "orders");
        assert_eq!(cache.default_ttl(), Duration::from_secs(1));
        assert_eq!(cache.sweep_interval(), Duration::from_secs(5));
    }

    #[test]
    fn builder_exposes_clock() {
        let clock = Clock::new_frozen();
        let builder = TtlCacheBuilder::<String, i32>::new(clock.clone());
        assert_eq!(builder.clock().system_time(), clock.system_time());
    }
}
