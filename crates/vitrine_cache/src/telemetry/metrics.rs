// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use opentelemetry::{
    InstrumentationScope, KeyValue,
    metrics::{Counter, Gauge, Meter, MeterProvider},
};

use crate::{
    cache::CacheName,
    telemetry::{CacheActivity, CacheOperation},
};

const METER_NAME: &str = "vitrine_cache";
const VERSION: &str = env!("CARGO_PKG_VERSION");
const CACHE_EVENT_COUNT_NAME: &str = "cache.event.count";
const CACHE_SIZE_NAME: &str = "cache.size";

pub(crate) const CACHE_NAME: &str = "cache.name";
pub(crate) const CACHE_OPERATION_NAME: &str = "cache.operation";
pub(crate) const CACHE_ACTIVITY_NAME: &str = "cache.activity";

pub(crate) fn create_meter(meter_provider: &dyn MeterProvider) -> Meter {
    meter_provider.meter_with_scope(InstrumentationScope::builder(METER_NAME).with_version(VERSION).build())
}

#[derive(Clone, Debug)]
pub(crate) struct CacheMetrics {
    event_counter: Counter<u64>,
    cache_size: Gauge<u64>,
}

impl CacheMetrics {
    pub(crate) fn new(meter: &Meter) -> Self {
        Self {
            event_counter: meter
                .u64_counter(CACHE_EVENT_COUNT_NAME)
                .with_description("Cache events")
                .with_unit("{event}")
                .build(),
            cache_size: meter
                .u64_gauge(CACHE_SIZE_NAME)
                .with_description("Number of entries in the cache")
                .with_unit("{entry}")
                .build(),
        }
    }

    pub(crate) fn record_event(&self, cache_name: CacheName, operation: CacheOperation, activity: CacheActivity) {
        self.event_counter.add(
            1,
            &[
                KeyValue::new(CACHE_NAME, cache_name),
                KeyValue::new(CACHE_OPERATION_NAME, operation.as_str()),
                KeyValue::new(CACHE_ACTIVITY_NAME, activity.as_str()),
            ],
        );
    }

    pub(crate) fn record_size(&self, cache_name: CacheName, size: usize) {
        let size = u64::try_from(size).unwrap_or(u64::MAX);
        self.cache_size.record(size, &[KeyValue::new(CACHE_NAME, cache_name)]);
    }
}
