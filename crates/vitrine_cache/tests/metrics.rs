// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg(feature = "metrics")]

//! Integration tests for the OpenTelemetry metrics export.

use std::time::Duration;

use opentelemetry::KeyValue;
use opentelemetry_sdk::metrics::{
    InMemoryMetricExporter, SdkMeterProvider,
    data::{AggregatedMetrics, Metric, MetricData, ResourceMetrics, ScopeMetrics},
};
use tick::ClockControl;
use vitrine_cache::TtlCache;

struct MetricTester {
    exporter: InMemoryMetricExporter,
    provider: SdkMeterProvider,
}

impl MetricTester {
    fn new() -> Self {
        let exporter = InMemoryMetricExporter::default();
        let provider = SdkMeterProvider::builder().with_periodic_exporter(exporter.clone()).build();
        Self { exporter, provider }
    }

    fn metric_names(&self) -> Vec<String> {
        self.provider.force_flush().unwrap();
        self.exporter
            .get_finished_metrics()
            .unwrap()
            .iter()
            .flat_map(ResourceMetrics::scope_metrics)
            .flat_map(ScopeMetrics::metrics)
            .map(|metric| metric.name().to_string())
            .collect()
    }

    fn attributes(&self) -> Vec<KeyValue> {
        self.provider.force_flush().unwrap();
        self.exporter
            .get_finished_metrics()
            .unwrap()
            .iter()
            .flat_map(ResourceMetrics::scope_metrics)
            .flat_map(ScopeMetrics::metrics)
            .flat_map(u64_attributes)
            .collect()
    }
}

fn u64_attributes(metric: &Metric) -> Vec<KeyValue> {
    match metric.data() {
        AggregatedMetrics::U64(MetricData::Sum(data)) => data.data_points().flat_map(|p| p.attributes().cloned()).collect(),
        AggregatedMetrics::U64(MetricData::Gauge(data)) => data.data_points().flat_map(|p| p.attributes().cloned()).collect(),
        _ => Vec::new(),
    }
}

#[test]
fn events_and_size_are_exported() {
    let tester = MetricTester::new();
    let control = ClockControl::new();
    let cache = TtlCache::builder::<String, u32>(control.to_clock())
        .name("catalog")
        .metrics(&tester.provider)
        .build();

    cache.set_with_ttl("a".to_string(), 1, Duration::from_secs(1));
    let _ = cache.get(&"a".to_string());
    let _ = cache.get(&"b".to_string());
    control.advance(Duration::from_secs(2));
    let _ = cache.get(&"a".to_string());

    let names = tester.metric_names();
    assert!(names.iter().any(|n| n == "cache.event.count"), "missing event counter in {names:?}");
    assert!(names.iter().any(|n| n == "cache.size"), "missing size gauge in {names:?}");

    let attributes = tester.attributes();
    for expected in [
        KeyValue::new("cache.name", "catalog"),
        KeyValue::new("cache.operation", "cache.set"),
        KeyValue::new("cache.activity", "cache.inserted"),
        KeyValue::new("cache.activity", "cache.hit"),
        KeyValue::new("cache.activity", "cache.miss"),
        KeyValue::new("cache.activity", "cache.expired"),
    ] {
        assert!(attributes.contains(&expected), "attribute {expected:?} not found in {attributes:?}");
    }
}

#[test]
fn cache_without_meter_exports_nothing() {
    let tester = MetricTester::new();
    let cache = TtlCache::<String, u32>::new(ClockControl::new().to_clock());

    cache.set("a".to_string(), 1);

    assert!(tester.metric_names().is_empty());
}
