// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Structured logs and optional OpenTelemetry metrics for cache activity.
//!
//! Every cache operation is reported as a `cache.event` tracing event. With the `metrics`
//! feature and a meter supplied to the builder, the same events feed a counter and the number of
//! stored entries feeds a gauge.

#[cfg(feature = "metrics")]
pub(crate) mod metrics;

use crate::cache::CacheName;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CacheOperation {
    Get,
    Set,
    Delete,
    Clear,
    Query,
    Sweep,
    Destroy,
}

impl CacheOperation {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Get => "cache.get",
            Self::Set => "cache.set",
            Self::Delete => "cache.delete",
            Self::Clear => "cache.clear",
            Self::Query => "cache.query",
            Self::Sweep => "cache.sweep",
            Self::Destroy => "cache.destroy",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CacheActivity {
    Hit,
    Miss,
    Expired,
    Inserted,
    Invalidated,
    Swept,
    Ok,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Severity {
    Debug,
    Info,
    Error,
}

impl CacheActivity {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Hit => "cache.hit",
            Self::Miss => "cache.miss",
            Self::Expired => "cache.expired",
            Self::Inserted => "cache.inserted",
            Self::Invalidated => "cache.invalidated",
            Self::Swept => "cache.swept",
            Self::Ok => "cache.ok",
            Self::Error => "cache.error",
        }
    }

    pub(crate) fn severity(self) -> Severity {
        match self {
            Self::Hit | Self::Miss | Self::Inserted | Self::Ok => Severity::Debug,
            Self::Expired | Self::Invalidated | Self::Swept => Severity::Info,
            Self::Error => Severity::Error,
        }
    }
}

/// Sink for cache events.
#[derive(Clone, Debug, Default)]
pub(crate) struct CacheTelemetry {
    #[cfg(feature = "metrics")]
    metrics: Option<metrics::CacheMetrics>,
}

impl CacheTelemetry {
    #[cfg(feature = "metrics")]
    pub(crate) fn with_meter(meter: &opentelemetry::metrics::Meter) -> Self {
        Self {
            metrics: Some(metrics::CacheMetrics::new(meter)),
        }
    }

    pub(crate) fn record(&self, cache_name: CacheName, operation: CacheOperation, activity: CacheActivity) {
        #[cfg(feature = "metrics")]
        if let Some(metrics) = &self.metrics {
            metrics.record_event(cache_name, operation, activity);
        }

        emit(cache_name, operation, activity);
    }

    #[cfg_attr(not(feature = "metrics"), expect(unused_variables, reason = "size is only exported as a metric"))]
    pub(crate) fn record_size(&self, cache_name: CacheName, size: usize) {
        #[cfg(feature = "metrics")]
        if let Some(metrics) = &self.metrics {
            metrics.record_size(cache_name, size);
        }
    }
}

fn emit(cache_name: CacheName, operation: CacheOperation, activity: CacheActivity) {
    let op = operation.as_str();
    let act = activity.as_str();

    // Tracing levels must be constant, hence one macro invocation per level.
    macro_rules! emit_event {
        ($level:ident) => {
            tracing::$level!(cache.name = cache_name, cache.operation = op, cache.activity = act, "cache.event")
        };
    }

    match activity.severity() {
        Severity::Debug => emit_event!(debug),
        Severity::Info => emit_event!(info),
        Severity::Error => emit_event!(error),
    }
}
