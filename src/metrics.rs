// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Prometheus metrics for the zone registry.
//!
//! All metrics carry the namespace prefix `zonereg_`.
//!
//! # Metrics Categories
//!
//! - **Operation Metrics** - Track registry operations, their outcome and duration
//! - **Consistency Metrics** - Track PTR override synthesis and zone dirty marking
//! - **Inventory Metrics** - Track the number of stored entities
//!
//! # Example
//!
//! ```rust,no_run
//! use zonereg::metrics::record_operation_success;
//!
//! record_operation_success("create_host", std::time::Duration::from_millis(2));
//! ```

use prometheus::{
    CounterVec, Encoder, GaugeVec, HistogramOpts, HistogramVec, IntCounter, Opts, Registry,
    TextEncoder,
};
use std::sync::LazyLock;
use std::time::Duration;

// ============================================================================
// Metric Name Constants
// ============================================================================

/// Namespace prefix for all registry metrics
const METRICS_NAMESPACE: &str = "zonereg";

// ============================================================================
// Global Metrics Registry
// ============================================================================

/// Global Prometheus metrics registry
pub static METRICS_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// ============================================================================
// Operation Metrics
// ============================================================================

/// Total number of registry operations by name and status
///
/// Labels:
/// - `operation`: Operation name (e.g., `create_host`, `publish_zone`)
/// - `status`: Outcome (`success`, `error`)
pub static OPERATIONS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_operations_total"),
        "Total number of registry operations by name and status",
    );
    let counter = CounterVec::new(opts, &["operation", "status"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Duration of registry operations in seconds, including lock wait
///
/// Labels:
/// - `operation`: Operation name
pub static OPERATION_DURATION_SECONDS: LazyLock<HistogramVec> = LazyLock::new(|| {
    let opts = HistogramOpts::new(
        format!("{METRICS_NAMESPACE}_operation_duration_seconds"),
        "Duration of registry operations in seconds by operation",
    )
    .buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]);
    let histogram = HistogramVec::new(opts, &["operation"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(histogram.clone()))
        .unwrap();
    histogram
});

/// Total number of rejected operations by error kind
///
/// Labels:
/// - `operation`: Operation name
/// - `error_kind`: Kind of error (`validation`, `conflict`, `overlap`, ...)
pub static ERRORS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_errors_total"),
        "Total number of rejected operations by operation and error kind",
    );
    let counter = CounterVec::new(opts, &["operation", "error_kind"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Consistency Metrics
// ============================================================================

/// Total number of automatic PTR override changes
///
/// Labels:
/// - `action`: `created` or `removed`
pub static PTR_OVERRIDES_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_ptr_overrides_total"),
        "Total number of automatic PTR override changes by action",
    );
    let counter = CounterVec::new(opts, &["action"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Total number of times a zone was marked dirty by a committed mutation
pub static ZONES_MARKED_DIRTY_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    let counter = IntCounter::new(
        format!("{METRICS_NAMESPACE}_zones_marked_dirty_total"),
        "Total number of zone dirty markings",
    )
    .unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Total number of zone publishes that advanced a serial
pub static ZONES_PUBLISHED_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    let counter = IntCounter::new(
        format!("{METRICS_NAMESPACE}_zones_published_total"),
        "Total number of zone publishes that advanced the serial",
    )
    .unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Inventory Metrics
// ============================================================================

/// Number of stored entities by kind
///
/// Labels:
/// - `entity`: Table name (e.g., `hosts`, `zones`)
pub static ENTITIES_ACTIVE: LazyLock<GaugeVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_entities_active"),
        "Number of stored entities by kind",
    );
    let gauge = GaugeVec::new(opts, &["entity"]).unwrap();
    METRICS_REGISTRY.register(Box::new(gauge.clone())).unwrap();
    gauge
});

// ============================================================================
// Helper Functions
// ============================================================================

/// Record a successful operation
///
/// # Arguments
/// * `operation` - The operation name
/// * `duration` - Duration of the operation
pub fn record_operation_success(operation: &str, duration: Duration) {
    OPERATIONS_TOTAL
        .with_label_values(&[operation, "success"])
        .inc();
    OPERATION_DURATION_SECONDS
        .with_label_values(&[operation])
        .observe(duration.as_secs_f64());
}

/// Record a rejected operation
///
/// # Arguments
/// * `operation` - The operation name
/// * `error_kind` - Kind of error returned (see `ErrorKind::as_str`)
/// * `duration` - Duration of the operation before it was rejected
pub fn record_operation_error(operation: &str, error_kind: &str, duration: Duration) {
    OPERATIONS_TOTAL
        .with_label_values(&[operation, "error"])
        .inc();
    ERRORS_TOTAL
        .with_label_values(&[operation, error_kind])
        .inc();
    OPERATION_DURATION_SECONDS
        .with_label_values(&[operation])
        .observe(duration.as_secs_f64());
}

/// Record automatic PTR override changes committed by one operation
pub fn record_ptr_overrides(created: u64, removed: u64) {
    if created > 0 {
        PTR_OVERRIDES_TOTAL
            .with_label_values(&["created"])
            .inc_by(created as f64);
    }
    if removed > 0 {
        PTR_OVERRIDES_TOTAL
            .with_label_values(&["removed"])
            .inc_by(removed as f64);
    }
}

/// Record zones marked dirty by one operation
pub fn record_zones_dirty(count: u64) {
    ZONES_MARKED_DIRTY_TOTAL.inc_by(count);
}

/// Record a publish that advanced a zone serial
pub fn record_zone_published() {
    ZONES_PUBLISHED_TOTAL.inc();
}

/// Set the number of stored entities of one kind
///
/// # Arguments
/// * `entity` - Table name
/// * `count` - Current number of rows
pub fn set_entities_active(entity: &str, count: usize) {
    ENTITIES_ACTIVE
        .with_label_values(&[entity])
        .set(count as f64);
}

/// Gather and encode all metrics in Prometheus text format
///
/// # Errors
/// Returns error if encoding fails
pub fn gather_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = METRICS_REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(format!("UTF-8 error: {e}")))
}
