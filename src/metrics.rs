// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Prometheus metrics for bindconf.
//!
//! All metrics use the namespace prefix `bindconf_`.
//!
//! # Metrics Categories
//!
//! - **Validation Metrics** - Checker verdicts and run time
//! - **Commit Metrics** - Outcomes of safe-edit transactions
//! - **Backup Metrics** - Snapshot, restore, delete and prune operations
//! - **Daemon Metrics** - Control commands sent to BIND9
//!
//! # Example
//!
//! ```rust,no_run
//! use bindconf::metrics::{gather_metrics, record_commit};
//!
//! record_commit("success");
//! let text = gather_metrics().unwrap();
//! assert!(text.contains("bindconf_commits_total"));
//! ```

use prometheus::{CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};
use std::sync::LazyLock;
use std::time::Duration;

// ============================================================================
// Metric Name Constants
// ============================================================================

/// Namespace prefix for all bindconf metrics
const METRICS_NAMESPACE: &str = "bindconf";

// ============================================================================
// Global Metrics Registry
// ============================================================================

/// Global Prometheus metrics registry
///
/// All metrics are registered in this registry and exposed via `/metrics` endpoint.
pub static METRICS_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// ============================================================================
// Validation Metrics
// ============================================================================

/// Total number of checker runs by verdict
///
/// Labels:
/// - `result`: `valid`, `invalid` or `timeout`
pub static VALIDATIONS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_validations_total"),
        "Total number of configuration checker runs by result",
    );
    let counter = CounterVec::new(opts, &["result"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Duration of checker runs in seconds
///
/// Labels:
/// - `result`: `valid`, `invalid` or `timeout`
pub static VALIDATION_DURATION_SECONDS: LazyLock<HistogramVec> = LazyLock::new(|| {
    let opts = HistogramOpts::new(
        format!("{METRICS_NAMESPACE}_validation_duration_seconds"),
        "Duration of configuration checker runs in seconds",
    )
    .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.0, 5.0, 10.0]);
    let histogram = HistogramVec::new(opts, &["result"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(histogram.clone()))
        .unwrap();
    histogram
});

// ============================================================================
// Commit Metrics
// ============================================================================

/// Total number of configuration commits by outcome
///
/// Labels:
/// - `status`: `success`, `rejected`, `error` or `reload_failed`
pub static COMMITS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_commits_total"),
        "Total number of configuration commits by outcome",
    );
    let counter = CounterVec::new(opts, &["status"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Backup Metrics
// ============================================================================

/// Total number of backup operations
///
/// Labels:
/// - `operation`: `snapshot`, `restore`, `delete` or `prune`
/// - `status`: `success` or `error`
pub static BACKUP_OPERATIONS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_backup_operations_total"),
        "Total number of backup operations by operation and status",
    );
    let counter = CounterVec::new(opts, &["operation", "status"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Daemon Metrics
// ============================================================================

/// Total number of daemon control commands
///
/// Labels:
/// - `command`: `start`, `stop`, `reload` or `status`
/// - `status`: `success` or `error`
pub static DAEMON_COMMANDS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_daemon_commands_total"),
        "Total number of BIND9 daemon control commands by command and status",
    );
    let counter = CounterVec::new(opts, &["command", "status"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Helper Functions
// ============================================================================

/// Record a checker run
///
/// # Arguments
/// * `result` - `valid`, `invalid` or `timeout`
/// * `duration` - Wall-clock time of the run
pub fn record_validation(result: &str, duration: Duration) {
    VALIDATIONS_TOTAL.with_label_values(&[result]).inc();
    VALIDATION_DURATION_SECONDS
        .with_label_values(&[result])
        .observe(duration.as_secs_f64());
}

/// Record the outcome of a commit
pub fn record_commit(status: &str) {
    COMMITS_TOTAL.with_label_values(&[status]).inc();
}

/// Record a backup operation
///
/// # Arguments
/// * `operation` - `snapshot`, `restore`, `delete` or `prune`
/// * `success` - Whether the operation succeeded
pub fn record_backup_operation(operation: &str, success: bool) {
    BACKUP_OPERATIONS_TOTAL
        .with_label_values(&[operation, status_label(success)])
        .inc();
}

/// Record a daemon control command
pub fn record_daemon_command(command: &str, success: bool) {
    DAEMON_COMMANDS_TOTAL
        .with_label_values(&[command, status_label(success)])
        .inc();
}

fn status_label(success: bool) -> &'static str {
    if success {
        "success"
    } else {
        "error"
    }
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
