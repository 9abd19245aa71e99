//! Metrics for store observability.
//!
//! The store records through the `metrics` facade. Nothing is exported
//! unless the host application installs a recorder; without one every
//! call here is a no-op.
//!
//! # Example
//!
//! ```
//! use reactive_store_runtime::metrics::register_metrics;
//!
//! // Call once after installing a recorder so exporters get descriptions
//! register_metrics();
//! ```

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use std::time::Duration;

/// Register all metric descriptions.
pub fn register_metrics() {
    describe_counter!(
        "store_actions_total",
        "Total number of actions dispatched through stores"
    );
    describe_histogram!(
        "store_reducer_duration_seconds",
        "Time taken to run the reducer for one action"
    );
    describe_counter!(
        "store_notifications_total",
        "Total number of observer invocations"
    );
    describe_counter!(
        "store_notifications_skipped_total",
        "Dispatches that left state unchanged and were not broadcast"
    );
    describe_gauge!(
        "store_subscribers",
        "Observers currently registered with a store"
    );
}

/// Store metrics recorder.
pub struct StoreMetrics;

impl StoreMetrics {
    /// Record one reducer run.
    pub fn record_action(duration: Duration) {
        counter!("store_actions_total").increment(1);
        histogram!("store_reducer_duration_seconds").record(duration.as_secs_f64());
    }

    /// Record a broadcast that reached `observers` observers.
    pub fn record_notification(observers: usize) {
        counter!("store_notifications_total").increment(observers as u64);
    }

    /// Record a broadcast suppressed by `NotifyPolicy::OnChange`.
    pub fn record_skipped_notification() {
        counter!("store_notifications_skipped_total").increment(1);
    }

    /// Record the current number of observers.
    pub fn record_subscribers(count: usize) {
        // Precision loss acceptable for metrics (observer counts < 2^52)
        #[allow(clippy::cast_precision_loss)]
        gauge!("store_subscribers").set(count as f64);
    }
}
