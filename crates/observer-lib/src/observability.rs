//! Observability infrastructure for the cluster observer
//!
//! Prometheus metrics for the reconciliation core: event throughput, feed
//! connectivity, snapshot latency, and store sizes.

use crate::notify::{ChangeAction, ResourceKind};
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Histogram, IntCounter, IntCounterVec, IntGauge,
};
use std::sync::OnceLock;

/// Histogram buckets for snapshot fetch latency (in seconds)
const SNAPSHOT_LATENCY_BUCKETS: &[f64] = &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<ObserverMetricsInner> = OnceLock::new();

/// Inner metrics structure that holds the actual Prometheus metrics
struct ObserverMetricsInner {
    events_applied: IntCounterVec,
    feed_disconnects: IntCounter,
    feed_connected: IntGauge,
    snapshot_latency_seconds: Histogram,
    store_nodes: IntGauge,
    store_pods: IntGauge,
}

impl ObserverMetricsInner {
    fn new() -> Self {
        Self {
            events_applied: register_int_counter_vec!(
                "cluster_observer_events_applied_total",
                "Change events applied to the reconciliation store",
                &["kind", "action"]
            )
            .expect("Failed to register events_applied_total"),

            feed_disconnects: register_int_counter!(
                "cluster_observer_feed_disconnects_total",
                "Times the event feed connection was lost"
            )
            .expect("Failed to register feed_disconnects_total"),

            feed_connected: register_int_gauge!(
                "cluster_observer_feed_connected",
                "Whether the event feed is currently connected (1) or not (0)"
            )
            .expect("Failed to register feed_connected"),

            snapshot_latency_seconds: register_histogram!(
                "cluster_observer_snapshot_latency_seconds",
                "Time spent fetching a full cluster snapshot",
                SNAPSHOT_LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register snapshot_latency_seconds"),

            store_nodes: register_int_gauge!(
                "cluster_observer_store_nodes",
                "Nodes currently held in the reconciliation store"
            )
            .expect("Failed to register store_nodes"),

            store_pods: register_int_gauge!(
                "cluster_observer_store_pods",
                "Pods currently held in the reconciliation store"
            )
            .expect("Failed to register store_pods"),
        }
    }
}

/// Observer metrics for Prometheus exposition
///
/// This is a lightweight handle to the global metrics instance.
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct ObserverMetrics {
    _private: (),
}

impl Default for ObserverMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ObserverMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(ObserverMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &ObserverMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    /// Count one applied change event
    pub fn inc_event_applied(&self, kind: ResourceKind, action: ChangeAction) {
        self.inner()
            .events_applied
            .with_label_values(&[kind.as_str(), action.as_str()])
            .inc();
    }

    /// Count one lost feed connection
    pub fn inc_feed_disconnects(&self) {
        self.inner().feed_disconnects.inc();
    }

    /// Update the feed connectivity gauge
    pub fn set_feed_connected(&self, connected: bool) {
        self.inner().feed_connected.set(i64::from(connected));
    }

    /// Record a snapshot fetch latency observation
    pub fn observe_snapshot_latency(&self, duration_secs: f64) {
        self.inner().snapshot_latency_seconds.observe(duration_secs);
    }

    /// Update store size gauges
    pub fn set_store_sizes(&self, nodes: i64, pods: i64) {
        self.inner().store_nodes.set(nodes);
        self.inner().store_pods.set(pods);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observer_metrics_creation() {
        // Metrics share one process-global registry; exercise the handle.
        let metrics = ObserverMetrics::new();

        metrics.inc_event_applied(ResourceKind::Pod, ChangeAction::Created);
        metrics.inc_feed_disconnects();
        metrics.set_feed_connected(true);
        metrics.observe_snapshot_latency(0.05);
        metrics.set_store_sizes(3, 12);
    }
}
