//! Metrics sink abstraction.
//!
//! The hub and the generator receive the sink as an injected capability
//! instead of touching the process-wide recorder, so tests can substitute
//! a no-op or a recording implementation.

use crate::order::OrderStatus;
use metrics::{counter, gauge, histogram};

/// Counter, gauge, and histogram updates emitted by the core components.
pub trait MetricsSink: Send + Sync + 'static {
    /// One order was generated, tagged with its status.
    fn order_processed(&self, status: OrderStatus);

    /// A synthetic processing latency sample, in seconds.
    fn latency_observed(&self, seconds: f64);

    /// A viewer connection was registered.
    fn viewer_connected(&self);

    /// A viewer connection was removed.
    fn viewer_disconnected(&self);

    /// A broadcast write to one viewer failed.
    fn delivery_failed(&self);

    /// A publish to the external order channel failed.
    fn publish_failed(&self);
}

/// Sink backed by the `metrics` facade, exported in Prometheus text format.
pub struct PrometheusMetrics;

impl MetricsSink for PrometheusMetrics {
    fn order_processed(&self, status: OrderStatus) {
        counter!("orders_total", "status" => status.as_str()).increment(1);
    }

    fn latency_observed(&self, seconds: f64) {
        histogram!("order_processing_latency_seconds").record(seconds);
    }

    fn viewer_connected(&self) {
        counter!("websocket_connections_total").increment(1);
        gauge!("websocket_connections_active").increment(1.0);
    }

    fn viewer_disconnected(&self) {
        gauge!("websocket_connections_active").decrement(1.0);
    }

    fn delivery_failed(&self) {
        counter!("websocket_delivery_failures_total").increment(1);
    }

    fn publish_failed(&self) {
        counter!("order_publish_failures_total").increment(1);
    }
}

/// Sink that records nothing.
pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {
    fn order_processed(&self, _status: OrderStatus) {}
    fn latency_observed(&self, _seconds: f64) {}
    fn viewer_connected(&self) {}
    fn viewer_disconnected(&self) {}
    fn delivery_failed(&self) {}
    fn publish_failed(&self) {}
}
