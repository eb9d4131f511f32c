//! Periodic order generation loop.
//!
//! Drives the system heartbeat: once per interval it synthesizes one order,
//! publishes it to the external channel, updates counters, and broadcasts a
//! fresh statistics snapshot to all viewers. Nothing downstream can stall
//! the loop: publish failures are logged and counted, broadcast never
//! blocks on peer I/O.

use crate::error::Result;
use crate::hub::HubHandle;
use crate::metrics::MetricsSink;
use crate::order::{Order, StatsAccumulator};
use crate::redis_client::EventSink;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Default seconds between generation ticks.
pub const DEFAULT_INTERVAL_SECS: u64 = 2;

/// Periodic synthetic order generator.
pub struct OrderGenerator {
    hub: HubHandle,
    sink: Arc<dyn EventSink>,
    metrics: Arc<dyn MetricsSink>,
    stats: StatsAccumulator,
    interval: Duration,
}

impl OrderGenerator {
    /// Create a generator that broadcasts through `hub` and publishes raw
    /// events through `sink`.
    pub fn new(
        hub: HubHandle,
        sink: Arc<dyn EventSink>,
        metrics: Arc<dyn MetricsSink>,
        interval: Duration,
    ) -> Self {
        Self {
            hub,
            sink,
            metrics,
            stats: StatsAccumulator::new(),
            interval,
        }
    }

    /// Run the generation loop until a shutdown signal arrives.
    /// Missed ticks are skipped, not queued.
    pub async fn run(mut self, mut shutdown_rx: mpsc::Receiver<()>) {
        info!("Order generator running ({:?} interval)", self.interval);

        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        ticker.reset(); // Don't fire immediately

        loop {
            tokio::select! {
                biased;

                _ = shutdown_rx.recv() => {
                    info!("Order generator received shutdown signal");
                    break;
                }

                _ = ticker.tick() => {
                    self.tick().await;
                }
            }
        }

        info!("Order generator stopped");
    }

    /// One full generation cycle.
    async fn tick(&mut self) {
        let order = Order::synthesize(&mut rand::thread_rng());
        debug!(
            "Generated {} ({}, {:.2})",
            order.id,
            order.status.as_str(),
            order.amount
        );

        // Best-effort publish: a sink outage must not stall generation.
        if let Err(e) = self.publish_order(&order).await {
            warn!("Failed to publish order {}: {}", order.id, e);
            self.metrics.publish_failed();
        }

        self.metrics.order_processed(order.status);

        let latency_ms = rand::thread_rng().gen_range(0..1000);
        self.metrics
            .latency_observed(Duration::from_millis(latency_ms).as_secs_f64());

        self.stats.record(&order);
        match serde_json::to_string(&self.stats.snapshot()) {
            Ok(json) => self.hub.broadcast(json),
            Err(e) => warn!("Failed to serialize stats snapshot: {}", e),
        }
    }

    /// Serialize one order and hand it to the publish sink.
    async fn publish_order(&self, order: &Order) -> Result<()> {
        let payload = serde_json::to_vec(order)?;
        self.sink.publish(&payload).await
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MonitorError;
    use crate::hub::Hub;
    use crate::metrics::NoopMetrics;
    use crate::order::{OrderStatus, StatsSnapshot};
    use async_trait::async_trait;
    use axum::extract::ws::Message;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Sink that records every call for assertions.
    #[derive(Default)]
    struct RecordingMetrics {
        orders: Mutex<Vec<OrderStatus>>,
        latencies: Mutex<Vec<f64>>,
        publish_failures: AtomicUsize,
    }

    impl MetricsSink for RecordingMetrics {
        fn order_processed(&self, status: OrderStatus) {
            self.orders.lock().unwrap().push(status);
        }
        fn latency_observed(&self, seconds: f64) {
            self.latencies.lock().unwrap().push(seconds);
        }
        fn viewer_connected(&self) {}
        fn viewer_disconnected(&self) {}
        fn delivery_failed(&self) {}
        fn publish_failed(&self) {
            self.publish_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Publish sink that records every payload.
    #[derive(Default)]
    struct RecordingSink {
        payloads: Mutex<Vec<Vec<u8>>>,
    }

    #[async_trait]
    impl EventSink for RecordingSink {
        async fn publish(&self, payload: &[u8]) -> crate::error::Result<()> {
            self.payloads.lock().unwrap().push(payload.to_vec());
            Ok(())
        }
    }

    /// Publish sink that always fails, standing in for an unreachable server.
    struct FailingSink;

    #[async_trait]
    impl EventSink for FailingSink {
        async fn publish(&self, _payload: &[u8]) -> crate::error::Result<()> {
            Err(MonitorError::Internal("sink unavailable".to_string()))
        }
    }

    fn spawn_hub() -> HubHandle {
        let (hub, handle) = Hub::new(Arc::new(NoopMetrics));
        tokio::spawn(hub.run());
        handle
    }

    #[tokio::test]
    async fn test_ten_ticks_update_counters_and_broadcast() {
        let hub = spawn_hub();
        let (tx, mut rx) = mpsc::channel::<Message>(32);
        hub.register(tx);

        let metrics = Arc::new(RecordingMetrics::default());
        let sink = Arc::new(RecordingSink::default());
        let mut generator = OrderGenerator::new(
            hub.clone(),
            sink.clone(),
            metrics.clone(),
            Duration::from_secs(DEFAULT_INTERVAL_SECS),
        );

        for _ in 0..10 {
            generator.tick().await;
        }
        assert_eq!(hub.viewer_count().await, 1);

        // Exactly one counter increment, one latency observation, and one
        // publish per tick.
        let statuses = metrics.orders.lock().unwrap().clone();
        assert_eq!(statuses.len(), 10);
        assert!(statuses.iter().all(|s| OrderStatus::ALL.contains(s)));

        let latencies = metrics.latencies.lock().unwrap().clone();
        assert_eq!(latencies.len(), 10);
        assert!(latencies.iter().all(|l| (0.0..1.0).contains(l)));

        let payloads = sink.payloads.lock().unwrap().clone();
        assert_eq!(payloads.len(), 10);
        for payload in &payloads {
            let order: Order = serde_json::from_slice(payload).unwrap();
            assert!(order.id.starts_with("order_"));
        }

        // Exactly one broadcast per tick, delivered in generation order.
        for i in 1..=10u64 {
            let snapshot: StatsSnapshot = match rx.recv().await {
                Some(Message::Text(text)) => serde_json::from_str(text.as_str()).unwrap(),
                other => panic!("expected text frame, got {:?}", other),
            };
            assert_eq!(snapshot.total_orders, i);
            assert!(snapshot.error_rate >= 0.0 && snapshot.error_rate <= 1.0);
            assert!(snapshot.queue_depth <= snapshot.total_orders);
        }
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_sink_outage_does_not_stall_generation() {
        let hub = spawn_hub();
        let (tx, mut rx) = mpsc::channel::<Message>(8);
        hub.register(tx);

        let metrics = Arc::new(RecordingMetrics::default());
        let mut generator = OrderGenerator::new(
            hub.clone(),
            Arc::new(FailingSink),
            metrics.clone(),
            Duration::from_secs(DEFAULT_INTERVAL_SECS),
        );

        generator.tick().await;
        generator.tick().await;
        assert_eq!(hub.viewer_count().await, 1);

        // Both cycles completed: counters updated, snapshots broadcast,
        // failures counted but not propagated.
        assert_eq!(metrics.publish_failures.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.orders.lock().unwrap().len(), 2);
        assert!(matches!(rx.recv().await, Some(Message::Text(_))));
        assert!(matches!(rx.recv().await, Some(Message::Text(_))));
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown_signal() {
        let hub = spawn_hub();
        let generator = OrderGenerator::new(
            hub,
            Arc::new(RecordingSink::default()),
            Arc::new(NoopMetrics),
            Duration::from_secs(DEFAULT_INTERVAL_SECS),
        );

        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let task = tokio::spawn(generator.run(shutdown_rx));

        shutdown_tx.send(()).await.unwrap();
        task.await.unwrap();
    }
}
