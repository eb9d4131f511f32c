//! Order domain types and statistics accumulation.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Lifecycle status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl OrderStatus {
    /// All statuses, in wire order.
    pub const ALL: [OrderStatus; 4] = [
        OrderStatus::Pending,
        OrderStatus::Processing,
        OrderStatus::Completed,
        OrderStatus::Failed,
    ];

    /// Lowercase label used on the wire and as the metrics `status` label.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Completed => "completed",
            OrderStatus::Failed => "failed",
        }
    }
}

/// A single order event. Immutable once created; not retained after dispatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub customer: String,
    pub amount: f64,
    pub status: OrderStatus,
    pub timestamp: DateTime<Utc>,
}

impl Order {
    /// Synthesize an order with a time-derived id and random fields.
    /// Stand-in for a real upstream order feed.
    pub fn synthesize<R: Rng>(rng: &mut R) -> Self {
        let now = Utc::now();
        Self {
            id: format!("order_{}", now.timestamp_millis()),
            customer: format!("customer_{}", rng.gen_range(0..100)),
            amount: rng.gen_range(0.0..1000.0),
            status: OrderStatus::ALL[rng.gen_range(0..OrderStatus::ALL.len())],
            timestamp: now,
        }
    }
}

/// Point-in-time statistics broadcast to viewers as one JSON text frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub total_orders: u64,
    pub total_revenue: f64,
    pub active_orders: u64,
    pub average_order: f64,
    pub error_rate: f64,
    pub queue_depth: u64,
}

/// Running totals folded from every generated order.
///
/// Snapshots are derived from these scalars; no order history is kept.
#[derive(Debug, Default)]
pub struct StatsAccumulator {
    total_orders: u64,
    total_revenue: f64,
    pending: u64,
    processing: u64,
    failed: u64,
}

impl StatsAccumulator {
    /// Create an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one order into the running totals.
    pub fn record(&mut self, order: &Order) {
        self.total_orders += 1;
        self.total_revenue += order.amount;
        match order.status {
            OrderStatus::Pending => self.pending += 1,
            OrderStatus::Processing => self.processing += 1,
            OrderStatus::Failed => self.failed += 1,
            OrderStatus::Completed => {}
        }
    }

    /// Derive a snapshot of the current totals.
    ///
    /// `error_rate` is failed/total, so it stays in [0, 1] for any input.
    pub fn snapshot(&self) -> StatsSnapshot {
        let (average_order, error_rate) = if self.total_orders == 0 {
            (0.0, 0.0)
        } else {
            (
                self.total_revenue / self.total_orders as f64,
                self.failed as f64 / self.total_orders as f64,
            )
        };

        StatsSnapshot {
            total_orders: self.total_orders,
            total_revenue: self.total_revenue,
            active_orders: self.pending + self.processing,
            average_order,
            error_rate,
            queue_depth: self.pending,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn make_order(amount: f64, status: OrderStatus) -> Order {
        Order {
            id: "order_1".to_string(),
            customer: "customer_1".to_string(),
            amount,
            status,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_status_wire_labels() {
        assert_eq!(
            serde_json::to_string(&OrderStatus::Pending).unwrap(),
            "\"pending\""
        );
        assert_eq!(
            serde_json::to_string(&OrderStatus::Failed).unwrap(),
            "\"failed\""
        );
        for status in OrderStatus::ALL {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
            let back: OrderStatus = serde_json::from_str(&json).unwrap();
            assert_eq!(back, status);
        }
    }

    #[test]
    fn test_order_wire_format() {
        let order = make_order(42.5, OrderStatus::Processing);
        let json = serde_json::to_string(&order).unwrap();
        assert!(json.contains("\"id\":\"order_1\""));
        assert!(json.contains("\"customer\":\"customer_1\""));
        assert!(json.contains("\"amount\":42.5"));
        assert!(json.contains("\"status\":\"processing\""));
        assert!(json.contains("\"timestamp\""));
    }

    #[test]
    fn test_synthesize_ranges() {
        let mut rng = rand::thread_rng();
        for _ in 0..100 {
            let order = Order::synthesize(&mut rng);
            assert!(order.id.starts_with("order_"));
            assert!(order.customer.starts_with("customer_"));
            assert!(order.amount >= 0.0 && order.amount < 1000.0);
            assert!(OrderStatus::ALL.contains(&order.status));
        }
    }

    #[test]
    fn test_empty_accumulator_snapshot() {
        let snapshot = StatsAccumulator::new().snapshot();
        assert_eq!(snapshot.total_orders, 0);
        assert_eq!(snapshot.total_revenue, 0.0);
        assert_eq!(snapshot.active_orders, 0);
        assert_eq!(snapshot.average_order, 0.0);
        assert_eq!(snapshot.error_rate, 0.0);
        assert_eq!(snapshot.queue_depth, 0);
    }

    #[test]
    fn test_accumulator_totals() {
        let mut stats = StatsAccumulator::new();
        stats.record(&make_order(100.0, OrderStatus::Pending));
        stats.record(&make_order(200.0, OrderStatus::Processing));
        stats.record(&make_order(300.0, OrderStatus::Completed));
        stats.record(&make_order(400.0, OrderStatus::Failed));

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.total_orders, 4);
        assert_eq!(snapshot.total_revenue, 1000.0);
        assert_eq!(snapshot.average_order, 250.0);
        assert_eq!(snapshot.active_orders, 2); // pending + processing
        assert_eq!(snapshot.error_rate, 0.25);
        assert_eq!(snapshot.queue_depth, 1); // pending only
    }

    #[test]
    fn test_error_rate_bounds() {
        let mut rng = rand::thread_rng();
        let mut stats = StatsAccumulator::new();
        for _ in 0..100 {
            stats.record(&Order::synthesize(&mut rng));
            let snapshot = stats.snapshot();
            assert!(snapshot.error_rate >= 0.0 && snapshot.error_rate <= 1.0);
            assert!(snapshot.queue_depth <= snapshot.total_orders);
            assert!(snapshot.active_orders <= snapshot.total_orders);
        }
    }
}
