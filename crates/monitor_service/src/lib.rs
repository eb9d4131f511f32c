//! Real-time order monitoring service.
//!
//! Generates synthetic order events on a fixed interval, publishes each raw
//! event to a Redis pub/sub channel, exposes Prometheus metrics, and streams
//! aggregate statistics snapshots to WebSocket viewers.
//!
//! ## Architecture
//!
//! ```text
//! OrderGenerator (periodic tick)
//!     ├─→ Redis channel "orders"  (raw events, best-effort)
//!     ├─→ MetricsSink             (counters, latency histogram)
//!     └─→ Hub (single coordinator task owns the viewer set)
//!             └─→ WebSocket viewers (snapshots as JSON text frames)
//! ```
//!
//! All viewer-set access is serialized through the hub's command queue:
//! registration, unregistration, and broadcast never race, and the hub
//! never holds the set across socket I/O.

pub mod error;
pub mod generator;
pub mod hub;
pub mod metrics;
pub mod order;
pub mod redis_client;
pub mod ws_server;

pub use error::{MonitorError, Result};
pub use generator::{OrderGenerator, DEFAULT_INTERVAL_SECS};
pub use hub::{Hub, HubHandle, ViewerId};
pub use metrics::{MetricsSink, NoopMetrics, PrometheusMetrics};
pub use order::{Order, OrderStatus, StatsSnapshot};
pub use redis_client::{EventSink, RedisPublisher, DEFAULT_ORDERS_CHANNEL};
pub use ws_server::{create_router, AppState};
