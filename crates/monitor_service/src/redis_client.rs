//! Redis publish sink for raw order events.

use crate::error::Result;
use async_trait::async_trait;
use redis::AsyncCommands;
use tracing::debug;

/// Default pub/sub channel for order events.
pub const DEFAULT_ORDERS_CHANNEL: &str = "orders";

/// One-way publish sink for serialized order events.
///
/// Publishing is best-effort: exactly one publish per event, no delivery
/// confirmation, no retry.
#[async_trait]
pub trait EventSink: Send + Sync + 'static {
    /// Publish one payload to the channel.
    async fn publish(&self, payload: &[u8]) -> Result<()>;
}

/// Publishes order events to a Redis pub/sub channel.
#[derive(Clone)]
pub struct RedisPublisher {
    client: redis::Client,
    channel: String,
}

impl RedisPublisher {
    /// Create a publisher for the given server and channel.
    pub fn new(redis_url: &str, channel: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self {
            client,
            channel: channel.to_string(),
        })
    }

    /// Get an async connection.
    async fn get_connection(&self) -> Result<redis::aio::MultiplexedConnection> {
        let conn = self.client.get_multiplexed_async_connection().await?;
        Ok(conn)
    }
}

#[async_trait]
impl EventSink for RedisPublisher {
    async fn publish(&self, payload: &[u8]) -> Result<()> {
        let mut conn = self.get_connection().await?;
        conn.publish::<_, _, ()>(&self.channel, payload).await?;
        debug!("Published {} bytes to '{}'", payload.len(), self.channel);
        Ok(())
    }
}
