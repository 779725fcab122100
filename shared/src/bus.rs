//! Pub/sub bus (C4): channel-per-user publish plus pattern-subscribe used by
//! the hub to bridge cross-instance events into local broadcasts. Delivery
//! is best-effort, at-most-once per subscriber.

use crate::cache::CacheKeys;
use crate::error::AppError;
use crate::types::BusMessage;
use crate::Result;
use futures::StreamExt;
use redis::{AsyncCommands, Client};

#[derive(Clone)]
pub struct Bus {
    client: Client,
}

impl Bus {
    pub fn new(redis_url: &str) -> Result<Self> {
        let client = Client::open(redis_url)
            .map_err(|e| AppError::configuration(format!("invalid redis url: {e}")))?;
        Ok(Self { client })
    }

    pub async fn publish(&self, message: &BusMessage) -> Result<()> {
        let channel = CacheKeys::pubsub_channel(message.user_id);
        let payload = serde_json::to_string(message)?;
        let mut conn = self
            .client
            .get_multiplexed_tokio_connection()
            .await
            .map_err(AppError::from)?;
        conn.publish::<_, _, ()>(channel, payload).await?;
        Ok(())
    }

    /// Opens a dedicated pub/sub connection subscribed to `user:*` and
    /// returns each decoded `BusMessage` as it arrives. One task per process
    /// holds this subscription and re-enters the hub's broadcast path for
    /// every message (see `hub::bridge`).
    pub async fn subscribe_pattern(&self) -> Result<impl futures::Stream<Item = BusMessage>> {
        let conn = self.client.get_async_connection().await.map_err(AppError::from)?;
        let mut pubsub = conn.into_pubsub();
        pubsub
            .psubscribe(CacheKeys::pubsub_pattern())
            .await
            .map_err(AppError::from)?;

        let stream = pubsub.into_on_message().filter_map(|msg| async move {
            let payload: String = msg.get_payload().ok()?;
            serde_json::from_str::<BusMessage>(&payload).ok()
        });
        Ok(stream)
    }
}
