//! Notifier publishing JSON events on a Redis channel

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use super::{Notification, Notifier};
use crate::error::{AppError, AppResult};

/// Publishes each notification to `channel`; mail and in-app delivery
/// subscribe downstream
#[derive(Clone)]
pub struct RedisNotifier {
    redis: ConnectionManager,
    channel: String,
}

impl RedisNotifier {
    pub fn new(redis: ConnectionManager, channel: impl Into<String>) -> Self {
        Self {
            redis,
            channel: channel.into(),
        }
    }
}

#[async_trait]
impl Notifier for RedisNotifier {
    async fn send(&self, notification: &Notification) -> AppResult<()> {
        let message = serde_json::to_string(notification)?;
        let mut redis = self.redis.clone();
        let receivers: i64 = redis
            .publish(&self.channel, message)
            .await
            .map_err(|e| AppError::Notification(e.to_string()))?;

        tracing::debug!(
            kind = ?notification.kind,
            channel = %self.channel,
            receivers,
            "Published notification"
        );
        Ok(())
    }
}
