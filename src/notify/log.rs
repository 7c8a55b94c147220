//! Notifier that only writes a log line

use async_trait::async_trait;

use super::{Notification, Notifier};
use crate::error::AppResult;

#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, notification: &Notification) -> AppResult<()> {
        tracing::info!(
            kind = ?notification.kind,
            hackathon_id = %notification.hackathon_id,
            recipients = notification.recipients.len(),
            payload = %notification.payload,
            "Notification"
        );
        Ok(())
    }
}
