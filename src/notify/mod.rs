//! Outbound notifications
//!
//! State changes emit a `Notification` after they are committed. Delivery
//! is best effort and bounded by the configured timeout: a slow or failing
//! backend is logged and never rolls anything back. `dispatch` is the strict
//! variant used when the caller explicitly asked for a send.

pub mod log;
pub mod redis;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

pub use self::log::LogNotifier;
pub use self::redis::RedisNotifier;

/// What happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    JudgeInvited,
    AssignmentResponded,
    SubmissionsAssigned,
    ScoreRecorded,
    ShortlistPublished,
    RoundProgressed,
    WinnersAnnounced,
}

/// One event for a set of recipients
#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub kind: EventKind,
    pub hackathon_id: Uuid,
    pub recipients: Vec<Uuid>,
    pub payload: serde_json::Value,
    pub emitted_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(
        kind: EventKind,
        hackathon_id: Uuid,
        recipients: Vec<Uuid>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            kind,
            hackathon_id,
            recipients,
            payload,
            emitted_at: Utc::now(),
        }
    }
}

/// Delivery backend
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: &Notification) -> AppResult<()>;
}

/// Deliver or fail; used for explicit sends
pub async fn dispatch(
    notifier: &dyn Notifier,
    timeout: Duration,
    notification: &Notification,
) -> AppResult<()> {
    match tokio::time::timeout(timeout, notifier.send(notification)).await {
        Ok(result) => result,
        Err(_) => Err(AppError::Timeout(format!(
            "notification {:?}",
            notification.kind
        ))),
    }
}

/// Fire-and-log delivery after a committed state change
pub async fn emit(notifier: &dyn Notifier, timeout: Duration, notification: Notification) {
    if notification.recipients.is_empty() {
        return;
    }
    if let Err(e) = dispatch(notifier, timeout, &notification).await {
        tracing::warn!(
            kind = ?notification.kind,
            hackathon_id = %notification.hackathon_id,
            recipients = notification.recipients.len(),
            error = %e,
            "Notification not delivered"
        );
    }
}
