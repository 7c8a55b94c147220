//! Score records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One judge's value for one criterion of one submission in one round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Score {
    pub hackathon_id: Uuid,
    pub round_index: i32,
    pub submission_id: Uuid,
    pub judge_id: Uuid,
    pub criterion_id: String,
    pub value: f64,
    pub scored_at: DateTime<Utc>,
}
