//! Submission (project) read model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

/// Project submitted to a hackathon
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub id: Uuid,
    pub hackathon_id: Uuid,
    pub team_id: Option<Uuid>,
    pub submitted_by: Uuid,
    pub title: String,
    pub status: SubmissionStatus,
    /// Round the project was entered into
    pub round_index: i32,
    pub problem_statement_index: Option<i32>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Submission {
    pub fn is_submitted(&self) -> bool {
        self.status == SubmissionStatus::Submitted
    }
}

/// Submission lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    Draft,
    Submitted,
}

impl std::fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Draft => write!(f, "draft"),
            Self::Submitted => write!(f, "submitted"),
        }
    }
}

impl std::str::FromStr for SubmissionStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(Self::Draft),
            "submitted" => Ok(Self::Submitted),
            other => Err(AppError::Database(format!(
                "Unknown submission status '{}'",
                other
            ))),
        }
    }
}
