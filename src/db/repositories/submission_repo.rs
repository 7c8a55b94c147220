//! Submission repository

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::{error::AppResult, models::Submission};

#[derive(FromRow)]
struct SubmissionRow {
    id: Uuid,
    hackathon_id: Uuid,
    team_id: Option<Uuid>,
    submitted_by: Uuid,
    title: String,
    status: String,
    round_index: i32,
    problem_statement_index: Option<i32>,
    submitted_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<SubmissionRow> for Submission {
    type Error = crate::error::AppError;

    fn try_from(row: SubmissionRow) -> Result<Self, Self::Error> {
        Ok(Submission {
            id: row.id,
            hackathon_id: row.hackathon_id,
            team_id: row.team_id,
            submitted_by: row.submitted_by,
            title: row.title,
            status: row.status.parse()?,
            round_index: row.round_index,
            problem_statement_index: row.problem_statement_index,
            submitted_at: row.submitted_at,
            created_at: row.created_at,
        })
    }
}

const COLUMNS: &str = "id, hackathon_id, team_id, submitted_by, title, status, round_index, \
                       problem_statement_index, submitted_at, created_at";

/// Repository for submission lookups
pub struct SubmissionRepository;

impl SubmissionRepository {
    /// Find submission by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> AppResult<Option<Submission>> {
        let row = sqlx::query_as::<_, SubmissionRow>(&format!(
            "SELECT {} FROM submissions WHERE id = $1",
            COLUMNS
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        row.map(Submission::try_from).transpose()
    }

    /// All submissions of a hackathon, any status
    pub async fn list_by_hackathon(
        pool: &PgPool,
        hackathon_id: Uuid,
    ) -> AppResult<Vec<Submission>> {
        sqlx::query_as::<_, SubmissionRow>(&format!(
            "SELECT {} FROM submissions WHERE hackathon_id = $1 ORDER BY id",
            COLUMNS
        ))
        .bind(hackathon_id)
        .fetch_all(pool)
        .await?
        .into_iter()
        .map(Submission::try_from)
        .collect()
    }
}
