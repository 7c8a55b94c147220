//! Judge assignment repository

use chrono::{DateTime, Utc};
use sqlx::{types::Json, FromRow, PgPool};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{JudgeAssignment, ScopedSubmission},
};

#[derive(FromRow)]
struct AssignmentRow {
    id: Uuid,
    hackathon_id: Uuid,
    judge_id: Uuid,
    judge_email: Option<String>,
    status: String,
    rounds: Vec<i32>,
    problem_statements: Vec<i32>,
    assigned_teams: Vec<Uuid>,
    assigned_submissions: Json<Vec<ScopedSubmission>>,
    version: i64,
    invited_at: DateTime<Utc>,
    responded_at: Option<DateTime<Utc>>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<AssignmentRow> for JudgeAssignment {
    type Error = AppError;

    fn try_from(row: AssignmentRow) -> Result<Self, Self::Error> {
        Ok(JudgeAssignment {
            id: row.id,
            hackathon_id: row.hackathon_id,
            judge_id: row.judge_id,
            judge_email: row.judge_email,
            status: row.status.parse()?,
            rounds: row.rounds,
            problem_statements: row.problem_statements,
            assigned_teams: row.assigned_teams,
            assigned_submissions: row.assigned_submissions.0,
            version: row.version,
            invited_at: row.invited_at,
            responded_at: row.responded_at,
            updated_at: row.updated_at,
        })
    }
}

const COLUMNS: &str = "id, hackathon_id, judge_id, judge_email, status, rounds, \
                       problem_statements, assigned_teams, assigned_submissions, version, \
                       invited_at, responded_at, updated_at";

/// Repository for judge assignment operations
pub struct AssignmentRepository;

impl AssignmentRepository {
    /// Find assignment by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> AppResult<Option<JudgeAssignment>> {
        let row = sqlx::query_as::<_, AssignmentRow>(&format!(
            "SELECT {} FROM judge_assignments WHERE id = $1",
            COLUMNS
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        row.map(JudgeAssignment::try_from).transpose()
    }

    /// All assignments of a hackathon
    pub async fn list_by_hackathon(
        pool: &PgPool,
        hackathon_id: Uuid,
    ) -> AppResult<Vec<JudgeAssignment>> {
        sqlx::query_as::<_, AssignmentRow>(&format!(
            "SELECT {} FROM judge_assignments WHERE hackathon_id = $1 ORDER BY invited_at, id",
            COLUMNS
        ))
        .bind(hackathon_id)
        .fetch_all(pool)
        .await?
        .into_iter()
        .map(JudgeAssignment::try_from)
        .collect()
    }

    /// All assignments of a judge across hackathons
    pub async fn list_by_judge(pool: &PgPool, judge_id: Uuid) -> AppResult<Vec<JudgeAssignment>> {
        sqlx::query_as::<_, AssignmentRow>(&format!(
            "SELECT {} FROM judge_assignments WHERE judge_id = $1 ORDER BY invited_at, id",
            COLUMNS
        ))
        .bind(judge_id)
        .fetch_all(pool)
        .await?
        .into_iter()
        .map(JudgeAssignment::try_from)
        .collect()
    }

    /// Insert a new assignment; the (hackathon, judge) unique key turns a
    /// concurrent duplicate into `Conflict`
    pub async fn create(pool: &PgPool, assignment: &JudgeAssignment) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO judge_assignments (
                id, hackathon_id, judge_id, judge_email, status, rounds, problem_statements,
                assigned_teams, assigned_submissions, version, invited_at, responded_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 1, $10, $11, $12)
            "#,
        )
        .bind(assignment.id)
        .bind(assignment.hackathon_id)
        .bind(assignment.judge_id)
        .bind(&assignment.judge_email)
        .bind(assignment.status.to_string())
        .bind(&assignment.rounds)
        .bind(&assignment.problem_statements)
        .bind(&assignment.assigned_teams)
        .bind(Json(&assignment.assigned_submissions))
        .bind(assignment.invited_at)
        .bind(assignment.responded_at)
        .bind(assignment.updated_at)
        .execute(pool)
        .await
        .map_err(|e| match AppError::from(e) {
            AppError::AlreadyExists(_) => AppError::Conflict(
                "Judge already has an assignment for this hackathon".to_string(),
            ),
            other => other,
        })?;

        Ok(())
    }

    /// Version-checked update of several assignments in one transaction
    pub async fn update_batch(
        pool: &PgPool,
        assignments: &[JudgeAssignment],
    ) -> AppResult<Vec<JudgeAssignment>> {
        let mut tx = pool.begin().await?;
        let mut saved = Vec::with_capacity(assignments.len());

        for assignment in assignments {
            let row = sqlx::query_as::<_, AssignmentRow>(&format!(
                r#"
                UPDATE judge_assignments
                SET status = $3, rounds = $4, problem_statements = $5, assigned_teams = $6,
                    assigned_submissions = $7, responded_at = $8, judge_email = $9,
                    version = version + 1, updated_at = NOW()
                WHERE id = $1 AND version = $2
                RETURNING {}
                "#,
                COLUMNS
            ))
            .bind(assignment.id)
            .bind(assignment.version)
            .bind(assignment.status.to_string())
            .bind(&assignment.rounds)
            .bind(&assignment.problem_statements)
            .bind(&assignment.assigned_teams)
            .bind(Json(&assignment.assigned_submissions))
            .bind(assignment.responded_at)
            .bind(&assignment.judge_email)
            .fetch_optional(&mut *tx)
            .await?;

            // Dropping the transaction rolls back everything written so far
            let row = row.ok_or_else(|| {
                AppError::Conflict(
                    "Judge assignment was modified concurrently, reload and retry".to_string(),
                )
            })?;
            saved.push(JudgeAssignment::try_from(row)?);
        }

        tx.commit().await?;
        Ok(saved)
    }

    /// Delete assignments by ID
    pub async fn delete_many(pool: &PgPool, ids: &[Uuid]) -> AppResult<u64> {
        let result = sqlx::query(r#"DELETE FROM judge_assignments WHERE id = ANY($1)"#)
            .bind(ids)
            .execute(pool)
            .await?;

        Ok(result.rows_affected())
    }
}
