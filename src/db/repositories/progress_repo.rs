//! Round progress and winner repository

use chrono::{DateTime, Utc};
use sqlx::{types::Json, FromRow, PgPool};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{RoundProgress, Winner, WinnerBoard},
};

const PROGRESS_COLUMNS: &str = "hackathon_id, round_index, shortlisted_submissions, \
    shortlisted_teams, eligible_participants, eligible_teams, round_completed, \
    next_round_eligibility, shortlisted_at, shortlisted_by, shortlist_revision, progressed_at, \
    version, updated_at";

#[derive(FromRow)]
struct WinnerRow {
    hackathon_id: Uuid,
    round_index: i32,
    winners: Json<Vec<Winner>>,
    assigned_at: DateTime<Utc>,
    assigned_by: Uuid,
    notified_fingerprint: Option<String>,
    notified_at: Option<DateTime<Utc>>,
    version: i64,
}

impl From<WinnerRow> for WinnerBoard {
    fn from(row: WinnerRow) -> Self {
        WinnerBoard {
            hackathon_id: row.hackathon_id,
            round_index: row.round_index,
            winners: row.winners.0,
            assigned_at: row.assigned_at,
            assigned_by: row.assigned_by,
            notified_fingerprint: row.notified_fingerprint,
            notified_at: row.notified_at,
            version: row.version,
        }
    }
}

fn stale(what: &str) -> AppError {
    AppError::Conflict(format!("{} was modified concurrently, reload and retry", what))
}

/// Repository for round progression state
pub struct ProgressRepository;

impl ProgressRepository {
    pub async fn find(
        pool: &PgPool,
        hackathon_id: Uuid,
        round_index: i32,
    ) -> AppResult<Option<RoundProgress>> {
        let progress = sqlx::query_as::<_, RoundProgress>(&format!(
            "SELECT {} FROM round_progress WHERE hackathon_id = $1 AND round_index = $2",
            PROGRESS_COLUMNS
        ))
        .bind(hackathon_id)
        .bind(round_index)
        .fetch_optional(pool)
        .await?;

        Ok(progress)
    }

    pub async fn list(pool: &PgPool, hackathon_id: Uuid) -> AppResult<Vec<RoundProgress>> {
        let progress = sqlx::query_as::<_, RoundProgress>(&format!(
            "SELECT {} FROM round_progress WHERE hackathon_id = $1 ORDER BY round_index",
            PROGRESS_COLUMNS
        ))
        .bind(hackathon_id)
        .fetch_all(pool)
        .await?;

        Ok(progress)
    }

    /// Insert when `version` is 0, otherwise update only if the stored
    /// version still matches
    pub async fn save(pool: &PgPool, progress: &RoundProgress) -> AppResult<RoundProgress> {
        let query = if progress.version == 0 {
            format!(
                r#"
                INSERT INTO round_progress (
                    hackathon_id, round_index, shortlisted_submissions, shortlisted_teams,
                    eligible_participants, eligible_teams, round_completed,
                    next_round_eligibility, shortlisted_at, shortlisted_by, shortlist_revision,
                    progressed_at, version, updated_at
                )
                VALUES ($1, $2, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $3 + 1, NOW())
                ON CONFLICT (hackathon_id, round_index) DO NOTHING
                RETURNING {}
                "#,
                PROGRESS_COLUMNS
            )
        } else {
            format!(
                r#"
                UPDATE round_progress
                SET shortlisted_submissions = $4, shortlisted_teams = $5,
                    eligible_participants = $6, eligible_teams = $7, round_completed = $8,
                    next_round_eligibility = $9, shortlisted_at = $10, shortlisted_by = $11,
                    shortlist_revision = $12, progressed_at = $13,
                    version = version + 1, updated_at = NOW()
                WHERE hackathon_id = $1 AND round_index = $2 AND version = $3
                RETURNING {}
                "#,
                PROGRESS_COLUMNS
            )
        };

        let stored = sqlx::query_as::<_, RoundProgress>(&query)
            .bind(progress.hackathon_id)
            .bind(progress.round_index)
            .bind(progress.version)
            .bind(&progress.shortlisted_submissions)
            .bind(&progress.shortlisted_teams)
            .bind(&progress.eligible_participants)
            .bind(&progress.eligible_teams)
            .bind(progress.round_completed)
            .bind(progress.next_round_eligibility)
            .bind(progress.shortlisted_at)
            .bind(progress.shortlisted_by)
            .bind(progress.shortlist_revision)
            .bind(progress.progressed_at)
            .fetch_optional(pool)
            .await?;

        stored.ok_or_else(|| stale("Round progress"))
    }

    pub async fn find_winners(pool: &PgPool, hackathon_id: Uuid) -> AppResult<Option<WinnerBoard>> {
        let row = sqlx::query_as::<_, WinnerRow>(
            r#"
            SELECT hackathon_id, round_index, winners, assigned_at, assigned_by,
                   notified_fingerprint, notified_at, version
            FROM hackathon_winners
            WHERE hackathon_id = $1
            "#,
        )
        .bind(hackathon_id)
        .fetch_optional(pool)
        .await?;

        Ok(row.map(WinnerBoard::from))
    }

    /// Same version rules as `save`
    pub async fn save_winners(pool: &PgPool, board: &WinnerBoard) -> AppResult<WinnerBoard> {
        let query = if board.version == 0 {
            r#"
            INSERT INTO hackathon_winners (
                hackathon_id, round_index, winners, assigned_at, assigned_by,
                notified_fingerprint, notified_at, version
            )
            VALUES ($1, $2, $4, $5, $6, $7, $8, $3 + 1)
            ON CONFLICT (hackathon_id) DO NOTHING
            RETURNING hackathon_id, round_index, winners, assigned_at, assigned_by,
                      notified_fingerprint, notified_at, version
            "#
        } else {
            r#"
            UPDATE hackathon_winners
            SET round_index = $2, winners = $4, assigned_at = $5, assigned_by = $6,
                notified_fingerprint = $7, notified_at = $8, version = version + 1
            WHERE hackathon_id = $1 AND version = $3
            RETURNING hackathon_id, round_index, winners, assigned_at, assigned_by,
                      notified_fingerprint, notified_at, version
            "#
        };

        let row = sqlx::query_as::<_, WinnerRow>(query)
            .bind(board.hackathon_id)
            .bind(board.round_index)
            .bind(board.version)
            .bind(Json(&board.winners))
            .bind(board.assigned_at)
            .bind(board.assigned_by)
            .bind(&board.notified_fingerprint)
            .bind(board.notified_at)
            .fetch_optional(pool)
            .await?;

        row.map(WinnerBoard::from).ok_or_else(|| stale("Winner board"))
    }
}
