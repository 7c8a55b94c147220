//! Score repository

use sqlx::PgPool;
use uuid::Uuid;

use crate::{error::AppResult, models::Score};

/// Repository for score records
pub struct ScoreRepository;

impl ScoreRepository {
    /// Scores of every judge for a round
    pub async fn list_by_round(
        pool: &PgPool,
        hackathon_id: Uuid,
        round_index: i32,
    ) -> AppResult<Vec<Score>> {
        let scores = sqlx::query_as::<_, Score>(
            r#"
            SELECT hackathon_id, round_index, submission_id, judge_id, criterion_id, value, scored_at
            FROM scores
            WHERE hackathon_id = $1 AND round_index = $2
            ORDER BY submission_id, judge_id, criterion_id
            "#,
        )
        .bind(hackathon_id)
        .bind(round_index)
        .fetch_all(pool)
        .await?;

        Ok(scores)
    }

    /// Number of score records in a round
    pub async fn count_by_round(
        pool: &PgPool,
        hackathon_id: Uuid,
        round_index: i32,
    ) -> AppResult<i64> {
        let count: (i64,) = sqlx::query_as(
            r#"SELECT COUNT(*) FROM scores WHERE hackathon_id = $1 AND round_index = $2"#,
        )
        .bind(hackathon_id)
        .bind(round_index)
        .fetch_one(pool)
        .await?;

        Ok(count.0)
    }

    /// Replace one judge's scores for a submission atomically
    pub async fn replace(
        pool: &PgPool,
        hackathon_id: Uuid,
        round_index: i32,
        submission_id: Uuid,
        judge_id: Uuid,
        scores: &[Score],
    ) -> AppResult<()> {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r#"
            DELETE FROM scores
            WHERE hackathon_id = $1 AND round_index = $2 AND submission_id = $3 AND judge_id = $4
            "#,
        )
        .bind(hackathon_id)
        .bind(round_index)
        .bind(submission_id)
        .bind(judge_id)
        .execute(&mut *tx)
        .await?;

        for score in scores {
            sqlx::query(
                r#"
                INSERT INTO scores (
                    hackathon_id, round_index, submission_id, judge_id, criterion_id, value, scored_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(score.hackathon_id)
            .bind(score.round_index)
            .bind(score.submission_id)
            .bind(score.judge_id)
            .bind(&score.criterion_id)
            .bind(score.value)
            .bind(score.scored_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}
