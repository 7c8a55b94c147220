//! Hackathon, user and team repository

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{types::Json, FromRow, PgPool};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{Hackathon, JudgingCriteria, ProblemStatement, Round, Team, User},
};

#[derive(FromRow)]
struct HackathonRow {
    id: Uuid,
    title: String,
    organizer_id: Uuid,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct RoundRow {
    round_index: i32,
    name: String,
    round_type: Option<String>,
    description: Option<String>,
    start_date: Option<DateTime<Utc>>,
    end_date: Option<DateTime<Utc>>,
    assignment_mode: String,
    judging_criteria: Json<JudgingCriteria>,
}

impl RoundRow {
    fn into_round(self) -> AppResult<Round> {
        Ok(Round {
            index: self.round_index,
            name: self.name,
            round_type: self.round_type,
            description: self.description,
            start_date: self.start_date,
            end_date: self.end_date,
            assignment_mode: self.assignment_mode.parse()?,
            judging_criteria: self.judging_criteria.0,
        })
    }
}

#[derive(FromRow)]
struct ProblemStatementRow {
    ps_index: i32,
    statement: String,
    ps_type: String,
    assignment_mode: String,
}

#[derive(FromRow)]
struct TeamRow {
    id: Uuid,
    hackathon_id: Uuid,
    name: String,
    leader_id: Uuid,
}

/// Repository for the hackathon read model
pub struct HackathonRepository;

impl HackathonRepository {
    /// Load a hackathon with its rounds and problem statements
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> AppResult<Option<Hackathon>> {
        let Some(row) = sqlx::query_as::<_, HackathonRow>(
            r#"
            SELECT id, title, organizer_id, start_date, end_date, created_at, updated_at
            FROM hackathons WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?
        else {
            return Ok(None);
        };

        let rounds = sqlx::query_as::<_, RoundRow>(
            r#"
            SELECT round_index, name, round_type, description, start_date, end_date,
                   assignment_mode, judging_criteria
            FROM hackathon_rounds
            WHERE hackathon_id = $1
            ORDER BY round_index
            "#,
        )
        .bind(id)
        .fetch_all(pool)
        .await?
        .into_iter()
        .map(RoundRow::into_round)
        .collect::<AppResult<Vec<_>>>()?;

        let problem_statements = sqlx::query_as::<_, ProblemStatementRow>(
            r#"
            SELECT ps_index, statement, ps_type, assignment_mode
            FROM problem_statements
            WHERE hackathon_id = $1
            ORDER BY ps_index
            "#,
        )
        .bind(id)
        .fetch_all(pool)
        .await?
        .into_iter()
        .map(|r| {
            Ok(ProblemStatement {
                index: r.ps_index,
                statement: r.statement,
                ps_type: r.ps_type,
                assignment_mode: r.assignment_mode.parse()?,
            })
        })
        .collect::<AppResult<Vec<_>>>()?;

        Ok(Some(Hackathon {
            id: row.id,
            title: row.title,
            organizer_id: row.organizer_id,
            start_date: row.start_date,
            end_date: row.end_date,
            rounds,
            problem_statements,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }))
    }

    /// Persist a round's mode and criteria
    pub async fn update_round(pool: &PgPool, hackathon_id: Uuid, round: &Round) -> AppResult<()> {
        let mut tx = pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE hackathon_rounds
            SET assignment_mode = $3, judging_criteria = $4
            WHERE hackathon_id = $1 AND round_index = $2
            "#,
        )
        .bind(hackathon_id)
        .bind(round.index)
        .bind(round.assignment_mode.to_string())
        .bind(Json(&round.judging_criteria))
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(crate::error::AppError::NotFound(format!(
                "Round {} does not exist",
                round.index
            )));
        }

        sqlx::query(r#"UPDATE hackathons SET updated_at = NOW() WHERE id = $1"#)
            .bind(hackathon_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Persist a problem statement's mode
    pub async fn update_problem_statement(
        pool: &PgPool,
        hackathon_id: Uuid,
        problem_statement: &ProblemStatement,
    ) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE problem_statements
            SET assignment_mode = $3
            WHERE hackathon_id = $1 AND ps_index = $2
            "#,
        )
        .bind(hackathon_id)
        .bind(problem_statement.index)
        .bind(problem_statement.assignment_mode.to_string())
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(crate::error::AppError::NotFound(format!(
                "Problem statement {} does not exist",
                problem_statement.index
            )));
        }
        Ok(())
    }

    /// Find user by ID
    pub async fn find_user(pool: &PgPool, id: Uuid) -> AppResult<Option<User>> {
        let user =
            sqlx::query_as::<_, User>(r#"SELECT id, email, name, role FROM users WHERE id = $1"#)
                .bind(id)
                .fetch_optional(pool)
                .await?;

        Ok(user)
    }

    /// List a hackathon's teams with their members
    pub async fn list_teams(pool: &PgPool, hackathon_id: Uuid) -> AppResult<Vec<Team>> {
        let rows = sqlx::query_as::<_, TeamRow>(
            r#"
            SELECT id, hackathon_id, name, leader_id
            FROM teams
            WHERE hackathon_id = $1
            ORDER BY id
            "#,
        )
        .bind(hackathon_id)
        .fetch_all(pool)
        .await?;

        let members: Vec<(Uuid, Uuid)> = sqlx::query_as(
            r#"
            SELECT tm.team_id, tm.user_id
            FROM team_members tm
            JOIN teams t ON t.id = tm.team_id
            WHERE t.hackathon_id = $1
            ORDER BY tm.user_id
            "#,
        )
        .bind(hackathon_id)
        .fetch_all(pool)
        .await?;

        let mut by_team: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for (team_id, user_id) in members {
            by_team.entry(team_id).or_default().push(user_id);
        }

        Ok(rows
            .into_iter()
            .map(|r| Team {
                members: by_team.remove(&r.id).unwrap_or_default(),
                id: r.id,
                hackathon_id: r.hackathon_id,
                name: r.name,
                leader_id: r.leader_id,
            })
            .collect())
    }
}
