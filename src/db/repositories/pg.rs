//! Postgres-backed `EngineRepository`

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{
    AssignmentRepository, EngineRepository, HackathonRepository, ProgressRepository,
    ScoreRepository, SubmissionRepository,
};
use crate::{
    error::AppResult,
    models::{
        Hackathon, JudgeAssignment, ProblemStatement, Round, RoundProgress, Score, Submission,
        Team, User, WinnerBoard,
    },
};

pub struct PgEngineRepository {
    pool: PgPool,
}

impl PgEngineRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl EngineRepository for PgEngineRepository {
    async fn find_hackathon(&self, id: Uuid) -> AppResult<Option<Hackathon>> {
        HackathonRepository::find_by_id(&self.pool, id).await
    }

    async fn update_round(&self, hackathon_id: Uuid, round: &Round) -> AppResult<()> {
        HackathonRepository::update_round(&self.pool, hackathon_id, round).await
    }

    async fn update_problem_statement(
        &self,
        hackathon_id: Uuid,
        problem_statement: &ProblemStatement,
    ) -> AppResult<()> {
        HackathonRepository::update_problem_statement(&self.pool, hackathon_id, problem_statement)
            .await
    }

    async fn find_user(&self, id: Uuid) -> AppResult<Option<User>> {
        HackathonRepository::find_user(&self.pool, id).await
    }

    async fn list_teams(&self, hackathon_id: Uuid) -> AppResult<Vec<Team>> {
        HackathonRepository::list_teams(&self.pool, hackathon_id).await
    }

    async fn find_submission(&self, id: Uuid) -> AppResult<Option<Submission>> {
        SubmissionRepository::find_by_id(&self.pool, id).await
    }

    async fn list_submissions(&self, hackathon_id: Uuid) -> AppResult<Vec<Submission>> {
        SubmissionRepository::list_by_hackathon(&self.pool, hackathon_id).await
    }

    async fn find_assignment(&self, id: Uuid) -> AppResult<Option<JudgeAssignment>> {
        AssignmentRepository::find_by_id(&self.pool, id).await
    }

    async fn list_assignments(&self, hackathon_id: Uuid) -> AppResult<Vec<JudgeAssignment>> {
        AssignmentRepository::list_by_hackathon(&self.pool, hackathon_id).await
    }

    async fn list_assignments_for_judge(&self, judge_id: Uuid) -> AppResult<Vec<JudgeAssignment>> {
        AssignmentRepository::list_by_judge(&self.pool, judge_id).await
    }

    async fn insert_assignment(&self, assignment: &JudgeAssignment) -> AppResult<()> {
        AssignmentRepository::create(&self.pool, assignment).await
    }

    async fn save_assignments(
        &self,
        assignments: &[JudgeAssignment],
    ) -> AppResult<Vec<JudgeAssignment>> {
        AssignmentRepository::update_batch(&self.pool, assignments).await
    }

    async fn delete_assignments(&self, ids: &[Uuid]) -> AppResult<u64> {
        AssignmentRepository::delete_many(&self.pool, ids).await
    }

    async fn list_scores(&self, hackathon_id: Uuid, round_index: i32) -> AppResult<Vec<Score>> {
        ScoreRepository::list_by_round(&self.pool, hackathon_id, round_index).await
    }

    async fn count_scores(&self, hackathon_id: Uuid, round_index: i32) -> AppResult<i64> {
        ScoreRepository::count_by_round(&self.pool, hackathon_id, round_index).await
    }

    async fn replace_scores(
        &self,
        hackathon_id: Uuid,
        round_index: i32,
        submission_id: Uuid,
        judge_id: Uuid,
        scores: &[Score],
    ) -> AppResult<()> {
        ScoreRepository::replace(
            &self.pool,
            hackathon_id,
            round_index,
            submission_id,
            judge_id,
            scores,
        )
        .await
    }

    async fn find_round_progress(
        &self,
        hackathon_id: Uuid,
        round_index: i32,
    ) -> AppResult<Option<RoundProgress>> {
        ProgressRepository::find(&self.pool, hackathon_id, round_index).await
    }

    async fn list_round_progress(&self, hackathon_id: Uuid) -> AppResult<Vec<RoundProgress>> {
        ProgressRepository::list(&self.pool, hackathon_id).await
    }

    async fn save_round_progress(&self, progress: &RoundProgress) -> AppResult<RoundProgress> {
        ProgressRepository::save(&self.pool, progress).await
    }

    async fn find_winners(&self, hackathon_id: Uuid) -> AppResult<Option<WinnerBoard>> {
        ProgressRepository::find_winners(&self.pool, hackathon_id).await
    }

    async fn save_winners(&self, board: &WinnerBoard) -> AppResult<WinnerBoard> {
        ProgressRepository::save_winners(&self.pool, board).await
    }
}
