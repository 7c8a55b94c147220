//! Database repositories
//!
//! `EngineRepository` is the only way services touch stored state. The
//! Postgres implementation delegates to the per-table repositories below;
//! `MemoryRepository` backs tests and the `memory` storage backend.

pub mod assignment_repo;
pub mod bounded;
pub mod hackathon_repo;
pub mod memory;
pub mod pg;
pub mod progress_repo;
pub mod score_repo;
pub mod submission_repo;

pub use assignment_repo::AssignmentRepository;
pub use bounded::BoundedRepository;
pub use hackathon_repo::HackathonRepository;
pub use memory::MemoryRepository;
pub use pg::PgEngineRepository;
pub use progress_repo::ProgressRepository;
pub use score_repo::ScoreRepository;
pub use submission_repo::SubmissionRepository;

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        Hackathon, JudgeAssignment, ProblemStatement, Round, RoundProgress, Score, Submission,
        Team, User, WinnerBoard,
    },
};

/// Storage seam of the engine.
///
/// Writes that carry a `version` are optimistic: the stored version must
/// equal the given one (0 = not stored yet) or the call fails with
/// `Conflict` and stores nothing. Batch writes are all-or-nothing.
#[async_trait]
pub trait EngineRepository: Send + Sync {
    // Hackathon read model
    async fn find_hackathon(&self, id: Uuid) -> AppResult<Option<Hackathon>>;
    async fn update_round(&self, hackathon_id: Uuid, round: &Round) -> AppResult<()>;
    async fn update_problem_statement(
        &self,
        hackathon_id: Uuid,
        problem_statement: &ProblemStatement,
    ) -> AppResult<()>;

    // Users and teams
    async fn find_user(&self, id: Uuid) -> AppResult<Option<User>>;
    async fn list_teams(&self, hackathon_id: Uuid) -> AppResult<Vec<Team>>;

    // Submissions
    async fn find_submission(&self, id: Uuid) -> AppResult<Option<Submission>>;
    async fn list_submissions(&self, hackathon_id: Uuid) -> AppResult<Vec<Submission>>;

    // Judge assignments
    async fn find_assignment(&self, id: Uuid) -> AppResult<Option<JudgeAssignment>>;
    async fn list_assignments(&self, hackathon_id: Uuid) -> AppResult<Vec<JudgeAssignment>>;
    async fn list_assignments_for_judge(&self, judge_id: Uuid) -> AppResult<Vec<JudgeAssignment>>;
    /// Fails with `Conflict` if the judge already has an assignment for the hackathon
    async fn insert_assignment(&self, assignment: &JudgeAssignment) -> AppResult<()>;
    /// Version-checked batch update; returns the stored records
    async fn save_assignments(
        &self,
        assignments: &[JudgeAssignment],
    ) -> AppResult<Vec<JudgeAssignment>>;
    async fn delete_assignments(&self, ids: &[Uuid]) -> AppResult<u64>;

    // Scores
    async fn list_scores(&self, hackathon_id: Uuid, round_index: i32) -> AppResult<Vec<Score>>;
    async fn count_scores(&self, hackathon_id: Uuid, round_index: i32) -> AppResult<i64>;
    /// Replace one judge's records for a submission in a round
    async fn replace_scores(
        &self,
        hackathon_id: Uuid,
        round_index: i32,
        submission_id: Uuid,
        judge_id: Uuid,
        scores: &[Score],
    ) -> AppResult<()>;

    // Round progress
    async fn find_round_progress(
        &self,
        hackathon_id: Uuid,
        round_index: i32,
    ) -> AppResult<Option<RoundProgress>>;
    async fn list_round_progress(&self, hackathon_id: Uuid) -> AppResult<Vec<RoundProgress>>;
    async fn save_round_progress(&self, progress: &RoundProgress) -> AppResult<RoundProgress>;

    // Winners
    async fn find_winners(&self, hackathon_id: Uuid) -> AppResult<Option<WinnerBoard>>;
    async fn save_winners(&self, board: &WinnerBoard) -> AppResult<WinnerBoard>;
}
