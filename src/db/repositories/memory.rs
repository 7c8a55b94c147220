//! In-memory repository
//!
//! Single `RwLock` over all tables, so every write is atomic with respect to
//! readers. Used by tests and the `memory` storage backend.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::EngineRepository;
use crate::{
    error::{AppError, AppResult},
    models::{
        Hackathon, JudgeAssignment, ProblemStatement, Round, RoundProgress, Score, Submission,
        Team, User, WinnerBoard,
    },
};

#[derive(Default)]
struct Tables {
    hackathons: HashMap<Uuid, Hackathon>,
    users: HashMap<Uuid, User>,
    teams: HashMap<Uuid, Team>,
    submissions: HashMap<Uuid, Submission>,
    assignments: HashMap<Uuid, JudgeAssignment>,
    scores: Vec<Score>,
    progress: HashMap<(Uuid, i32), RoundProgress>,
    winners: HashMap<Uuid, WinnerBoard>,
}

/// Repository keeping everything in process memory
#[derive(Default)]
pub struct MemoryRepository {
    tables: RwLock<Tables>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_hackathon(&self, hackathon: Hackathon) {
        self.tables
            .write()
            .await
            .hackathons
            .insert(hackathon.id, hackathon);
    }

    pub async fn insert_user(&self, user: User) {
        self.tables.write().await.users.insert(user.id, user);
    }

    pub async fn insert_team(&self, team: Team) {
        self.tables.write().await.teams.insert(team.id, team);
    }

    pub async fn insert_submission(&self, submission: Submission) {
        self.tables
            .write()
            .await
            .submissions
            .insert(submission.id, submission);
    }
}

fn stale(what: &str) -> AppError {
    AppError::Conflict(format!("{} was modified concurrently, reload and retry", what))
}

#[async_trait]
impl EngineRepository for MemoryRepository {
    async fn find_hackathon(&self, id: Uuid) -> AppResult<Option<Hackathon>> {
        Ok(self.tables.read().await.hackathons.get(&id).cloned())
    }

    async fn update_round(&self, hackathon_id: Uuid, round: &Round) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        let hackathon = tables
            .hackathons
            .get_mut(&hackathon_id)
            .ok_or_else(|| AppError::NotFound("Hackathon not found".to_string()))?;
        let slot = hackathon
            .rounds
            .iter_mut()
            .find(|r| r.index == round.index)
            .ok_or_else(|| AppError::NotFound(format!("Round {} does not exist", round.index)))?;
        *slot = round.clone();
        hackathon.updated_at = Utc::now();
        Ok(())
    }

    async fn update_problem_statement(
        &self,
        hackathon_id: Uuid,
        problem_statement: &ProblemStatement,
    ) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        let hackathon = tables
            .hackathons
            .get_mut(&hackathon_id)
            .ok_or_else(|| AppError::NotFound("Hackathon not found".to_string()))?;
        let slot = hackathon
            .problem_statements
            .iter_mut()
            .find(|p| p.index == problem_statement.index)
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "Problem statement {} does not exist",
                    problem_statement.index
                ))
            })?;
        *slot = problem_statement.clone();
        hackathon.updated_at = Utc::now();
        Ok(())
    }

    async fn find_user(&self, id: Uuid) -> AppResult<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn list_teams(&self, hackathon_id: Uuid) -> AppResult<Vec<Team>> {
        let tables = self.tables.read().await;
        let mut teams: Vec<Team> = tables
            .teams
            .values()
            .filter(|t| t.hackathon_id == hackathon_id)
            .cloned()
            .collect();
        teams.sort_by_key(|t| t.id);
        Ok(teams)
    }

    async fn find_submission(&self, id: Uuid) -> AppResult<Option<Submission>> {
        Ok(self.tables.read().await.submissions.get(&id).cloned())
    }

    async fn list_submissions(&self, hackathon_id: Uuid) -> AppResult<Vec<Submission>> {
        let tables = self.tables.read().await;
        let mut submissions: Vec<Submission> = tables
            .submissions
            .values()
            .filter(|s| s.hackathon_id == hackathon_id)
            .cloned()
            .collect();
        submissions.sort_by_key(|s| s.id);
        Ok(submissions)
    }

    async fn find_assignment(&self, id: Uuid) -> AppResult<Option<JudgeAssignment>> {
        Ok(self.tables.read().await.assignments.get(&id).cloned())
    }

    async fn list_assignments(&self, hackathon_id: Uuid) -> AppResult<Vec<JudgeAssignment>> {
        let tables = self.tables.read().await;
        let mut assignments: Vec<JudgeAssignment> = tables
            .assignments
            .values()
            .filter(|a| a.hackathon_id == hackathon_id)
            .cloned()
            .collect();
        assignments.sort_by_key(|a| (a.invited_at, a.id));
        Ok(assignments)
    }

    async fn list_assignments_for_judge(&self, judge_id: Uuid) -> AppResult<Vec<JudgeAssignment>> {
        let tables = self.tables.read().await;
        let mut assignments: Vec<JudgeAssignment> = tables
            .assignments
            .values()
            .filter(|a| a.judge_id == judge_id)
            .cloned()
            .collect();
        assignments.sort_by_key(|a| (a.invited_at, a.id));
        Ok(assignments)
    }

    async fn insert_assignment(&self, assignment: &JudgeAssignment) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        let duplicate = tables.assignments.values().any(|a| {
            a.hackathon_id == assignment.hackathon_id && a.judge_id == assignment.judge_id
        });
        if duplicate {
            return Err(stale("Judge assignment"));
        }
        let mut stored = assignment.clone();
        stored.version = 1;
        tables.assignments.insert(stored.id, stored);
        Ok(())
    }

    async fn save_assignments(
        &self,
        assignments: &[JudgeAssignment],
    ) -> AppResult<Vec<JudgeAssignment>> {
        let mut tables = self.tables.write().await;

        // Check the whole batch before touching anything
        for assignment in assignments {
            match tables.assignments.get(&assignment.id) {
                Some(current) if current.version == assignment.version => {}
                Some(_) => return Err(stale("Judge assignment")),
                None => {
                    return Err(AppError::NotFound("Judge assignment not found".to_string()));
                }
            }
        }

        let now = Utc::now();
        let mut saved = Vec::with_capacity(assignments.len());
        for assignment in assignments {
            let mut stored = assignment.clone();
            stored.version += 1;
            stored.updated_at = now;
            tables.assignments.insert(stored.id, stored.clone());
            saved.push(stored);
        }
        Ok(saved)
    }

    async fn delete_assignments(&self, ids: &[Uuid]) -> AppResult<u64> {
        let mut tables = self.tables.write().await;
        let removed = ids
            .iter()
            .filter(|id| tables.assignments.remove(id).is_some())
            .count();
        Ok(removed as u64)
    }

    async fn list_scores(&self, hackathon_id: Uuid, round_index: i32) -> AppResult<Vec<Score>> {
        let tables = self.tables.read().await;
        Ok(tables
            .scores
            .iter()
            .filter(|s| s.hackathon_id == hackathon_id && s.round_index == round_index)
            .cloned()
            .collect())
    }

    async fn count_scores(&self, hackathon_id: Uuid, round_index: i32) -> AppResult<i64> {
        let tables = self.tables.read().await;
        let count = tables
            .scores
            .iter()
            .filter(|s| s.hackathon_id == hackathon_id && s.round_index == round_index)
            .count();
        Ok(count as i64)
    }

    async fn replace_scores(
        &self,
        hackathon_id: Uuid,
        round_index: i32,
        submission_id: Uuid,
        judge_id: Uuid,
        scores: &[Score],
    ) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        tables.scores.retain(|s| {
            !(s.hackathon_id == hackathon_id
                && s.round_index == round_index
                && s.submission_id == submission_id
                && s.judge_id == judge_id)
        });
        tables.scores.extend(scores.iter().cloned());
        Ok(())
    }

    async fn find_round_progress(
        &self,
        hackathon_id: Uuid,
        round_index: i32,
    ) -> AppResult<Option<RoundProgress>> {
        Ok(self
            .tables
            .read()
            .await
            .progress
            .get(&(hackathon_id, round_index))
            .cloned())
    }

    async fn list_round_progress(&self, hackathon_id: Uuid) -> AppResult<Vec<RoundProgress>> {
        let tables = self.tables.read().await;
        let mut progress: Vec<RoundProgress> = tables
            .progress
            .values()
            .filter(|p| p.hackathon_id == hackathon_id)
            .cloned()
            .collect();
        progress.sort_by_key(|p| p.round_index);
        Ok(progress)
    }

    async fn save_round_progress(&self, progress: &RoundProgress) -> AppResult<RoundProgress> {
        let mut tables = self.tables.write().await;
        let key = (progress.hackathon_id, progress.round_index);
        let current_version = tables.progress.get(&key).map_or(0, |p| p.version);
        if current_version != progress.version {
            return Err(stale("Round progress"));
        }
        let mut stored = progress.clone();
        stored.version += 1;
        tables.progress.insert(key, stored.clone());
        Ok(stored)
    }

    async fn find_winners(&self, hackathon_id: Uuid) -> AppResult<Option<WinnerBoard>> {
        Ok(self.tables.read().await.winners.get(&hackathon_id).cloned())
    }

    async fn save_winners(&self, board: &WinnerBoard) -> AppResult<WinnerBoard> {
        let mut tables = self.tables.write().await;
        let current_version = tables
            .winners
            .get(&board.hackathon_id)
            .map_or(0, |b| b.version);
        if current_version != board.version {
            return Err(stale("Winner board"));
        }
        let mut stored = board.clone();
        stored.version += 1;
        tables.winners.insert(stored.hackathon_id, stored.clone());
        Ok(stored)
    }
}
