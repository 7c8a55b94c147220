//! Scoring response DTOs

use serde::Serialize;
use uuid::Uuid;

use crate::{
    judging::{RankedSubmission, RoundPhase, ScopeProgress, SubmissionProgress},
    models::{JudgingCriteria, Score},
};

/// The judge's stored record after scoring
#[derive(Debug, Serialize)]
pub struct ScoreResponse {
    pub submission_id: Uuid,
    pub round_index: i32,
    pub judge_id: Uuid,
    pub scores: Vec<Score>,
    /// This judge's weighted score for the submission
    pub weighted_score: Option<f64>,
}

/// Ranked pool of a round
#[derive(Debug, Serialize)]
pub struct LeaderboardResponse {
    pub round_index: i32,
    pub phase: RoundPhase,
    pub max_weighted_score: Option<f64>,
    pub entries: Vec<RankedSubmission>,
    pub scored: usize,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct JudgingCriteriaResponse {
    pub round_index: i32,
    pub judging_criteria: JudgingCriteria,
    pub max_weighted_score: Option<f64>,
}

/// Who still has to score what in a round
#[derive(Debug, Serialize)]
pub struct RoundStatusResponse {
    pub round_index: i32,
    pub phase: RoundPhase,
    pub progress: ScopeProgress,
    pub completion_percent: f64,
    pub submissions: Vec<SubmissionProgress>,
}
