//! Round progression response DTOs

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::judging::RoundPhase;
use crate::models::{AssignmentMode, Scope, Winner};

/// One shortlisted submission
#[derive(Debug, Serialize)]
pub struct ShortlistedSubmission {
    pub submission_id: Uuid,
    pub title: String,
    pub team_id: Option<Uuid>,
    pub submitted_by: Uuid,
}

/// Organizer view of a round's shortlist
#[derive(Debug, Serialize)]
pub struct ShortlistResponse {
    pub round_index: i32,
    /// False until the round has been shortlisted
    pub published: bool,
    pub submissions: Vec<ShortlistedSubmission>,
    pub shortlisted_teams: Vec<Uuid>,
    pub eligible_teams: Vec<Uuid>,
    pub eligible_participants: Vec<Uuid>,
    pub shortlisted_at: Option<DateTime<Utc>>,
    pub shortlist_revision: i32,
    pub next_round_open: bool,
}

#[derive(Debug, Serialize)]
pub struct PublicShortlistEntry {
    pub submission_id: Uuid,
    pub title: String,
    pub team_id: Option<Uuid>,
}

/// Participant view of a round's shortlist
#[derive(Debug, Serialize)]
pub struct PublicShortlistResponse {
    pub round_index: i32,
    pub published: bool,
    pub submissions: Vec<PublicShortlistEntry>,
    pub shortlisted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct ToggleShortlistResponse {
    pub round_index: i32,
    pub submission_id: Uuid,
    pub shortlisted: bool,
    pub total_shortlisted: usize,
    pub shortlist_revision: i32,
}

#[derive(Debug, Serialize)]
pub struct EligibilityResponse {
    pub round_index: i32,
    pub eligible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// The caller's standing in one round
#[derive(Debug, Serialize)]
pub struct UserRoundStatus {
    pub round_index: i32,
    pub name: String,
    pub opened: bool,
    /// Whether the caller may take part in this round
    pub eligible: bool,
    pub shortlist_published: bool,
    /// Whether the caller advanced; `None` until the round is shortlisted
    pub advanced: Option<bool>,
    pub shortlisted_submissions: Vec<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct ShortlistingStatusResponse {
    pub hackathon_id: Uuid,
    pub rounds: Vec<UserRoundStatus>,
}

/// Result of a progression check
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProgressOutcome {
    Progressed { next_round: i32 },
    AlreadyProgressed { next_round: i32 },
    NotReady { reason: String },
}

#[derive(Debug, Serialize)]
pub struct ProgressResponse {
    pub round_index: i32,
    #[serde(flatten)]
    pub outcome: ProgressOutcome,
}

#[derive(Debug, Serialize)]
pub struct WinnersResponse {
    pub hackathon_id: Uuid,
    pub round_index: i32,
    pub winners: Vec<Winner>,
    pub assigned_at: DateTime<Utc>,
    pub assigned_by: Uuid,
    /// Whether the current winner set has been announced
    pub notified: bool,
    pub notified_at: Option<DateTime<Utc>>,
}

/// Allocation and scoring figures for one round or problem statement
#[derive(Debug, Serialize)]
pub struct ScopeOverview {
    pub scope: Scope,
    pub name: String,
    pub mode: AssignmentMode,
    /// Lifecycle phase; problem statements report the phase of the round
    /// they are currently scored in
    pub phase: Option<RoundPhase>,
    pub judges_invited: usize,
    pub judges_accepted: usize,
    pub judges_declined: usize,
    pub acceptance_rate: f64,
    pub pool_size: usize,
    pub evaluations_required: usize,
    pub evaluations_completed: usize,
    pub completion_percent: f64,
}

#[derive(Debug, Default, Serialize)]
pub struct OverviewTotals {
    pub assignments: usize,
    pub invited: usize,
    pub accepted: usize,
    pub declined: usize,
    pub acceptance_rate: f64,
    pub evaluations_required: usize,
    pub evaluations_completed: usize,
    pub completion_percent: f64,
}

#[derive(Debug, Serialize)]
pub struct AssignmentOverviewResponse {
    pub hackathon_id: Uuid,
    pub rounds: Vec<ScopeOverview>,
    pub problem_statements: Vec<ScopeOverview>,
    pub totals: OverviewTotals,
}
