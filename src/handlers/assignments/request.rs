//! Judge assignment request DTOs

use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::constants::MAX_JUDGES_PER_REQUEST;
use crate::models::{AssignmentMode, Scope, ScopedSubmission};

/// Set assignment mode request
#[derive(Debug, Deserialize)]
pub struct SetAssignmentModeRequest {
    pub mode: AssignmentMode,
}

/// Invite judges to a round or problem statement
#[derive(Debug, Deserialize, Validate)]
pub struct AssignJudgesRequest {
    #[validate(length(min = 1, max = MAX_JUDGES_PER_REQUEST))]
    pub judge_ids: Vec<Uuid>,
}

/// Judge's answer to an invitation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssignmentResponse {
    Accepted,
    Declined,
}

#[derive(Debug, Deserialize)]
pub struct RespondToAssignmentRequest {
    pub status: AssignmentResponse,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AssignTeamsRequest {
    #[validate(length(min = 1))]
    pub team_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AssignRoundsRequest {
    #[validate(length(min = 1))]
    pub round_indices: Vec<i32>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AssignProblemStatementsRequest {
    #[validate(length(min = 1))]
    pub problem_statement_indices: Vec<i32>,
}

/// Hand specific submissions to a judge within one scope
#[derive(Debug, Deserialize, Validate)]
pub struct AssignSubmissionsRequest {
    pub scope: Scope,
    #[validate(length(min = 1))]
    pub submission_ids: Vec<Uuid>,
}

/// Explicit removal from an assignment; empty lists are ignored
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RemoveFromJudgeRequest {
    pub rounds: Vec<i32>,
    pub problem_statements: Vec<i32>,
    pub teams: Vec<Uuid>,
    pub submissions: Vec<ScopedSubmission>,
}

impl RemoveFromJudgeRequest {
    pub fn is_empty(&self) -> bool {
        self.rounds.is_empty()
            && self.problem_statements.is_empty()
            && self.teams.is_empty()
            && self.submissions.is_empty()
    }
}
