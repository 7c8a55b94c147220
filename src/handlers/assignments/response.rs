//! Judge assignment response DTOs

use serde::Serialize;
use uuid::Uuid;

use crate::models::{AssignmentMode, AssignmentStatus, JudgeAssignment, Scope};

/// Current mode of a scope
#[derive(Debug, Serialize)]
pub struct AssignmentModeResponse {
    pub scope: Scope,
    pub mode: AssignmentMode,
}

/// Assignments touched by an invite call
#[derive(Debug, Serialize)]
pub struct AssignJudgesResponse {
    pub scope: Scope,
    /// Judges newly invited or extended to the scope
    pub invited: Vec<Uuid>,
    /// Judges that already had the scope
    pub unchanged: Vec<Uuid>,
    pub assignments: Vec<JudgeAssignment>,
}

/// Per-judge share of an auto-distribution
#[derive(Debug, Serialize)]
pub struct JudgeLoad {
    pub judge_id: Uuid,
    pub submission_count: usize,
}

/// Result of auto-distribution
#[derive(Debug, Serialize)]
pub struct DistributionResponse {
    pub scope: Scope,
    pub pool_size: usize,
    pub judges: Vec<JudgeLoad>,
    /// Assignments rewritten by this call; 0 on an unchanged rerun
    pub updated_assignments: usize,
}

/// Assignments of a hackathon
#[derive(Debug, Serialize)]
pub struct AssignmentsListResponse {
    pub assignments: Vec<JudgeAssignment>,
    pub total: usize,
}

/// One submission on a judge's dashboard
#[derive(Debug, Serialize)]
pub struct JudgeTask {
    pub submission_id: Uuid,
    pub title: String,
    pub team_id: Option<Uuid>,
    pub round_index: i32,
    pub scored: bool,
}

/// Work for one scope of an assignment
#[derive(Debug, Serialize)]
pub struct ScopeTasks {
    pub scope: Scope,
    pub mode: AssignmentMode,
    pub tasks: Vec<JudgeTask>,
    pub scored: usize,
}

/// One assignment as its judge sees it
#[derive(Debug, Serialize)]
pub struct MyAssignment {
    pub assignment_id: Uuid,
    pub hackathon_id: Uuid,
    pub hackathon_title: String,
    pub status: AssignmentStatus,
    pub scopes: Vec<ScopeTasks>,
}

#[derive(Debug, Serialize)]
pub struct MyAssignmentsResponse {
    pub assignments: Vec<MyAssignment>,
}
