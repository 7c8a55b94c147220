//! Judge assignment handler implementations

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    middleware::auth::AuthenticatedUser,
    models::{JudgeAssignment, Scope},
    services::AllocationService,
    state::AppState,
};

use super::{
    request::{
        AssignJudgesRequest, AssignProblemStatementsRequest, AssignRoundsRequest,
        AssignSubmissionsRequest, AssignTeamsRequest, RemoveFromJudgeRequest,
        RespondToAssignmentRequest, SetAssignmentModeRequest,
    },
    response::{
        AssignJudgesResponse, AssignmentModeResponse, AssignmentsListResponse,
        DistributionResponse, MyAssignmentsResponse,
    },
};

/// Path of a round or problem-statement scoped route.
///
/// Round routes carry `{round_index}`, problem statement routes `{ps_index}`.
#[derive(Debug, Deserialize)]
pub struct ScopePath {
    pub hackathon_id: Uuid,
    pub round_index: Option<i32>,
    pub ps_index: Option<i32>,
}

impl ScopePath {
    pub fn scope(&self) -> AppResult<Scope> {
        match (self.round_index, self.ps_index) {
            (Some(index), None) => Ok(Scope::Round(index)),
            (None, Some(index)) => Ok(Scope::ProblemStatement(index)),
            _ => Err(AppError::Validation(
                "Route must name exactly one round or problem statement".to_string(),
            )),
        }
    }
}

/// Get the assignment mode of a scope
pub async fn get_assignment_mode(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Path(path): Path<ScopePath>,
) -> AppResult<Json<AssignmentModeResponse>> {
    let response =
        AllocationService::get_assignment_mode(&state, &auth_user, path.hackathon_id, path.scope()?)
            .await?;
    Ok(Json(response))
}

/// Switch a scope between open and assigned judging
pub async fn set_assignment_mode(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Path(path): Path<ScopePath>,
    Json(payload): Json<SetAssignmentModeRequest>,
) -> AppResult<Json<AssignmentModeResponse>> {
    let response = AllocationService::set_assignment_mode(
        &state,
        &auth_user,
        path.hackathon_id,
        path.scope()?,
        payload.mode,
    )
    .await?;
    Ok(Json(response))
}

/// Invite judges to a scope
pub async fn assign_judges(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Path(path): Path<ScopePath>,
    Json(payload): Json<AssignJudgesRequest>,
) -> AppResult<Json<AssignJudgesResponse>> {
    payload.validate()?;

    let response = AllocationService::assign_judges(
        &state,
        &auth_user,
        path.hackathon_id,
        path.scope()?,
        &payload.judge_ids,
    )
    .await?;
    Ok(Json(response))
}

/// Deal the scope's pool over its accepted judges
pub async fn auto_distribute(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Path(path): Path<ScopePath>,
) -> AppResult<Json<DistributionResponse>> {
    let response =
        AllocationService::auto_distribute(&state, &auth_user, path.hackathon_id, path.scope()?)
            .await?;
    Ok(Json(response))
}

/// List every assignment of a hackathon
pub async fn list_assignments(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Path(hackathon_id): Path<Uuid>,
) -> AppResult<Json<AssignmentsListResponse>> {
    let response = AllocationService::list_assignments(&state, &auth_user, hackathon_id).await?;
    Ok(Json(response))
}

/// Remove a judge from a hackathon
pub async fn remove_judge(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Path((hackathon_id, judge_id)): Path<(Uuid, Uuid)>,
) -> AppResult<StatusCode> {
    AllocationService::remove_judge(&state, &auth_user, hackathon_id, judge_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Accept or decline an invitation
pub async fn respond_to_assignment(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Path(assignment_id): Path<Uuid>,
    Json(payload): Json<RespondToAssignmentRequest>,
) -> AppResult<Json<JudgeAssignment>> {
    let assignment =
        AllocationService::respond_to_assignment(&state, &auth_user, assignment_id, payload.status)
            .await?;
    Ok(Json(assignment))
}

pub async fn assign_teams(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Path(assignment_id): Path<Uuid>,
    Json(payload): Json<AssignTeamsRequest>,
) -> AppResult<Json<JudgeAssignment>> {
    payload.validate()?;
    let assignment = AllocationService::assign_teams_to_judge(
        &state,
        &auth_user,
        assignment_id,
        &payload.team_ids,
    )
    .await?;
    Ok(Json(assignment))
}

pub async fn assign_rounds(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Path(assignment_id): Path<Uuid>,
    Json(payload): Json<AssignRoundsRequest>,
) -> AppResult<Json<JudgeAssignment>> {
    payload.validate()?;
    let assignment = AllocationService::assign_rounds_to_judge(
        &state,
        &auth_user,
        assignment_id,
        &payload.round_indices,
    )
    .await?;
    Ok(Json(assignment))
}

pub async fn assign_problem_statements(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Path(assignment_id): Path<Uuid>,
    Json(payload): Json<AssignProblemStatementsRequest>,
) -> AppResult<Json<JudgeAssignment>> {
    payload.validate()?;
    let assignment = AllocationService::assign_problem_statements_to_judge(
        &state,
        &auth_user,
        assignment_id,
        &payload.problem_statement_indices,
    )
    .await?;
    Ok(Json(assignment))
}

/// Hand specific submissions to a judge
pub async fn assign_submissions(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Path(assignment_id): Path<Uuid>,
    Json(payload): Json<AssignSubmissionsRequest>,
) -> AppResult<Json<JudgeAssignment>> {
    payload.validate()?;
    let assignment = AllocationService::assign_submissions_to_judge(
        &state,
        &auth_user,
        assignment_id,
        payload.scope,
        &payload.submission_ids,
    )
    .await?;
    Ok(Json(assignment))
}

/// Explicitly remove scopes, teams or submissions from an assignment
pub async fn remove_from_judge(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Path(assignment_id): Path<Uuid>,
    Json(payload): Json<RemoveFromJudgeRequest>,
) -> AppResult<Json<JudgeAssignment>> {
    let assignment =
        AllocationService::remove_from_judge(&state, &auth_user, assignment_id, &payload).await?;
    Ok(Json(assignment))
}

pub async fn remove_assignment(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Path(assignment_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    AllocationService::remove_assignment(&state, &auth_user, assignment_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// The caller's judging work across hackathons
pub async fn my_assignments(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
) -> AppResult<Json<MyAssignmentsResponse>> {
    let response = AllocationService::my_assignments(&state, &auth_user).await?;
    Ok(Json(response))
}
