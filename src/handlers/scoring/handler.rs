//! Scoring handler implementations

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::AppResult, middleware::auth::AuthenticatedUser, services::ScoringService,
    state::AppState,
};

use super::{
    request::{ScoreSubmissionRequest, UpdateJudgingCriteriaRequest},
    response::{JudgingCriteriaResponse, LeaderboardResponse, RoundStatusResponse, ScoreResponse},
};

/// Record the caller's scores for a submission
pub async fn score_submission(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Path((hackathon_id, round_index, submission_id)): Path<(Uuid, i32, Uuid)>,
    Json(payload): Json<ScoreSubmissionRequest>,
) -> AppResult<Json<ScoreResponse>> {
    let response = ScoringService::score_submission(
        &state,
        &auth_user,
        hackathon_id,
        round_index,
        submission_id,
        &payload.scores,
    )
    .await?;
    Ok(Json(response))
}

pub async fn get_leaderboard(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Path((hackathon_id, round_index)): Path<(Uuid, i32)>,
) -> AppResult<Json<LeaderboardResponse>> {
    let response =
        ScoringService::get_leaderboard(&state, &auth_user, hackathon_id, round_index).await?;
    Ok(Json(response))
}

pub async fn get_judging_criteria(
    State(state): State<AppState>,
    _auth_user: AuthenticatedUser,
    Path((hackathon_id, round_index)): Path<(Uuid, i32)>,
) -> AppResult<Json<JudgingCriteriaResponse>> {
    let response = ScoringService::get_judging_criteria(&state, hackathon_id, round_index).await?;
    Ok(Json(response))
}

pub async fn update_judging_criteria(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Path((hackathon_id, round_index)): Path<(Uuid, i32)>,
    Json(payload): Json<UpdateJudgingCriteriaRequest>,
) -> AppResult<Json<JudgingCriteriaResponse>> {
    payload.validate()?;

    let response = ScoringService::update_judging_criteria(
        &state,
        &auth_user,
        hackathon_id,
        round_index,
        payload.into(),
    )
    .await?;
    Ok(Json(response))
}

/// Per-submission evaluation status of a round
pub async fn round_submissions_status(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Path((hackathon_id, round_index)): Path<(Uuid, i32)>,
) -> AppResult<Json<RoundStatusResponse>> {
    let response =
        ScoringService::round_submissions_status(&state, &auth_user, hackathon_id, round_index)
            .await?;
    Ok(Json(response))
}
