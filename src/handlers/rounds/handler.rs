//! Shortlisting and progression handler implementations

use axum::{
    extract::{Path, Query, State},
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::AppResult,
    middleware::auth::AuthenticatedUser,
    services::{ProgressionService, ShortlistService},
    state::AppState,
};

use super::{
    request::{AssignWinnersRequest, ProgressQuery, ShortlistRequest},
    response::{
        AssignmentOverviewResponse, EligibilityResponse, ProgressResponse,
        PublicShortlistResponse, ShortlistResponse, ShortlistingStatusResponse,
        ToggleShortlistResponse, WinnersResponse,
    },
};

/// Shortlist a round by count or threshold
pub async fn perform_shortlisting(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Path((hackathon_id, round_index)): Path<(Uuid, i32)>,
    Json(payload): Json<ShortlistRequest>,
) -> AppResult<Json<ShortlistResponse>> {
    let rule = payload.rule()?;
    let response = ShortlistService::perform_shortlisting(
        &state,
        &auth_user,
        hackathon_id,
        round_index,
        rule,
        payload.force,
    )
    .await?;
    Ok(Json(response))
}

pub async fn get_shortlisted(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Path((hackathon_id, round_index)): Path<(Uuid, i32)>,
) -> AppResult<Json<ShortlistResponse>> {
    let response =
        ShortlistService::get_shortlisted(&state, &auth_user, hackathon_id, round_index).await?;
    Ok(Json(response))
}

pub async fn get_shortlisted_public(
    State(state): State<AppState>,
    _auth_user: AuthenticatedUser,
    Path((hackathon_id, round_index)): Path<(Uuid, i32)>,
) -> AppResult<Json<PublicShortlistResponse>> {
    let response =
        ShortlistService::get_shortlisted_public(&state, hackathon_id, round_index).await?;
    Ok(Json(response))
}

/// Manually flip one submission in or out of the shortlist
pub async fn toggle_submission_shortlist(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Path((hackathon_id, round_index, submission_id)): Path<(Uuid, i32, Uuid)>,
) -> AppResult<Json<ToggleShortlistResponse>> {
    let response = ShortlistService::toggle_submission_shortlist(
        &state,
        &auth_user,
        hackathon_id,
        round_index,
        submission_id,
    )
    .await?;
    Ok(Json(response))
}

pub async fn check_round_eligibility(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Path((hackathon_id, round_index)): Path<(Uuid, i32)>,
) -> AppResult<Json<EligibilityResponse>> {
    let response =
        ShortlistService::check_round_eligibility(&state, &auth_user, hackathon_id, round_index)
            .await?;
    Ok(Json(response))
}

pub async fn check_next_round_eligibility(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Path((hackathon_id, round_index)): Path<(Uuid, i32)>,
) -> AppResult<Json<EligibilityResponse>> {
    let response = ShortlistService::check_next_round_eligibility(
        &state,
        &auth_user,
        hackathon_id,
        round_index,
    )
    .await?;
    Ok(Json(response))
}

/// The caller's standing across all rounds
pub async fn user_shortlisting_status(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Path(hackathon_id): Path<Uuid>,
) -> AppResult<Json<ShortlistingStatusResponse>> {
    let response =
        ShortlistService::user_shortlisting_status(&state, &auth_user, hackathon_id).await?;
    Ok(Json(response))
}

/// Open the next round if this one is ready
pub async fn check_and_auto_progress(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Path((hackathon_id, round_index)): Path<(Uuid, i32)>,
    Query(query): Query<ProgressQuery>,
) -> AppResult<Json<ProgressResponse>> {
    let response = ProgressionService::check_and_auto_progress(
        &state,
        &auth_user,
        hackathon_id,
        round_index,
        query.force,
    )
    .await?;
    Ok(Json(response))
}

pub async fn assign_winners(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Path((hackathon_id, round_index)): Path<(Uuid, i32)>,
    Json(payload): Json<AssignWinnersRequest>,
) -> AppResult<Json<WinnersResponse>> {
    payload.validate()?;

    let response = ProgressionService::assign_winners(
        &state,
        &auth_user,
        hackathon_id,
        round_index,
        &payload.placements(),
    )
    .await?;
    Ok(Json(response))
}

pub async fn get_winners(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Path(hackathon_id): Path<Uuid>,
) -> AppResult<Json<WinnersResponse>> {
    let response = ProgressionService::get_winners(&state, &auth_user, hackathon_id).await?;
    Ok(Json(response))
}

/// Re-send the winner announcement
pub async fn send_winner_emails(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Path(hackathon_id): Path<Uuid>,
) -> AppResult<Json<WinnersResponse>> {
    let response =
        ProgressionService::send_winner_emails(&state, &auth_user, hackathon_id).await?;
    Ok(Json(response))
}

pub async fn get_assignment_overview(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Path(hackathon_id): Path<Uuid>,
) -> AppResult<Json<AssignmentOverviewResponse>> {
    let response =
        ProgressionService::get_assignment_overview(&state, &auth_user, hackathon_id).await?;
    Ok(Json(response))
}
