//! Scoring handlers

mod handler;
pub mod request;
pub mod response;

use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;

/// Scoring routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/hackathons/{hackathon_id}/rounds/{round_index}/submissions/{submission_id}/scores",
            post(handler::score_submission),
        )
        .route(
            "/hackathons/{hackathon_id}/rounds/{round_index}/leaderboard",
            get(handler::get_leaderboard),
        )
        .route(
            "/hackathons/{hackathon_id}/rounds/{round_index}/criteria",
            get(handler::get_judging_criteria).put(handler::update_judging_criteria),
        )
        .route(
            "/hackathons/{hackathon_id}/rounds/{round_index}/status",
            get(handler::round_submissions_status),
        )
}
