//! Shortlisting, eligibility and round progression handlers

mod handler;
pub mod request;
pub mod response;

use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;

/// Round progression routes
pub fn routes() -> Router<AppState> {
    Router::new()
        // Shortlist
        .route(
            "/hackathons/{hackathon_id}/rounds/{round_index}/shortlist",
            get(handler::get_shortlisted).post(handler::perform_shortlisting),
        )
        .route(
            "/hackathons/{hackathon_id}/rounds/{round_index}/shortlist/public",
            get(handler::get_shortlisted_public),
        )
        .route(
            "/hackathons/{hackathon_id}/rounds/{round_index}/shortlist/submissions/{submission_id}/toggle",
            post(handler::toggle_submission_shortlist),
        )
        // Eligibility
        .route(
            "/hackathons/{hackathon_id}/rounds/{round_index}/eligibility",
            get(handler::check_round_eligibility),
        )
        .route(
            "/hackathons/{hackathon_id}/rounds/{round_index}/next-round-eligibility",
            get(handler::check_next_round_eligibility),
        )
        .route(
            "/hackathons/{hackathon_id}/shortlisting-status",
            get(handler::user_shortlisting_status),
        )
        // Progression and winners
        .route(
            "/hackathons/{hackathon_id}/rounds/{round_index}/progress",
            post(handler::check_and_auto_progress),
        )
        .route(
            "/hackathons/{hackathon_id}/rounds/{round_index}/winners",
            post(handler::assign_winners),
        )
        .route("/hackathons/{hackathon_id}/winners", get(handler::get_winners))
        .route(
            "/hackathons/{hackathon_id}/winners/notify",
            post(handler::send_winner_emails),
        )
        .route(
            "/hackathons/{hackathon_id}/assignment-overview",
            get(handler::get_assignment_overview),
        )
}
