//! Judge assignment handlers

mod handler;
pub mod request;
pub mod response;

pub use handler::ScopePath;

use axum::{
    routing::{delete, get, patch, post},
    Router,
};

use crate::state::AppState;

/// Assignment routes
pub fn routes() -> Router<AppState> {
    Router::new()
        // Assignment mode
        .route(
            "/hackathons/{hackathon_id}/rounds/{round_index}/assignment-mode",
            get(handler::get_assignment_mode).put(handler::set_assignment_mode),
        )
        .route(
            "/hackathons/{hackathon_id}/problem-statements/{ps_index}/assignment-mode",
            get(handler::get_assignment_mode).put(handler::set_assignment_mode),
        )
        // Invitations and distribution
        .route(
            "/hackathons/{hackathon_id}/rounds/{round_index}/judges",
            post(handler::assign_judges),
        )
        .route(
            "/hackathons/{hackathon_id}/problem-statements/{ps_index}/judges",
            post(handler::assign_judges),
        )
        .route(
            "/hackathons/{hackathon_id}/rounds/{round_index}/auto-distribute",
            post(handler::auto_distribute),
        )
        .route(
            "/hackathons/{hackathon_id}/problem-statements/{ps_index}/auto-distribute",
            post(handler::auto_distribute),
        )
        .route(
            "/hackathons/{hackathon_id}/judge-assignments",
            get(handler::list_assignments),
        )
        .route(
            "/hackathons/{hackathon_id}/judges/{judge_id}",
            delete(handler::remove_judge),
        )
        // Single assignment
        .route(
            "/judge-assignments/{assignment_id}",
            delete(handler::remove_assignment),
        )
        .route(
            "/judge-assignments/{assignment_id}/status",
            patch(handler::respond_to_assignment),
        )
        .route(
            "/judge-assignments/{assignment_id}/teams",
            post(handler::assign_teams),
        )
        .route(
            "/judge-assignments/{assignment_id}/rounds",
            post(handler::assign_rounds),
        )
        .route(
            "/judge-assignments/{assignment_id}/problem-statements",
            post(handler::assign_problem_statements),
        )
        .route(
            "/judge-assignments/{assignment_id}/submissions",
            post(handler::assign_submissions),
        )
        .route(
            "/judge-assignments/{assignment_id}/removals",
            post(handler::remove_from_judge),
        )
        // Judge dashboard
        .route("/judges/me/assignments", get(handler::my_assignments))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Scope;

    #[test]
    fn test_scope_path_picks_the_named_index() {
        let round = ScopePath {
            hackathon_id: uuid::Uuid::new_v4(),
            round_index: Some(2),
            ps_index: None,
        };
        assert_eq!(round.scope().unwrap(), Scope::Round(2));

        let ps = ScopePath {
            round_index: None,
            ps_index: Some(1),
            ..round
        };
        assert_eq!(ps.scope().unwrap(), Scope::ProblemStatement(1));
    }
}
