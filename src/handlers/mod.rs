//! HTTP Request Handlers
//!
//! This module contains all HTTP request handlers organized by domain.

pub mod assignments;
pub mod health;
pub mod rounds;
pub mod scoring;

use axum::{middleware, Router};

use crate::{constants::API_BASE_PATH, middleware::auth::auth_middleware, state::AppState};

/// Create all API routes.
///
/// Everything except the health check sits behind bearer-token auth.
pub fn routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .merge(assignments::routes())
        .merge(scoring::routes())
        .merge(rounds::routes())
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new().nest(API_BASE_PATH, protected.merge(health::routes()))
}
