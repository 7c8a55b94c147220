//! Authentication middleware
//!
//! Tokens are issued elsewhere; this layer only verifies them and puts the
//! caller's identity into the request extensions.

use axum::{
    body::Body,
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::{
    constants::roles,
    error::{AppError, AppResult},
    models::Hackathon,
    state::AppState,
};

/// JWT claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user_id
    pub email: String,
    pub role: String,
    pub exp: i64,
    pub iat: i64,
}

/// Verify a bearer token and return its claims
pub fn verify_token(token: &str, secret: &str) -> AppResult<Claims> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;

    Ok(token_data.claims)
}

/// Authenticated user extracted from JWT
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub id: Uuid,
    pub email: String,
    pub role: String,
}

impl AuthenticatedUser {
    pub fn is_admin(&self) -> bool {
        self.role == roles::ADMIN
    }

    pub fn is_judge(&self) -> bool {
        self.role == roles::JUDGE
    }

    /// Admins manage every hackathon, organizers only their own
    pub fn can_manage(&self, hackathon: &Hackathon) -> bool {
        self.is_admin() || (self.role == roles::ORGANIZER && hackathon.organizer_id == self.id)
    }

    pub fn ensure_can_manage(&self, hackathon: &Hackathon) -> AppResult<()> {
        if self.can_manage(hackathon) {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "Only the hackathon's organizer or an admin can do this".to_string(),
            ))
        }
    }

    pub fn ensure_judge(&self) -> AppResult<()> {
        if self.is_judge() {
            Ok(())
        } else {
            Err(AppError::Forbidden("Judge role required".to_string()))
        }
    }
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or(AppError::Unauthorized)
    }
}

/// Authentication middleware
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let path = request.uri().path().to_string();

    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or_else(|| {
            debug!(path = %path, "Auth failed: missing or malformed Authorization header");
            AppError::Unauthorized
        })?;

    let claims = verify_token(token, &state.config().jwt.secret).map_err(|e| {
        debug!(path = %path, error = ?e, "Auth failed: token verification failed");
        e
    })?;

    let user_id = Uuid::parse_str(&claims.sub).map_err(|e| {
        debug!(
            path = %path,
            sub = %claims.sub,
            error = ?e,
            "Auth failed: invalid user ID in token"
        );
        AppError::InvalidToken
    })?;

    if !roles::ALL.contains(&claims.role.as_str()) {
        debug!(path = %path, role = %claims.role, "Auth failed: unknown role");
        return Err(AppError::InvalidToken);
    }

    let user = AuthenticatedUser {
        id: user_id,
        email: claims.email,
        role: claims.role,
    };

    debug!(path = %path, user_id = %user.id, role = %user.role, "User authenticated");

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}
