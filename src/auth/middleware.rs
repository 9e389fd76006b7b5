//! Authentication extractors
//! Mission: pull a validated identity out of the request's bearer token
//! (spec section 4.8)

use crate::durable::users::UserRole;
use crate::state::AppState;
use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
};

#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser {
    pub user_id: i64,
    pub role: UserRole,
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
}

#[async_trait::async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(AuthError::MissingToken)?;
        let claims = state
            .jwt
            .validate_token(token)
            .map_err(|_| AuthError::InvalidToken)?;
        let user_id = claims
            .sub
            .parse::<i64>()
            .map_err(|_| AuthError::InvalidToken)?;
        Ok(AuthenticatedUser {
            user_id,
            role: claims.role,
        })
    }
}

/// Same as `AuthenticatedUser` but never rejects — yields `None` when no
/// valid bearer token is present. Used by routes where auth only affects
/// personalization (e.g. the per-user like/dislike/favorite flags).
#[derive(Debug, Clone, Copy)]
pub struct OptionalUser(pub Option<AuthenticatedUser>);

#[async_trait::async_trait]
impl FromRequestParts<AppState> for OptionalUser {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(token) = bearer_token(parts) else {
            return Ok(OptionalUser(None));
        };
        let Ok(claims) = state.jwt.validate_token(token) else {
            return Ok(OptionalUser(None));
        };
        let Ok(user_id) = claims.sub.parse::<i64>() else {
            return Ok(OptionalUser(None));
        };
        Ok(OptionalUser(Some(AuthenticatedUser {
            user_id,
            role: claims.role,
        })))
    }
}

#[derive(Debug)]
pub enum AuthError {
    MissingToken,
    InvalidToken,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthError::MissingToken => (StatusCode::UNAUTHORIZED, "missing bearer token"),
            AuthError::InvalidToken => (StatusCode::UNAUTHORIZED, "invalid or expired token"),
        };
        (status, message).into_response()
    }
}
