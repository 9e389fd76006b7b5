//! Authentication HTTP handlers
//! Mission: login and registration endpoints issuing the bearer JWT that
//! `AuthenticatedUser` later validates.

use crate::auth::middleware::AuthenticatedUser;
use crate::auth::models::{LoginRequest, LoginResponse, RegisterRequest, UserResponse};
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, response::Response, Json};
use tracing::{info, warn};

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AuthApiError> {
    let user_store = crate::auth::user_store::UserStore::new(state.durable.users());

    let valid = user_store
        .verify_password(&payload.username, &payload.password)
        .await
        .map_err(|_| AuthApiError::Internal)?;

    if !valid {
        warn!(username = %payload.username, "failed login attempt");
        return Err(AuthApiError::InvalidCredentials);
    }

    let user = user_store
        .get_by_username(&payload.username)
        .await
        .map_err(|_| AuthApiError::Internal)?
        .ok_or(AuthApiError::InvalidCredentials)?;

    let (token, expires_in) = state
        .jwt
        .generate_token(&user)
        .map_err(|_| AuthApiError::Internal)?;

    info!(user_id = user.id, "login successful");

    Ok(Json(LoginResponse {
        token,
        expires_in,
        role: user.role,
        user: UserResponse::from_row(&user),
    }))
}

pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<UserResponse>, AuthApiError> {
    if payload.password.len() < 8 {
        return Err(AuthApiError::WeakPassword);
    }

    let user_store = crate::auth::user_store::UserStore::new(state.durable.users());
    let user = user_store
        .register(&payload.username, &payload.email, &payload.password)
        .await
        .map_err(|_| AuthApiError::UserAlreadyExists)?;

    info!(user_id = user.id, "user registered");
    Ok(Json(UserResponse::from_row(&user)))
}

/// GET /api/auth/me — identity derived entirely from the bearer token,
/// no database round trip.
pub async fn get_current_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<UserResponse>, AuthApiError> {
    let row = state
        .durable
        .users()
        .get_by_id(user.user_id)
        .await
        .map_err(|_| AuthApiError::Internal)?
        .ok_or(AuthApiError::Internal)?;
    Ok(Json(UserResponse::from_row(&row)))
}

#[derive(Debug)]
pub enum AuthApiError {
    InvalidCredentials,
    UserAlreadyExists,
    WeakPassword,
    Internal,
}

impl IntoResponse for AuthApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthApiError::InvalidCredentials => {
                (StatusCode::UNAUTHORIZED, "invalid username or password")
            }
            AuthApiError::UserAlreadyExists => (StatusCode::CONFLICT, "username already exists"),
            AuthApiError::WeakPassword => (
                StatusCode::BAD_REQUEST,
                "password must be at least 8 characters",
            ),
            AuthApiError::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "internal error"),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
