//! Core error taxonomy
//! Mission: Give every component a single semantic error to wrap into

use axum::{http::StatusCode, response::IntoResponse, response::Response, Json};
use serde_json::json;

/// The taxonomy from spec section 7: transient failures surface as "busy,
/// try again"; everything else carries a reason specific enough for the
/// caller to act on.
#[derive(Debug)]
pub enum AppError {
    HotStoreUnavailable(String),
    DurableUnavailable(String),
    NotFound(String),
    Conflict(String),
    InvalidInput(String),
    Forbidden,
    Cancelled,
    Internal(String),
    AlreadySignedToday,
    SigninInProgress,
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::HotStoreUnavailable(c) => write!(f, "hot store unavailable: {c}"),
            AppError::DurableUnavailable(c) => write!(f, "durable store unavailable: {c}"),
            AppError::NotFound(c) => write!(f, "not found: {c}"),
            AppError::Conflict(c) => write!(f, "conflict: {c}"),
            AppError::InvalidInput(c) => write!(f, "invalid input: {c}"),
            AppError::Forbidden => write!(f, "forbidden"),
            AppError::Cancelled => write!(f, "cancelled"),
            AppError::Internal(c) => write!(f, "internal error: {c}"),
            AppError::AlreadySignedToday => write!(f, "already signed in today"),
            AppError::SigninInProgress => write!(f, "sign-in already in progress"),
        }
    }
}

impl std::error::Error for AppError {}

impl AppError {
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            AppError::HotStoreUnavailable(_) | AppError::DurableUnavailable(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "busy, try again".to_string(),
            ),
            AppError::NotFound(what) => (StatusCode::NOT_FOUND, format!("{what} not found")),
            AppError::Conflict(reason) => (StatusCode::CONFLICT, reason.clone()),
            AppError::InvalidInput(reason) => (StatusCode::BAD_REQUEST, reason.clone()),
            AppError::Forbidden => (
                StatusCode::FORBIDDEN,
                "insufficient permissions".to_string(),
            ),
            AppError::Cancelled => (StatusCode::REQUEST_TIMEOUT, "cancelled".to_string()),
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal error".to_string(),
            ),
            AppError::AlreadySignedToday => (
                StatusCode::CONFLICT,
                "you have already signed in today".to_string(),
            ),
            AppError::SigninInProgress => (
                StatusCode::CONFLICT,
                "a sign-in attempt for this account is already in progress".to_string(),
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::Internal(reason) = &self {
            tracing::error!(reason = %reason, "internal invariant violated");
        }
        let (status, message) = self.status_and_message();
        (status, Json(json!({ "error": message }))).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

impl From<crate::hotstore::HotStoreError> for AppError {
    fn from(e: crate::hotstore::HotStoreError) -> Self {
        match e {
            crate::hotstore::HotStoreError::Unavailable(c) => AppError::HotStoreUnavailable(c),
            crate::hotstore::HotStoreError::Cancelled => AppError::Cancelled,
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(e: anyhow::Error) -> Self {
        AppError::DurableUnavailable(e.to_string())
    }
}
