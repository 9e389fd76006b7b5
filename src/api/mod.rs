//! HTTP surface
//! Mission: the axum router exposing the action pipeline, sign-in
//! procedure and liveness check (spec section 6).

pub mod health;
pub mod signin;
pub mod stats;

use crate::auth::api as auth_api;
use crate::middleware::rate_limit::{rate_limit_middleware, RateLimitConfig, RateLimitLayer};
use crate::middleware::request_logging;
use crate::state::AppState;
use axum::routing::{get, post};
use axum::Router;

pub fn router(state: AppState) -> Router {
    let limiter = RateLimitLayer::new(RateLimitConfig {
        max_requests: state.config.rate_limit_max_requests,
        window: state.config.rate_limit_window,
        burst: 0,
    });

    Router::new()
        .route("/health", get(health::health))
        .route("/api/auth/register", post(auth_api::register))
        .route("/api/auth/login", post(auth_api::login))
        .route("/api/auth/me", get(auth_api::get_current_user))
        .route("/api/posts/:id/actions/:kind", post(stats::toggle_post_action))
        .route("/api/comments/:id/actions/:kind", post(stats::toggle_comment_action))
        .route("/api/posts/:id/view", post(stats::increment_post_view))
        .route("/api/posts/:id/stats", get(stats::get_post_stats))
        .route("/api/posts/stats", get(stats::batch_get_post_stats))
        .route("/api/signin", post(signin::signin))
        .route("/api/signin/ranking/daily", get(signin::daily_ranking))
        .route("/api/signin/ranking/continuous", get(signin::continuous_ranking))
        .layer(axum::middleware::from_fn_with_state(limiter, rate_limit_middleware))
        .layer(axum::middleware::from_fn(request_logging))
        .with_state(state)
}
