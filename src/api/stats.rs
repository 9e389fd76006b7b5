//! Stats HTTP handlers
//! Mission: the action-toggle, view-increment and stats-read endpoints
//! over `StatsCore` (spec section 6's HTTP surface).

use crate::auth::middleware::{AuthenticatedUser, OptionalUser};
use crate::error::{AppError, AppResult};
use crate::state::AppState;
use crate::stats::model::{ActionFlags, ActionKind, CommentStats, PostStats};
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Serialize)]
pub struct StatsResponse<S> {
    #[serde(flatten)]
    pub stats: S,
    #[serde(flatten)]
    pub flags: ActionFlags,
}

fn parse_action_kind(raw: &str) -> AppResult<ActionKind> {
    match raw.to_ascii_lowercase().as_str() {
        "like" => Ok(ActionKind::Like),
        "dislike" => Ok(ActionKind::Dislike),
        "favorite" => Ok(ActionKind::Favorite),
        other => Err(AppError::InvalidInput(format!("unknown action kind {other:?}"))),
    }
}

pub async fn toggle_post_action(
    State(state): State<AppState>,
    Path((post_id, kind)): Path<(i64, String)>,
    user: AuthenticatedUser,
) -> AppResult<Json<PostStats>> {
    let kind = parse_action_kind(&kind)?;
    let token = CancellationToken::new();
    let stats = state
        .stats
        .toggle_post_action(user.user_id, post_id, kind, &token)
        .await?;
    Ok(Json(stats))
}

pub async fn toggle_comment_action(
    State(state): State<AppState>,
    Path((comment_id, kind)): Path<(i64, String)>,
    user: AuthenticatedUser,
) -> AppResult<Json<CommentStats>> {
    let kind = parse_action_kind(&kind)?;
    if !matches!(kind, ActionKind::Like | ActionKind::Dislike) {
        return Err(AppError::InvalidInput(
            "comments only support like/dislike".to_string(),
        ));
    }
    let token = CancellationToken::new();
    let stats = state
        .stats
        .toggle_comment_action(user.user_id, comment_id, kind, &token)
        .await?;
    Ok(Json(stats))
}

pub async fn increment_post_view(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> AppResult<Json<serde_json::Value>> {
    let token = CancellationToken::new();
    let count = state.stats.increment_post_view(post_id, &token).await?;
    Ok(Json(serde_json::json!({ "view_count": count })))
}

pub async fn get_post_stats(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
    OptionalUser(user): OptionalUser,
) -> AppResult<Json<StatsResponse<PostStats>>> {
    let token = CancellationToken::new();
    let (stats, flags) = state
        .stats
        .get_post_stats(post_id, user.map(|u| u.user_id), &token)
        .await?;
    Ok(Json(StatsResponse { stats, flags }))
}

#[derive(Debug, Deserialize)]
pub struct BatchStatsQuery {
    pub ids: String,
}

#[derive(Debug, Serialize)]
pub struct BatchStatsEntry {
    pub id: i64,
    #[serde(flatten)]
    pub stats: PostStats,
    #[serde(flatten)]
    pub flags: ActionFlags,
}

pub async fn batch_get_post_stats(
    State(state): State<AppState>,
    Query(query): Query<BatchStatsQuery>,
    OptionalUser(user): OptionalUser,
) -> AppResult<Json<Vec<BatchStatsEntry>>> {
    let ids: Vec<i64> = query
        .ids
        .split(',')
        .filter(|s| !s.trim().is_empty())
        .map(|s| {
            s.trim()
                .parse::<i64>()
                .map_err(|_| AppError::InvalidInput(format!("invalid post id {s:?}")))
        })
        .collect::<AppResult<_>>()?;

    let token = CancellationToken::new();
    let results = state
        .stats
        .batch_get_post_stats(&ids, user.map(|u| u.user_id), &token)
        .await?;

    Ok(Json(
        results
            .into_iter()
            .map(|(id, stats, flags)| BatchStatsEntry { id, stats, flags })
            .collect(),
    ))
}
