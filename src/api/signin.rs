//! Sign-in HTTP handlers
//! Mission: expose `SigninEngine` over the wire (spec section 6).

use crate::auth::middleware::AuthenticatedUser;
use crate::error::{AppError, AppResult};
use crate::signin::model::{ContinuousRankingEntry, DailyRankingEntry, SigninOutcome};
use crate::state::AppState;
use axum::extract::{Query, State};
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

pub async fn signin(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<SigninOutcome>> {
    let token = CancellationToken::new();
    let outcome = state.signin.signin(user.user_id, &token).await?;
    Ok(Json(outcome))
}

#[derive(Debug, Deserialize)]
pub struct DailyRankingQuery {
    pub date: Option<String>,
    pub limit: Option<usize>,
}

pub async fn daily_ranking(
    State(state): State<AppState>,
    Query(query): Query<DailyRankingQuery>,
) -> AppResult<Json<Vec<DailyRankingEntry>>> {
    let date = match query.date {
        Some(d) => NaiveDate::parse_from_str(&d, "%Y-%m-%d")
            .map_err(|_| AppError::InvalidInput(format!("invalid date {d:?}, expected YYYY-MM-DD")))?,
        None => chrono::Utc::now().date_naive(),
    };
    let limit = query.limit.unwrap_or(100).min(1000);
    let token = CancellationToken::new();
    let ranking = state.signin.daily_ranking(date, limit, &token).await?;
    Ok(Json(ranking))
}

#[derive(Debug, Deserialize)]
pub struct ContinuousRankingQuery {
    pub limit: Option<usize>,
}

pub async fn continuous_ranking(
    State(state): State<AppState>,
    Query(query): Query<ContinuousRankingQuery>,
) -> AppResult<Json<Vec<ContinuousRankingEntry>>> {
    let limit = query.limit.unwrap_or(100).min(1000);
    let ranking = state.signin.continuous_ranking(limit).await?;
    Ok(Json(ranking))
}
