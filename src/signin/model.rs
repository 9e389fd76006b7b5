//! Sign-in domain types (spec section 4.4).

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct SigninOutcome {
    pub reward: i64,
    pub experience: i64,
    pub continuous_days: i64,
    pub total_days: i64,
    pub balance_after: i64,
    pub rank: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DailyRankingEntry {
    pub user_id: i64,
    pub username: String,
    pub continuous_days: i64,
    pub rank: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContinuousRankingEntry {
    pub user_id: i64,
    pub continuous_days: i64,
    pub total_days: i64,
}
