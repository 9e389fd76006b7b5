//! Shared application state
//! Mission: the handles every HTTP handler needs, built once in main.rs
//! and cloned (cheaply, via Arc) into every request.

use crate::auth::jwt::JwtHandler;
use crate::config::AppConfig;
use crate::durable::DurableStore;
use crate::hotstore::HotStore;
use crate::signin::SigninEngine;
use crate::stats::StatsCore;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub hot: Arc<dyn HotStore>,
    pub durable: DurableStore,
    pub stats: Arc<StatsCore>,
    pub signin: Arc<SigninEngine>,
    pub jwt: Arc<JwtHandler>,
}
