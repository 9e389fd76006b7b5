//! pokeforum-core
//! Mission: serve the engagement-stats and daily sign-in pipeline over
//! HTTP, with a background persister and task runtime.

use anyhow::{Context, Result};
use pokeforum_core::auth::JwtHandler;
use pokeforum_core::config::AppConfig;
use pokeforum_core::durable::DurableStore;
use pokeforum_core::hotstore::{HotStore, RedisHotStore};
use pokeforum_core::persister::Persister;
use pokeforum_core::signin::SigninEngine;
use pokeforum_core::stats::StatsCore;
use pokeforum_core::tasks::model::Priority;
use pokeforum_core::tasks::TaskRuntime;
use pokeforum_core::{api, AppState};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = AppConfig::from_env().context("loading configuration")?;
    info!(bind_addr = %config.bind_addr, "starting pokeforum-core");

    let hot: Arc<dyn HotStore> = Arc::new(
        RedisHotStore::connect(&config.hotstore_url)
            .await
            .context("connecting to hot store")?,
    );
    let durable = DurableStore::open(&config.durable_db_path).context("opening durable store")?;
    let jwt = Arc::new(JwtHandler::new(config.jwt_secret.clone()));

    let stats = Arc::new(StatsCore::new(hot.clone(), durable.clone(), config.stats_hot_ttl));
    let signin = Arc::new(SigninEngine::new(
        hot.clone(),
        durable.clone(),
        config.signin_lock_ttl,
        config.signin_timezone_offset_minutes,
        config.reward.clone(),
    ));

    let config = Arc::new(config);
    let state = AppState {
        config: config.clone(),
        hot: hot.clone(),
        durable: durable.clone(),
        stats,
        signin,
        jwt,
    };

    let shutdown = CancellationToken::new();

    let persister = Arc::new(Persister::new(
        hot.clone(),
        durable.clone(),
        config.persister_interval,
        config.persister_batch_size,
    ));
    let persister_token = shutdown.clone();
    let persister_loop = persister.clone();
    let persister_handle = tokio::spawn(async move {
        persister_loop.run(persister_token).await;
    });

    let task_runtime = Arc::new(TaskRuntime::new(4));

    let stats_sync_persister = persister.clone();
    let stats_sync_token = shutdown.clone();
    task_runtime
        .register_handler(
            "stats:sync",
            Arc::new(move |_payload: String| {
                let persister = stats_sync_persister.clone();
                let token = stats_sync_token.clone();
                async move {
                    persister.run_once(&token).await;
                    Ok(())
                }
            }),
        )
        .await;

    let signin_persist_persister = persister.clone();
    let signin_persist_token = shutdown.clone();
    task_runtime
        .register_handler(
            "signin:persist",
            Arc::new(move |_payload: String| {
                let persister = signin_persist_persister.clone();
                let token = signin_persist_token.clone();
                async move {
                    persister.run_once(&token).await;
                    Ok(())
                }
            }),
        )
        .await;

    task_runtime
        .register_schedule(
            &format!("@every {}s", config.persister_interval.as_secs().max(1)),
            "stats:sync",
            "",
            Priority::Default,
        )
        .await
        .context("registering stats:sync schedule")?;

    task_runtime.start().await;
    info!("task runtime started");

    let app = api::router(state);

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.bind_addr))?;
    info!(bind_addr = %config.bind_addr, "listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

    shutdown.cancel();
    task_runtime.stop().await;
    if let Err(e) = persister_handle.await {
        warn!(error = %e, "persister task panicked");
    }

    info!("pokeforum-core stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received, draining in-flight work");
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pokeforum_core=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
