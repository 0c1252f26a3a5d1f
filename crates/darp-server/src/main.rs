mod api;
mod middleware;
mod scheduler;

use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, default_rate_limit_state, AppState},
    middleware::AuthState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Arc::new(darp_core::load_app_config()?);
    init_tracing(&config)?;
    tracing::info!(env = %config.env, addr = %config.bind_addr, "starting darp-server");

    let pool = darp_db::connect_pool(
        &config.database_url,
        darp_db::PoolConfig::from_app_config(&config),
    )
    .await?;
    let applied = darp_db::run_migrations(&pool).await?;
    if applied > 0 {
        tracing::info!(applied, "applied pending migrations");
    }

    // Held for the lifetime of the process; dropping it stops the sweep.
    let _scheduler = scheduler::build_scheduler(pool.clone()).await?;

    let auth = AuthState::from_env(matches!(config.env, darp_core::Environment::Development))?;
    let state = AppState {
        pool,
        config: Arc::clone(&config),
        pipeline: Arc::new(darp_scoring::ScoringPipeline::from_app_config(&config)),
    };
    let app = build_app(state, auth, default_rate_limit_state());

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    // Connect info feeds the peer-keyed rate limiter for tokenless requests.
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;
    Ok(())
}

fn init_tracing(config: &darp_core::AppConfig) -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&config.log_level))?;
    tracing_subscriber::fmt().with_env_filter(filter).init();
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut term = signal(SignalKind::terminate()).expect("failed to install signal handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = term.recv() => {}
        }
    }

    #[cfg(not(unix))]
    tokio::signal::ctrl_c()
        .await
        .expect("failed to listen for ctrl-c");

    tracing::info!("shutdown signal received, draining connections");
}
