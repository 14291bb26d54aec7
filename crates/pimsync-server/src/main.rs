mod api;
mod locks;
mod middleware;
mod scheduler;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, AppState},
    locks::JobLocks,
    middleware::CronAuth,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Arc::new(pimsync_core::load_app_config()?);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = pimsync_db::PoolConfig::from_app_config(&config);
    let pool = pimsync_db::connect_pool(&config.database_url, pool_config).await?;
    pimsync_db::run_migrations(&pool).await?;

    let sync = Arc::new(pimsync_sync::SyncContext::from_config(&config, pool.clone())?);
    let locks = JobLocks::default();

    let _scheduler = if config.scheduler_enabled {
        Some(
            scheduler::build_scheduler(&config, pool.clone(), Arc::clone(&sync), locks.clone())
                .await?,
        )
    } else {
        tracing::info!("scheduler disabled; jobs run only on request");
        None
    };

    let auth = CronAuth::from_config(&config)?;
    let app = build_app(AppState { pool, sync, locks }, auth);

    tracing::info!(bind_addr = %config.bind_addr, env = %config.env, "pimsync-server listening");
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
