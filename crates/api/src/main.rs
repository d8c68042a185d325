use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clubhouse_api::background;
use clubhouse_api::config::ServerConfig;
use clubhouse_api::router::build_app_router;
use clubhouse_api::state::AppState;
use clubhouse_api::storage::LocalStorage;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "clubhouse_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env()?;

    let database_url =
        std::env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set in the environment")?;

    let pool = clubhouse_db::create_pool(&database_url).await?;
    tracing::info!("Database connection pool created");

    clubhouse_db::health_check(&pool).await?;
    tracing::info!("Database health check passed");

    clubhouse_db::run_migrations(&pool).await?;
    tracing::info!("Database migrations applied");

    let storage = LocalStorage::new(config.files_dir.clone());
    tokio::fs::create_dir_all(storage.root()).await?;
    tracing::info!(files_dir = %storage.root().display(), "File storage ready");

    // --- Background tasks ---
    let cancel = CancellationToken::new();
    let sweep_handle = tokio::spawn(background::billing_sweep::run(
        pool.clone(),
        Duration::from_secs(config.billing_sweep_interval_secs),
        cancel.clone(),
    ));

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let shutdown_timeout = Duration::from_secs(config.shutdown_timeout_secs);

    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        storage: Arc::new(storage),
    };
    let app = build_app_router(state, &config);

    tracing::info!(%addr, "Starting server");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    cancel.cancel();
    if tokio::time::timeout(shutdown_timeout, sweep_handle)
        .await
        .is_err()
    {
        tracing::warn!("Billing sweep did not stop before the shutdown timeout");
    }

    tracing::info!("Server shut down");
    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
