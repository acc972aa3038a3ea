//! # Taskboard API Server
//!
//! Multi-user kanban boards over HTTP with live updates over WebSocket.
//!
//! ## Usage
//!
//! ```bash
//! JWT_SECRET=... DATABASE_URL=postgresql://localhost/taskboard cargo run -p taskboard-api
//! STORE_BACKEND=memory JWT_SECRET=... cargo run -p taskboard-api
//! ```

use std::sync::Arc;

use anyhow::Context;
use sqlx::PgPool;
use taskboard_api::{
    app::{build_router, AppState},
    config::{Config, StoreBackend},
};
use taskboard_shared::{
    db::{migrations, pool},
    store::{BoardStore, MemoryBoardStore, PgBoardStore},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "taskboard_api=debug,taskboard_shared=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "Taskboard API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::from_env()?;
    let (store, pg_pool) = open_store(&config).await?;

    let state = AppState::new(store, config.clone());
    let broadcaster = state.broadcaster.clone();
    let app = build_router(state);

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;
    tracing::info!("Server listening on http://{}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    broadcaster.shutdown().await;
    if let Some(pool) = pg_pool {
        pool::close_pool(&pool).await;
    }

    tracing::info!("Server stopped");
    Ok(())
}

/// Builds the configured record store; Postgres is migrated first
async fn open_store(config: &Config) -> anyhow::Result<(Arc<dyn BoardStore>, Option<PgPool>)> {
    match config.store {
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; data is lost on exit");
            Ok((Arc::new(MemoryBoardStore::new()), None))
        }
        StoreBackend::Postgres => {
            let database = config
                .database
                .as_ref()
                .context("postgres store selected without database configuration")?;

            let pg = pool::create_pool(&database.pool_config())
                .await
                .context("failed to connect to database")?;
            migrations::run_migrations(&pg)
                .await
                .context("failed to run migrations")?;

            let status = migrations::get_migration_status(&pg).await?;
            tracing::info!(
                applied = status.applied_migrations,
                latest = ?status.latest_version,
                "Database ready"
            );

            Ok((Arc::new(PgBoardStore::new(pg.clone())), Some(pg)))
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received, draining connections...");
}
