mod auth;
mod cache;
mod config;
mod db;
mod error;
mod invoices;
mod models;
mod routes;

use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::auth::AccessGate;
use crate::cache::ViewCache;
use crate::invoices::InvoiceActions;
use crate::routes::{AppState, create_router};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = config::init()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    info!("Initializing invoice dashboard...");

    // Initialize database connection
    let db = Arc::new(db::init(&config).await?);
    info!("Database connection established");

    let views = ViewCache::with_capacity(config.view_cache_capacity);
    let state = AppState {
        actions: InvoiceActions::new(db.clone(), Arc::new(views.clone())),
        queries: db,
        views,
    };

    let gate = config.auth_token.as_deref().map(AccessGate::new);
    if gate.is_none() {
        info!("AUTH_TOKEN not set, dashboard is not gated");
    }

    let app = create_router(state, gate);

    let addr = config.bind_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {}", e);
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
                tracing::error!("failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("signal received, starting graceful shutdown");
}
