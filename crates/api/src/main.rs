mod config;
mod error;
mod middleware;
mod notify;
mod routes;
mod state;

use std::sync::Arc;

use anyhow::Context;
use sitepress_core::EventBus;
use sitepress_publish::{GitHubStore, MemoryStore, ObjectStore, Publisher};
use tracing_subscriber::EnvFilter;

use crate::config::{AppConfig, Backend};
use crate::notify::TelegramNotifier;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (dev convenience)
    let _ = dotenvy::dotenv();

    let config = AppConfig::from_env().context("failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .json()
        .init();

    tracing::info!("Starting sitepress API server");

    let (store, github): (Arc<dyn ObjectStore>, Option<GitHubStore>) = match config.backend {
        Backend::GitHub => {
            let github_config = config
                .github
                .clone()
                .context("GitHub backend selected without repository settings")?;
            let github = GitHubStore::new(github_config).context("failed to build GitHub client")?;
            tracing::info!(
                owner = %github.config().owner,
                repo = %github.config().repo,
                branch = %config.publisher.branch,
                "publishing to GitHub"
            );
            let store: Arc<dyn ObjectStore> = Arc::new(github.clone());
            (store, Some(github))
        }
        Backend::Memory => {
            tracing::warn!("memory backend selected; publishes are lost on restart");
            let store: Arc<dyn ObjectStore> = Arc::new(MemoryStore::new());
            (store, None)
        }
    };

    let publisher = Publisher::new(store, config.publisher.clone());

    let notifier = match config.telegram.clone() {
        Some(telegram) => {
            let client = reqwest::Client::builder()
                .timeout(config.request_timeout)
                .build()
                .context("failed to build notification client")?;
            Some(TelegramNotifier::new(client, telegram))
        }
        None => {
            tracing::info!("booking relay disabled (TELEGRAM_BOT_TOKEN / TELEGRAM_CHAT_ID unset)");
            None
        }
    };

    let event_bus = EventBus::new(config.event_bus_capacity);

    let state = state::AppState::new(publisher, github, notifier, event_bus, config.clone());

    // Build router with middleware
    let app = routes::build_router(state)
        .layer(middleware::request_tracing::trace_layer())
        .layer(middleware::cors::cors_layer());

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("Listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shut down gracefully");
    Ok(())
}

/// Wait for SIGINT (Ctrl+C) or SIGTERM for graceful shutdown.
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
        _ = ctrl_c => { tracing::info!("Received Ctrl+C, shutting down..."); }
        _ = terminate => { tracing::info!("Received SIGTERM, shutting down..."); }
    }
}
