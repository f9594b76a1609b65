mod bot;
mod config;
mod error;
mod llm;
mod platform;
mod prediction;
mod web;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::llm::GroqClient;
use crate::platform::telegram::TelegramMessenger;
use crate::prediction::ArtifactRegressor;
use crate::web::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,dsai_web=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    info!("Loading configuration from: {}", config_path.display());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    info!("Configuration loaded successfully");
    info!("  Completion API: {}", config.llm.base_url);
    info!(
        "  Models: {} / {}",
        config.llm.llama_model, config.llm.deepseek_model
    );
    info!("  Webhook URL: {}", config.telegram.webhook_url());
    info!(
        "  Regression artifact: {}",
        config.prediction.artifact_path.display()
    );

    // Clients are built once and shared by every request
    let state = Arc::new(AppState {
        completion: Arc::new(GroqClient::new(config.llm.clone())),
        messenger: Arc::new(TelegramMessenger::new(&config.telegram.bot_token)),
        regressor: Arc::new(ArtifactRegressor::new(
            config.prediction.artifact_path.clone(),
        )),
        config,
    });

    let addr = state.config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    info!("Listening on http://{}", addr);

    axum::serve(listener, web::router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await
        .context("Server error")?;

    Ok(())
}
