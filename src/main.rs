mod command;
mod config;
mod normalize;
mod platform;
mod relay;
mod webhook;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::relay::Relay;
use crate::webhook::WebhookClient;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,relaybot=debug".into()),
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
    info!("  Webhook: {}", config.webhook.url);
    info!("  Timeout: {}s", config.webhook.timeout_secs);
    info!("  Payload format: {}", config.webhook.payload);

    // The webhook client lives for the whole process and is dropped on shutdown
    let webhook = Arc::new(WebhookClient::new(&config.webhook));
    let relay = Arc::new(Relay::new(
        webhook,
        config.webhook.payload,
        config.webhook.timeout(),
    ));

    info!("Bot is starting...");
    platform::discord::run(relay, &config.discord.token).await?;

    info!("Bot stopped");
    Ok(())
}
