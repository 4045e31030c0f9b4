use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::info;

use crate::webhook::PayloadFormat;

pub const PLACEHOLDER_TOKEN: &str = "PUT_YOUR_TOKEN_HERE";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub discord: DiscordConfig,
    #[serde(default)]
    pub webhook: WebhookConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DiscordConfig {
    #[serde(default = "default_token")]
    pub token: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WebhookConfig {
    #[serde(default = "default_webhook_url")]
    pub url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Request body shape expected by the workflow
    #[serde(default)]
    pub payload: PayloadFormat,
}

impl WebhookConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            token: default_token(),
        }
    }
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            url: default_webhook_url(),
            timeout_secs: default_timeout_secs(),
            payload: PayloadFormat::default(),
        }
    }
}

fn default_token() -> String {
    PLACEHOLDER_TOKEN.to_string()
}

fn default_webhook_url() -> String {
    "http://localhost:5678/webhook/discord-query".to_string()
}

fn default_timeout_secs() -> u64 {
    90
}

impl Config {
    /// Load from an optional TOML file, then apply environment overrides.
    /// A missing file is not an error: every setting has a fallback.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            Self::parse(&content)?
        } else {
            info!(
                "No config file at {}, using environment and defaults",
                path.display()
            );
            Config::default()
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config file")
    }

    /// `DISCORD_TOKEN`, `N8N_WEBHOOK_URL` and `WEBHOOK_TIMEOUT_SECS` win over the file.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(token) = var("DISCORD_TOKEN") {
            self.discord.token = token;
        }
        if let Some(url) = var("N8N_WEBHOOK_URL") {
            self.webhook.url = url;
        }
        if let Some(secs) = var("WEBHOOK_TIMEOUT_SECS") {
            self.webhook.timeout_secs = secs
                .trim()
                .parse::<u64>()
                .with_context(|| format!("WEBHOOK_TIMEOUT_SECS is not a number: {}", secs))?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.discord.token.trim().is_empty() || self.discord.token == PLACEHOLDER_TOKEN {
            anyhow::bail!("Discord token is not set (DISCORD_TOKEN or [discord] token)");
        }
        if self.webhook.timeout_secs == 0 {
            anyhow::bail!("Webhook timeout must be at least one second");
        }
        Ok(())
    }
}
