use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::WebhookConfig;

/// Which request body shape the webhook expects.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PayloadFormat {
    /// `{action, text, userName}`
    #[default]
    Actions,
    /// `{text, usuarioDiscord, canalId, mensajeId}` of the older single-command workflow.
    Legacy,
}

impl std::fmt::Display for PayloadFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PayloadFormat::Actions => write!(f, "actions"),
            PayloadFormat::Legacy => write!(f, "legacy"),
        }
    }
}

/// Request body, serialized verbatim.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OutboundPayload {
    #[serde(rename_all = "camelCase")]
    Actions {
        action: String,
        text: String,
        user_name: String,
    },
    #[serde(rename_all = "camelCase")]
    Legacy {
        text: String,
        usuario_discord: String,
        canal_id: String,
        mensaje_id: String,
    },
}

/// Raw outcome of a completed HTTP exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct WebhookResult {
    pub status: u16,
    /// `None` for empty or non-JSON bodies; distinct from a parsed `null`.
    pub json: Option<Value>,
    pub raw_text: String,
}

impl WebhookResult {
    pub fn from_body(status: u16, body: String) -> Self {
        if body.trim().is_empty() {
            return Self {
                status,
                json: None,
                raw_text: String::new(),
            };
        }

        let json = serde_json::from_str(&body).ok();
        Self {
            status,
            json,
            raw_text: body,
        }
    }
}

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("timed out after {}s", .0.as_secs())]
    Timeout(Duration),
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("request failed: {0}")]
    Request(String),
}

impl WebhookError {
    fn classify(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            WebhookError::Timeout(timeout)
        } else if err.is_connect() {
            WebhookError::Connect(err.to_string())
        } else {
            WebhookError::Request(err.to_string())
        }
    }

    /// Chat text for a failed call.
    pub fn user_message(&self) -> String {
        match self {
            WebhookError::Timeout(_) => format!("⏱️ Webhook call failed: {}", self),
            _ => format!("❌ Webhook call failed: {}", self),
        }
    }
}

/// One POST to the automation endpoint. No retries.
#[async_trait]
pub trait Webhook: Send + Sync {
    async fn call(
        &self,
        payload: &OutboundPayload,
        timeout: Duration,
    ) -> Result<WebhookResult, WebhookError>;
}

pub struct WebhookClient {
    client: reqwest::Client,
    url: String,
}

impl WebhookClient {
    pub fn new(config: &WebhookConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: config.url.clone(),
        }
    }
}

#[async_trait]
impl Webhook for WebhookClient {
    async fn call(
        &self,
        payload: &OutboundPayload,
        timeout: Duration,
    ) -> Result<WebhookResult, WebhookError> {
        debug!("Posting to webhook: {}", self.url);

        let response = self
            .client
            .post(&self.url)
            .timeout(timeout)
            .json(payload)
            .send()
            .await
            .map_err(|e| WebhookError::classify(e, timeout))?;

        let status = response.status();
        if !status.is_success() {
            warn!("Webhook answered with status {}", status);
        }

        let body = response
            .text()
            .await
            .map_err(|e| WebhookError::classify(e, timeout))?;

        debug!("Webhook body length: {} bytes", body.len());

        Ok(WebhookResult::from_body(status.as_u16(), body))
    }
}
