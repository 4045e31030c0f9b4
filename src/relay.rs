use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info};

use crate::command::{self, ParsedRequest, HELP_TEXT};
use crate::normalize;
use crate::platform::IncomingMessage;
use crate::webhook::{OutboundPayload, PayloadFormat, Webhook};

/// Turns chat messages into webhook calls and webhook replies into chat text.
/// Platform-agnostic and stateless between messages.
pub struct Relay {
    webhook: Arc<dyn Webhook>,
    format: PayloadFormat,
    timeout: Duration,
}

impl Relay {
    pub fn new(webhook: Arc<dyn Webhook>, format: PayloadFormat, timeout: Duration) -> Self {
        Self {
            webhook,
            format,
            timeout,
        }
    }

    /// The command in `incoming`, or `None` when it must be ignored
    /// (bot author or no recognized trigger).
    pub fn accept(&self, incoming: &IncomingMessage) -> Option<ParsedRequest> {
        if incoming.author_is_bot {
            return None;
        }
        command::parse(&incoming.text)
    }

    /// Reply for an accepted command. Calls the webhook at most once.
    pub async fn respond(&self, incoming: &IncomingMessage, request: &ParsedRequest) -> String {
        info!(
            "{} command from {} ({}) on {} channel {}",
            request.command,
            incoming.user_name,
            incoming.user_id,
            incoming.platform,
            incoming.chat_id
        );

        if request.is_missing_text() {
            return HELP_TEXT.to_string();
        }

        let payload = self.payload(request, incoming);
        let reply = match self.webhook.call(&payload, self.timeout).await {
            Ok(result) => {
                debug!("Webhook answered {} for {}", result.status, request.command);
                normalize::render(result.json.as_ref(), &result.raw_text, request.command)
            }
            Err(e) => {
                error!("Webhook call for {} failed: {}", request.command, e);
                e.user_message()
            }
        };

        normalize::limit_reply(&reply)
    }

    fn payload(&self, request: &ParsedRequest, incoming: &IncomingMessage) -> OutboundPayload {
        match self.format {
            PayloadFormat::Actions => OutboundPayload::Actions {
                action: request.command.as_str().to_string(),
                text: request.text.clone(),
                user_name: incoming.user_name.clone(),
            },
            PayloadFormat::Legacy => OutboundPayload::Legacy {
                text: request.text.clone(),
                usuario_discord: incoming.user_id.clone(),
                canal_id: incoming.chat_id.clone(),
                mensaje_id: incoming.message_id.clone(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::webhook::{WebhookError, WebhookResult};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records every call and answers with a fixed outcome.
    struct FakeWebhook {
        calls: Mutex<Vec<(OutboundPayload, Duration)>>,
        reply: fn() -> Result<WebhookResult, WebhookError>,
    }

    impl FakeWebhook {
        fn new(reply: fn() -> Result<WebhookResult, WebhookError>) -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                reply,
            })
        }

        fn calls(&self) -> Vec<(OutboundPayload, Duration)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Webhook for FakeWebhook {
        async fn call(
            &self,
            payload: &OutboundPayload,
            timeout: Duration,
        ) -> Result<WebhookResult, WebhookError> {
            self.calls.lock().unwrap().push((payload.clone(), timeout));
            (self.reply)()
        }
    }

    fn ok_body(body: &str) -> Result<WebhookResult, WebhookError> {
        Ok(WebhookResult::from_body(200, body.to_string()))
    }

    fn message(text: &str) -> IncomingMessage {
        IncomingMessage {
            platform: "discord".to_string(),
            user_id: "1001".to_string(),
            user_name: "ana".to_string(),
            chat_id: "2002".to_string(),
            message_id: "3003".to_string(),
            text: text.to_string(),
            author_is_bot: false,
        }
    }

    fn relay(webhook: Arc<FakeWebhook>, format: PayloadFormat) -> Relay {
        Relay::new(webhook, format, Duration::from_secs(90))
    }

    /// Accept-then-respond, as the platform handler does it.
    async fn answer(relay: &Relay, incoming: &IncomingMessage) -> Option<String> {
        let request = relay.accept(incoming)?;
        Some(relay.respond(incoming, &request).await)
    }

    #[tokio::test]
    async fn test_non_command_gets_no_reply() {
        let webhook = FakeWebhook::new(|| ok_body("{}"));
        let relay = relay(webhook.clone(), PayloadFormat::Actions);

        assert_eq!(relay.accept(&message("hello everyone")), None);
        assert_eq!(answer(&relay, &message("hello everyone")).await, None);
        assert!(webhook.calls().is_empty());
    }

    #[tokio::test]
    async fn test_bot_authors_are_ignored() {
        let webhook = FakeWebhook::new(|| ok_body("{}"));
        let relay = relay(webhook.clone(), PayloadFormat::Actions);

        let mut incoming = message("!create Valorant");
        incoming.author_is_bot = true;
        assert_eq!(relay.accept(&incoming), None);
        assert_eq!(answer(&relay, &incoming).await, None);
        assert!(webhook.calls().is_empty());
    }

    #[tokio::test]
    async fn test_accepted_request_is_answered_without_reparsing() {
        let webhook = FakeWebhook::new(|| ok_body(r#"{"ok":true,"deletedCount":1}"#));
        let relay = relay(webhook.clone(), PayloadFormat::Actions);

        let incoming = message("!DELETE Catan");
        let request = relay.accept(&incoming).unwrap();
        assert_eq!(request.command, command::Command::Delete);
        assert_eq!(request.text, "Catan");

        // the reply follows the accepted request, not a fresh parse of the text
        let mut edited = incoming.clone();
        edited.text = "no longer a command".to_string();
        let reply = relay.respond(&edited, &request).await;
        assert_eq!(reply, "🗑️ Deleted: 1");
        assert_eq!(webhook.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_text_sends_help_without_calling() {
        let webhook = FakeWebhook::new(|| ok_body("{}"));
        let relay = relay(webhook.clone(), PayloadFormat::Actions);

        for raw in ["!create", "!UPDATE  ", "!delete"] {
            assert_eq!(answer(&relay, &message(raw)).await.as_deref(), Some(HELP_TEXT));
        }
        assert!(webhook.calls().is_empty());
    }

    #[tokio::test]
    async fn test_empty_search_calls_webhook() {
        let webhook = FakeWebhook::new(|| ok_body(r#"{"ok":true,"action":"search","results":[]}"#));
        let relay = relay(webhook.clone(), PayloadFormat::Actions);

        let reply = answer(&relay, &message("!search")).await;
        assert_eq!(reply.as_deref(), Some(normalize::NO_MATCHES));

        let calls = webhook.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0].0,
            OutboundPayload::Actions {
                action: "search".to_string(),
                text: String::new(),
                user_name: "ana".to_string(),
            }
        );
        assert_eq!(calls[0].1, Duration::from_secs(90));
    }

    #[tokio::test]
    async fn test_create_round_trip() {
        let webhook = FakeWebhook::new(|| {
            ok_body(r#"{"ok":true,"action":"create","insertedId":"42","document":"{\"gameName\":\"Valorant\",\"maxPlayers\":5,\"players\":[\"a\",\"b\"]}"}"#)
        });
        let relay = relay(webhook.clone(), PayloadFormat::Actions);

        let reply = answer(&relay, &message("!Create Valorant for 5")).await.unwrap();
        assert!(reply.contains("42"));
        assert!(reply.contains("Valorant"));
        assert!(reply.contains("2/5"));
        assert!(reply.contains("a, b"));

        let calls = webhook.calls();
        assert_eq!(calls.len(), 1);
        assert!(matches!(
            &calls[0].0,
            OutboundPayload::Actions { action, text, .. } if action == "create" && text == "Valorant for 5"
        ));
    }

    #[tokio::test]
    async fn test_timeout_replies_once_without_retry() {
        let webhook = FakeWebhook::new(|| Err(WebhookError::Timeout(Duration::from_secs(90))));
        let relay = relay(webhook.clone(), PayloadFormat::Actions);

        let reply = answer(&relay, &message("!delete Catan")).await.unwrap();
        assert!(reply.contains("timed out after 90s"));
        assert_eq!(webhook.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_transport_failure_names_the_kind() {
        let webhook =
            FakeWebhook::new(|| Err(WebhookError::Connect("connection refused".to_string())));
        let relay = relay(webhook.clone(), PayloadFormat::Actions);

        let reply = answer(&relay, &message("!update Catan add bob")).await.unwrap();
        assert!(reply.starts_with("❌"));
        assert!(reply.contains("connection failed: connection refused"));
    }

    #[tokio::test]
    async fn test_empty_body_warns() {
        let webhook = FakeWebhook::new(|| ok_body(""));
        let relay = relay(webhook.clone(), PayloadFormat::Actions);

        let reply = answer(&relay, &message("!create x")).await;
        assert_eq!(reply.as_deref(), Some(normalize::EMPTY_RESPONSE));
    }

    #[tokio::test]
    async fn test_long_plain_text_is_capped() {
        let webhook = FakeWebhook::new(|| ok_body(&"y".repeat(5000)));
        let relay = relay(webhook.clone(), PayloadFormat::Actions);

        let reply = answer(&relay, &message("!search")).await.unwrap();
        assert!(reply.chars().count() <= 2000);
        assert!(reply.ends_with(normalize::ELLIPSIS));
    }

    #[tokio::test]
    async fn test_legacy_payload_shape() {
        let webhook = FakeWebhook::new(|| ok_body(r#"{"ok":true,"insertedId":"7"}"#));
        let relay = relay(webhook.clone(), PayloadFormat::Legacy);

        let reply = answer(&relay, &message("!create crea una partida")).await.unwrap();
        assert!(reply.contains("🆔 ID: 7"));

        assert_eq!(
            webhook.calls()[0].0,
            OutboundPayload::Legacy {
                text: "crea una partida".to_string(),
                usuario_discord: "1001".to_string(),
                canal_id: "2002".to_string(),
                mensaje_id: "3003".to_string(),
            }
        );
    }
}
