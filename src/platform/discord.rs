use std::sync::Arc;

use anyhow::{Context as _, Result};
use serenity::async_trait;
use serenity::model::channel::Message;
use serenity::model::gateway::Ready;
use serenity::prelude::*;
use tracing::{debug, error, info, warn};

use crate::platform::IncomingMessage;
use crate::relay::Relay;

struct Handler {
    relay: Arc<Relay>,
}

impl Handler {
    fn incoming(msg: &Message) -> IncomingMessage {
        IncomingMessage {
            platform: "discord".to_string(),
            user_id: msg.author.id.to_string(),
            user_name: msg.author.name.clone(),
            chat_id: msg.channel_id.to_string(),
            message_id: msg.id.to_string(),
            text: msg.content.clone(),
            author_is_bot: msg.author.bot,
        }
    }
}

#[async_trait]
impl EventHandler for Handler {
    async fn message(&self, ctx: Context, msg: Message) {
        let incoming = Self::incoming(&msg);
        let Some(request) = self.relay.accept(&incoming) else {
            return;
        };

        debug!(
            "Discord message {} from {} ({})",
            incoming.message_id, incoming.user_name, incoming.user_id
        );

        if let Err(e) = msg.channel_id.broadcast_typing(&ctx.http).await {
            debug!("Typing indicator failed: {}", e);
        }

        let reply = self.relay.respond(&incoming, &request).await;

        if let Err(e) = msg.channel_id.say(&ctx.http, reply).await {
            error!(
                "Failed to send reply to channel {}: {}",
                incoming.chat_id, e
            );
        }
    }

    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!("Connected to Discord as {}", ready.user.name);
    }
}

/// Run the Discord gateway loop until Ctrl-C.
pub async fn run(relay: Arc<Relay>, token: &str) -> Result<()> {
    info!("Starting Discord platform...");

    let intents = GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::DIRECT_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    let mut client = Client::builder(token, intents)
        .event_handler(Handler { relay })
        .await
        .context("Failed to create Discord client")?;

    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutdown requested, closing Discord connection");
                shard_manager.shutdown_all().await;
            }
            Err(e) => warn!("Could not listen for Ctrl-C: {}", e),
        }
    });

    client
        .start()
        .await
        .context("Discord client stopped with an error")?;

    Ok(())
}
