pub mod discord;

/// A message received from the chat platform
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    /// Platform identifier (e.g., "discord")
    pub platform: String,
    /// Platform-specific author ID as string
    pub user_id: String,
    /// Display name of the author
    pub user_name: String,
    /// Channel the message was posted in
    pub chat_id: String,
    pub message_id: String,
    /// The message text
    pub text: String,
    /// Messages written by bots (including ourselves) are never answered
    pub author_is_bot: bool,
}
