use std::fmt;

/// Sent when a command is recognized but the text it needs is missing.
pub const HELP_TEXT: &str = "ℹ️ Available commands:\n\
     `!create <text>` - create a game from a free-form description\n\
     `!search [text]` - search games (empty text lists everything)\n\
     `!update <text>` - update a game\n\
     `!delete <text>` - delete a game\n\n\
     Examples:\n\
     `!create a game called Valorant for 5 players`\n\
     `!search valorant`";

/// The fixed set of actions the webhook understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Create,
    Search,
    Update,
    Delete,
}

impl Command {
    pub const ALL: [Command; 4] = [
        Command::Create,
        Command::Search,
        Command::Update,
        Command::Delete,
    ];

    /// Literal chat prefix bound to this action (always lowercase).
    pub fn trigger(self) -> &'static str {
        match self {
            Command::Create => "!create",
            Command::Search => "!search",
            Command::Update => "!update",
            Command::Delete => "!delete",
        }
    }

    /// Action name as sent to the webhook.
    pub fn as_str(self) -> &'static str {
        match self {
            Command::Create => "create",
            Command::Search => "search",
            Command::Update => "update",
            Command::Delete => "delete",
        }
    }

    /// Only search may be sent without text.
    pub fn requires_text(self) -> bool {
        !matches!(self, Command::Search)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRequest {
    pub command: Command,
    pub text: String,
}

impl ParsedRequest {
    /// True when the remainder is empty but the command needs it.
    pub fn is_missing_text(&self) -> bool {
        self.command.requires_text() && self.text.is_empty()
    }
}

/// Classify raw chat text. `None` means "not a command": the caller must
/// not reply at all.
pub fn parse(raw: &str) -> Option<ParsedRequest> {
    let content = raw.trim();

    Command::ALL.into_iter().find_map(|command| {
        let trigger = command.trigger();
        let head = content.get(..trigger.len())?;
        if !head.eq_ignore_ascii_case(trigger) {
            return None;
        }

        // `!createfoo` is not `!create foo`
        let rest = &content[trigger.len()..];
        if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
            return None;
        }

        Some(ParsedRequest {
            command,
            text: rest.trim().to_string(),
        })
    })
}
