//! Renders the webhook's loosely-typed JSON into chat text.
//!
//! The remote workflow has no fixed schema: fields move between names,
//! documents arrive as JSON-encoded strings, lists may be missing. Every
//! lookup here goes through ordered candidate keys and degrades to a
//! placeholder instead of failing.

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::command::Command;

/// Replies longer than this are cut and marked with [`ELLIPSIS`].
pub const REPLY_SOFT_LIMIT: usize = 1900;
pub const ELLIPSIS: &str = "…";
/// Max results listed in a search reply.
pub const SEARCH_MAX_SHOWN: usize = 10;

pub const EMPTY_RESPONSE: &str =
    "⚠️ The webhook returned an empty response. Check that its 'Respond to Webhook' step returns text or valid JSON.";
pub const NOT_CONFIRMED: &str = "❌ The webhook did not confirm success (no ok=true).";
pub const NO_MATCHES: &str = "🔎 No games matched your search.";

const UNSET: &str = "(unset)";
const NO_PARTICIPANTS: &str = "(no participants)";
const NO_DOCUMENT: &str = "⚠️ No game document was received.";

/// How many string-to-JSON decodes a nested value may need.
const MAX_DECODE_DEPTH: usize = 2;
/// Chars of an undecodable document echoed back in the warning.
const RAW_SNIPPET_CHARS: usize = 300;

const ID_KEYS: &[&str] = &["insertedId", "_id", "id"];
const DOCUMENT_KEYS: &[&str] = &["document", "game", "partida"];
const NAME_KEYS: &[&str] = &["gameName", "nombrePartida"];
const MAX_KEYS: &[&str] = &["maxPlayers", "maxJugadores"];
const HOST_KEYS: &[&str] = &["host", "creador"];
const PLAYER_KEYS: &[&str] = &["players", "jugadores"];
const RESULT_KEYS: &[&str] = &["results", "games", "partidas"];
const MATCHED_KEYS: &[&str] = &["matchedCount", "matched"];
const MODIFIED_KEYS: &[&str] = &["modifiedCount", "modified"];
const DELETED_KEYS: &[&str] = &["deletedCount", "deleted"];

#[derive(Debug, Error, PartialEq)]
pub enum DecodeError {
    #[error("invalid JSON: {0}")]
    Invalid(String),
    #[error("still a string after {0} decodes")]
    TooDeep(usize),
}

/// First candidate key holding a usable value. Null and blank strings
/// count as absent.
pub fn first_present<'a>(source: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    let map = source.as_object()?;
    keys.iter()
        .filter_map(|key| map.get(*key))
        .find(|value| !is_blank(value))
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Scalar rendered for display, or `default` when absent.
pub fn first_str(source: &Value, keys: &[&str], default: &str) -> String {
    first_present(source, keys)
        .map(display_scalar)
        .unwrap_or_else(|| default.to_string())
}

/// Counter field. Accepts numbers and numeric strings.
pub fn first_u64(source: &Value, keys: &[&str], default: u64) -> u64 {
    first_present(source, keys)
        .and_then(|value| match value {
            Value::Number(n) => n
                .as_u64()
                .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
        .unwrap_or(default)
}

/// List field; anything that is not an array counts as empty.
pub fn first_list<'a>(source: &'a Value, keys: &[&str]) -> &'a [Value] {
    match first_present(source, keys) {
        Some(Value::Array(items)) => items.as_slice(),
        _ => &[],
    }
}

/// Unwraps a value that may be JSON encoded once or twice as a string.
/// Non-string values are returned unchanged.
pub fn decode_nested(value: &Value) -> Result<Value, DecodeError> {
    let mut current = value.clone();
    for _ in 0..MAX_DECODE_DEPTH {
        current = match current {
            Value::String(text) => serde_json::from_str(&text)
                .map_err(|e| DecodeError::Invalid(e.to_string()))?,
            other => return Ok(other),
        };
    }
    match current {
        Value::String(_) => Err(DecodeError::TooDeep(MAX_DECODE_DEPTH)),
        other => Ok(other),
    }
}

/// JSON truthiness for the `ok` flag.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

fn display_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// At most `max` leading chars of `text`.
fn head_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((cut, _)) => &text[..cut],
        None => text,
    }
}

/// Cut `text` to [`REPLY_SOFT_LIMIT`] chars plus an ellipsis when longer.
pub fn limit_reply(text: &str) -> String {
    let head = head_chars(text, REPLY_SOFT_LIMIT);
    if head.len() < text.len() {
        format!("{}{}", head, ELLIPSIS)
    } else {
        text.to_string()
    }
}

/// Produce the chat reply for a webhook response.
///
/// `json` is `None` when the body was empty or not JSON; `raw_text` is then
/// shown as-is. `requested` is used only when the JSON carries no `action`.
pub fn render(json: Option<&Value>, raw_text: &str, requested: Command) -> String {
    let Some(json) = json else {
        return render_raw(raw_text);
    };

    // Some workflows answer with the whole object encoded as a string.
    let unwrapped;
    let data = match json {
        Value::String(text) => match decode_nested(json) {
            Ok(value @ Value::Object(_)) => {
                unwrapped = value;
                &unwrapped
            }
            _ => return render_raw(text),
        },
        other => other,
    };

    if !data.get("ok").is_some_and(is_truthy) {
        return render_failure(data);
    }

    let action = data
        .get("action")
        .and_then(Value::as_str)
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| requested.as_str().to_string());

    debug!("Rendering webhook reply for action '{}'", action);

    match action.as_str() {
        "create" => render_create(data),
        "search" => render_search(data),
        "update" => render_update(data),
        "delete" => render_delete(data),
        other => format!("✅ OK ({})", other),
    }
}

fn render_raw(raw_text: &str) -> String {
    let trimmed = raw_text.trim();
    if trimmed.is_empty() {
        EMPTY_RESPONSE.to_string()
    } else {
        trimmed.to_string()
    }
}

fn render_failure(data: &Value) -> String {
    match data.get("error").filter(|e| is_truthy(e)) {
        Some(error) => format!("❌ Webhook error: {}", display_scalar(error)),
        None => NOT_CONFIRMED.to_string(),
    }
}

/// Document fields shared by the create and search views.
struct GameSummary {
    name: String,
    max: String,
    host: String,
    players: Vec<String>,
}

impl GameSummary {
    fn from_document(document: &Value) -> Self {
        Self {
            name: first_str(document, NAME_KEYS, UNSET),
            max: first_str(document, MAX_KEYS, UNSET),
            host: first_str(document, HOST_KEYS, UNSET),
            players: first_list(document, PLAYER_KEYS)
                .iter()
                .map(display_scalar)
                .collect(),
        }
    }

    fn empty() -> Self {
        Self::from_document(&Value::Object(Map::new()))
    }

    fn player_list(&self) -> String {
        if self.players.is_empty() {
            NO_PARTICIPANTS.to_string()
        } else {
            self.players.join(", ")
        }
    }
}

fn render_create(data: &Value) -> String {
    let id = first_str(data, ID_KEYS, UNSET);

    let (summary, warning) = match first_present(data, DOCUMENT_KEYS) {
        Some(raw) => match decode_nested(raw) {
            Ok(document) => (GameSummary::from_document(&document), None),
            Err(e) => (
                GameSummary::empty(),
                Some(format!(
                    "⚠️ Could not decode the game document: {}\nRaw: {}",
                    e,
                    head_chars(&display_scalar(raw), RAW_SNIPPET_CHARS)
                )),
            ),
        },
        None => (
            GameSummary::empty(),
            Some(NO_DOCUMENT.to_string()),
        ),
    };

    let mut out = format!(
        "✅ Game created\n\
         🆔 ID: {}\n\
         📌 Name: {}\n\
         🎮 Host: {}\n\
         👥 Players ({}/{}): {}",
        id,
        summary.name,
        summary.host,
        summary.players.len(),
        summary.max,
        summary.player_list()
    );
    if let Some(warning) = warning {
        out.push('\n');
        out.push_str(&warning);
    }
    out
}

fn render_search(data: &Value) -> String {
    let results: Vec<Value> = match first_present(data, RESULT_KEYS) {
        Some(Value::Array(items)) => items.clone(),
        Some(encoded @ Value::String(_)) => match decode_nested(encoded) {
            Ok(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    };

    if results.is_empty() {
        return NO_MATCHES.to_string();
    }

    let shown = results.len().min(SEARCH_MAX_SHOWN);
    let mut out = format!(
        "🔎 Found {} game(s), showing {}:",
        results.len(),
        shown
    );

    for item in results.iter().take(shown) {
        let item = decode_nested(item).unwrap_or(Value::Null);
        let id = first_str(&item, ID_KEYS, UNSET);
        let summary = GameSummary::from_document(&item);
        out.push_str(&format!(
            "\n• `{}` {} ({}/{})",
            id,
            summary.name,
            summary.players.len(),
            summary.max
        ));
    }

    limit_reply(&out)
}

fn render_update(data: &Value) -> String {
    format!(
        "✏️ Update applied\nMatched: {} · Modified: {}",
        first_u64(data, MATCHED_KEYS, 0),
        first_u64(data, MODIFIED_KEYS, 0)
    )
}

fn render_delete(data: &Value) -> String {
    format!("🗑️ Deleted: {}", first_u64(data, DELETED_KEYS, 0))
}
