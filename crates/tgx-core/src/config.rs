use std::{env, fs, time::Duration};

use serde::Deserialize;

use crate::{errors::Error, Result};

/// Registration input for one chat.
///
/// `chat_id` and `chat_topic` can be read from a message link: for
/// `https://t.me/c/123456789/2/21` the chat id is `-100123456789` and the topic
/// is `2` (21 is the message id). Groups without topics produce links like
/// `https://t.me/c/123456789/21`; register those (or a whole forum) with
/// `chat_topic = -1`.
///
/// `chat_id = 0` registers a wildcard chat that receives updates from every
/// chat the bot is in. It cannot be used as a send destination.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct ChatConfig {
    pub bot_token: String,
    #[serde(default)]
    pub chat_id: i64,
    #[serde(default)]
    pub chat_topic: i32,
    pub identifier: String,
    #[serde(default)]
    pub description: String,
}

/// Per-chat settings applied at registration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChatDefaults {
    pub retry: usize,
    pub retry_interval: Duration,
    pub disable_web_page_preview: bool,
}

impl Default for ChatDefaults {
    fn default() -> Self {
        Self {
            retry: 3,
            retry_interval: Duration::from_secs(1),
            disable_web_page_preview: true,
        }
    }
}

/// Long-poll settings for the monitor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollConfig {
    pub timeout: Duration,
    /// Sleep after a failed poll before polling again.
    pub error_backoff: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            error_backoff: Duration::from_secs(3),
        }
    }
}

/// Typed configuration for a host process.
#[derive(Clone, Debug)]
pub struct Config {
    pub chats: Vec<ChatConfig>,
    pub defaults: ChatDefaults,
    pub poll: PollConfig,
}

impl Config {
    /// Load from the environment (after applying `.env` if present).
    ///
    /// Variables already set in the environment win over `.env` entries.
    pub fn load() -> Result<Self> {
        match dotenvy::dotenv() {
            Ok(_) => {}
            Err(e) if e.not_found() => {}
            Err(e) => return Err(Error::Config(format!("failed to load .env: {e}"))),
        }
        Self::from_lookup(env_str)
    }

    /// Build from an arbitrary key lookup. `load()` uses the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let chats = if let Some(path) = lookup("TGX_CHATS_FILE").and_then(non_empty) {
            let raw = fs::read_to_string(&path)
                .map_err(|e| Error::Config(format!("failed to read TGX_CHATS_FILE {path}: {e}")))?;
            parse_chats(&raw)?
        } else if let Some(raw) = lookup("TGX_CHATS").and_then(non_empty) {
            parse_chats(&raw)?
        } else {
            Vec::new()
        };

        if chats.is_empty() {
            return Err(Error::Config(
                "TGX_CHATS_FILE or TGX_CHATS must list at least one chat".to_string(),
            ));
        }

        let base = ChatDefaults::default();
        let defaults = ChatDefaults {
            retry: parse_num(&lookup, "TGX_RETRY")?.unwrap_or(base.retry),
            retry_interval: parse_num(&lookup, "TGX_RETRY_INTERVAL_MS")?
                .map(Duration::from_millis)
                .unwrap_or(base.retry_interval),
            disable_web_page_preview: lookup("TGX_DISABLE_WEB_PAGE_PREVIEW")
                .map(|s| parse_bool(&s))
                .unwrap_or(base.disable_web_page_preview),
        };

        let poll_base = PollConfig::default();
        let poll = PollConfig {
            timeout: parse_num(&lookup, "TGX_POLL_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(poll_base.timeout),
            error_backoff: parse_num(&lookup, "TGX_POLL_ERROR_BACKOFF_MS")?
                .map(Duration::from_millis)
                .unwrap_or(poll_base.error_backoff),
        };

        Ok(Self {
            chats,
            defaults,
            poll,
        })
    }
}

/// Parse a JSON array of chat registrations.
pub fn parse_chats(raw: &str) -> Result<Vec<ChatConfig>> {
    Ok(serde_json::from_str(raw)?)
}

fn parse_num<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>> {
    let Some(raw) = lookup(key).and_then(non_empty) else {
        return Ok(None);
    };
    raw.trim()
        .parse::<T>()
        .map(Some)
        .map_err(|_| Error::Config(format!("{key} must be a non-negative integer, got {raw:?}")))
}

fn parse_bool(s: &str) -> bool {
    matches!(
        s.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
