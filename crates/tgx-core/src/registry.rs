//! Identifier → chat registry, grouped by bot credential.

use std::sync::Arc;

use dashmap::{mapref::entry::Entry, DashMap};
use tracing::info;

use crate::{
    chat::Chat,
    config::{ChatConfig, ChatDefaults},
    transport::{BotConnector, BotTransport},
    utils::mask_token,
    Error, Result,
};

struct BotEntry {
    transport: Arc<dyn BotTransport>,
    chats: Vec<Arc<Chat>>,
}

/// Snapshot of one credential and the chats registered on it.
#[derive(Clone)]
pub struct RegisteredBot {
    pub token: String,
    pub transport: Arc<dyn BotTransport>,
    pub chats: Vec<Arc<Chat>>,
}

impl RegisteredBot {
    /// Whether any chat on this credential has a handler to run.
    pub fn has_handler(&self) -> bool {
        self.chats.iter().any(|c| c.has_handlers())
    }
}

impl std::fmt::Debug for RegisteredBot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredBot")
            .field("token", &mask_token(&self.token))
            .field("chats", &self.chats)
            .finish_non_exhaustive()
    }
}

/// Chats by identifier, plus one connected transport per bot token.
pub struct Registry {
    connector: Arc<dyn BotConnector>,
    defaults: ChatDefaults,

    chats: DashMap<String, Arc<Chat>>,
    // bot token -> transport + chats in registration order
    bots: DashMap<String, BotEntry>,
}

impl Registry {
    pub fn new(connector: Arc<dyn BotConnector>) -> Self {
        Self::with_defaults(connector, ChatDefaults::default())
    }

    /// Registry whose chats start with `defaults` instead of the built-in settings.
    pub fn with_defaults(connector: Arc<dyn BotConnector>, defaults: ChatDefaults) -> Self {
        Self {
            connector,
            defaults,
            chats: DashMap::new(),
            bots: DashMap::new(),
        }
    }

    /// Build a registry and register every config, stopping at the first failure.
    pub async fn init(
        connector: Arc<dyn BotConnector>,
        defaults: ChatDefaults,
        configs: &[ChatConfig],
    ) -> Result<Self> {
        let registry = Self::with_defaults(connector, defaults);
        for config in configs {
            registry.register_chat(config).await?;
        }
        Ok(registry)
    }

    /// Register a chat under `config.identifier`.
    ///
    /// Chats sharing a bot token share one transport; the connector is only
    /// called for a token seen for the first time.
    pub async fn register_chat(&self, config: &ChatConfig) -> Result<Arc<Chat>> {
        if config.identifier.is_empty() {
            return Err(Error::IdentifierEmpty);
        }
        if config.bot_token.is_empty() {
            return Err(Error::BotTokenEmpty);
        }
        if self.chats.contains_key(&config.identifier) {
            return Err(Error::IdentifierAlreadyExists);
        }

        let existing = self
            .bots
            .get(&config.bot_token)
            .map(|b| b.transport.clone());
        let connected = match existing {
            Some(transport) => transport,
            None => self.connector.connect(&config.bot_token).await?,
        };

        // A concurrent registration may have connected the same token first.
        let transport = self
            .bots
            .entry(config.bot_token.clone())
            .or_insert_with(|| BotEntry {
                transport: connected,
                chats: Vec::new(),
            })
            .transport
            .clone();

        let chat = Chat::new(transport, config, self.defaults);
        match self.chats.entry(config.identifier.clone()) {
            Entry::Occupied(_) => return Err(Error::IdentifierAlreadyExists),
            Entry::Vacant(slot) => {
                slot.insert(chat.clone());
                if let Some(mut bot) = self.bots.get_mut(&config.bot_token) {
                    bot.chats.push(chat.clone());
                }
            }
        }

        info!(
            identifier = %config.identifier,
            chat_id = config.chat_id,
            topic = config.chat_topic,
            bot = %mask_token(&config.bot_token),
            "registered chat"
        );
        Ok(chat)
    }

    pub fn get_chat(&self, identifier: &str) -> Result<Arc<Chat>> {
        if identifier.is_empty() {
            return Err(Error::IdentifierEmpty);
        }
        self.chats
            .get(identifier)
            .map(|c| c.value().clone())
            .ok_or(Error::IdentifierNotFound)
    }

    /// One record per bot token that has at least one chat.
    pub fn registered_bots(&self) -> Vec<RegisteredBot> {
        self.bots
            .iter()
            .filter(|entry| !entry.chats.is_empty())
            .map(|entry| RegisteredBot {
                token: entry.key().clone(),
                transport: entry.transport.clone(),
                chats: entry.chats.clone(),
            })
            .collect()
    }

    /// Chats on `bot_token`, in registration order.
    pub fn chats_for(&self, bot_token: &str) -> Vec<Arc<Chat>> {
        self.bots
            .get(bot_token)
            .map(|b| b.chats.clone())
            .unwrap_or_default()
    }

    /// Snapshot of every registered chat.
    pub fn chats(&self) -> Vec<Arc<Chat>> {
        self.chats.iter().map(|c| c.value().clone()).collect()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("chats", &self.chats.len())
            .field("bots", &self.bots.len())
            .finish_non_exhaustive()
    }
}
