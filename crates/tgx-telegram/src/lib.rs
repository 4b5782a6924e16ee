//! Telegram adapter (teloxide).
//!
//! This crate implements the `tgx-core` transport port over the Telegram Bot API.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use teloxide::{
    prelude::*,
    types::{AllowedUpdate, InputFile},
};
use tracing::info;

mod convert;

use convert::{from_tg_message, from_tg_update, map_err, tg_chat, tg_msg_id, to_tg_entities};
use tgx_core::{
    domain::{Message, MessageRef, Update, UserId},
    transport::{BotConnector, BotTransport, OutgoingPhoto, OutgoingText, PhotoSource, TextEdit},
    utils::mask_token,
    Error, Result,
};

/// One authenticated bot.
#[derive(Clone)]
pub struct TelegramTransport {
    bot: Bot,
    bot_id: UserId,
}

impl TelegramTransport {
    /// Validate `token` with `getMe` and build a transport for it.
    pub async fn connect(token: &str) -> Result<Self> {
        let bot = Bot::new(token);
        let me = bot.get_me().await.map_err(map_err)?;
        info!(
            bot = %mask_token(token),
            username = %me.username(),
            "connected to telegram"
        );
        Ok(Self {
            bot,
            bot_id: UserId(me.user.id.0),
        })
    }
}

#[async_trait]
impl BotTransport for TelegramTransport {
    fn bot_id(&self) -> UserId {
        self.bot_id
    }

    async fn send_text(&self, req: OutgoingText) -> Result<Message> {
        let entities = to_tg_entities(&req.text, &req.entities)?;
        let mut call = self
            .bot
            .send_message(tg_chat(req.chat_id), req.text)
            .disable_web_page_preview(req.disable_web_page_preview);
        if !entities.is_empty() {
            call = call.entities(entities);
        }
        if let Some(reply_to) = req.reply_to {
            call = call.reply_to_message_id(tg_msg_id(reply_to));
        }
        let msg = call.await.map_err(map_err)?;
        Ok(from_tg_message(&msg))
    }

    async fn edit_text(&self, req: TextEdit) -> Result<()> {
        let entities = match &req.entities {
            Some(entities) => Some(to_tg_entities(&req.text, entities)?),
            None => None,
        };
        let mut call = self
            .bot
            .edit_message_text(
                tg_chat(req.message.chat_id),
                tg_msg_id(req.message.message_id),
                req.text,
            )
            .disable_web_page_preview(req.disable_web_page_preview);
        if let Some(entities) = entities {
            call = call.entities(entities);
        }
        call.await.map_err(map_err)?;
        Ok(())
    }

    async fn delete_message(&self, msg: MessageRef) -> Result<()> {
        self.bot
            .delete_message(tg_chat(msg.chat_id), tg_msg_id(msg.message_id))
            .await
            .map_err(map_err)?;
        Ok(())
    }

    async fn send_photo(&self, req: OutgoingPhoto) -> Result<Message> {
        let photo = match req.photo {
            PhotoSource::Local(path) => InputFile::file(path),
            PhotoSource::Url(url) => InputFile::url(
                url::Url::parse(&url)
                    .map_err(|e| Error::External(format!("invalid photo url {url:?}: {e}")))?,
            ),
        };
        let mut call = self.bot.send_photo(tg_chat(req.chat_id), photo);
        if let Some(reply_to) = req.reply_to {
            call = call.reply_to_message_id(tg_msg_id(reply_to));
        }
        let msg = call.await.map_err(map_err)?;
        Ok(from_tg_message(&msg))
    }

    // The default teloxide client gives up after 17s, so keep poll timeouts below that.
    async fn get_updates(&self, offset: i32, timeout: Duration) -> Result<Vec<Update>> {
        let timeout = u32::try_from(timeout.as_secs()).unwrap_or(u32::MAX);
        let updates = self
            .bot
            .get_updates()
            .offset(offset)
            .timeout(timeout)
            .allowed_updates(vec![AllowedUpdate::Message])
            .await
            .map_err(map_err)?;
        Ok(updates.iter().map(from_tg_update).collect())
    }
}

/// Connects a [`TelegramTransport`] per bot token.
#[derive(Clone, Copy, Debug, Default)]
pub struct TelegramConnector;

#[async_trait]
impl BotConnector for TelegramConnector {
    async fn connect(&self, bot_token: &str) -> Result<Arc<dyn BotTransport>> {
        let transport = TelegramTransport::connect(bot_token).await?;
        Ok(Arc::new(transport))
    }
}
