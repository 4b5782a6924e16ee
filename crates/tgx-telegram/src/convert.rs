//! Conversions between teloxide types and the core model.
//!
//! The core measures entity offsets in UTF-8 bytes; the Bot API counts UTF-16
//! code units. Every entity crossing the boundary is re-based here.

use teloxide::{
    types::{
        MessageEntity, MessageEntityKind, Message as TgMessage, Update as TgUpdate, UpdateKind,
    },
    ApiError, RequestError,
};

use tgx_core::{
    domain::{ChatId, Entity, EntityKind, Message, MessageId, Update, UserId},
    Error, Result,
};

pub(crate) fn tg_chat(chat_id: ChatId) -> teloxide::types::ChatId {
    teloxide::types::ChatId(chat_id.0)
}

pub(crate) fn tg_msg_id(message_id: MessageId) -> teloxide::types::MessageId {
    teloxide::types::MessageId(message_id.0)
}

pub(crate) fn map_err(e: RequestError) -> Error {
    match e {
        RequestError::Api(ApiError::MessageToDeleteNotFound) => Error::MessageToDeleteNotFound,
        other => Error::External(format!("telegram error: {other}")),
    }
}

// ============== Offsets ==============

/// UTF-16 offset of byte position `byte` in `text`.
///
/// A position inside a code point counts the whole code point as preceding it.
pub(crate) fn utf16_offset(text: &str, byte: usize) -> usize {
    text.char_indices()
        .take_while(|(i, _)| *i < byte)
        .map(|(_, c)| c.len_utf16())
        .sum()
}

/// Byte position of UTF-16 offset `units` in `text`, clamped to the text length.
pub(crate) fn byte_offset(text: &str, units: usize) -> usize {
    let mut seen = 0;
    for (i, c) in text.char_indices() {
        if seen >= units {
            return i;
        }
        seen += c.len_utf16();
    }
    text.len()
}

// ============== Entities ==============

pub(crate) fn to_tg_entities(text: &str, entities: &[Entity]) -> Result<Vec<MessageEntity>> {
    entities
        .iter()
        .map(|e| {
            let start = utf16_offset(text, e.offset);
            let end = utf16_offset(text, e.offset + e.length);
            Ok(MessageEntity {
                kind: to_tg_kind(&e.kind)?,
                offset: start,
                length: end - start,
            })
        })
        .collect()
}

fn to_tg_kind(kind: &EntityKind) -> Result<MessageEntityKind> {
    Ok(match kind {
        EntityKind::Bold => MessageEntityKind::Bold,
        EntityKind::Italic => MessageEntityKind::Italic,
        EntityKind::Underline => MessageEntityKind::Underline,
        EntityKind::Strikethrough => MessageEntityKind::Strikethrough,
        EntityKind::Spoiler => MessageEntityKind::Spoiler,
        EntityKind::Code => MessageEntityKind::Code,
        EntityKind::Pre { language } => MessageEntityKind::Pre {
            language: language.clone(),
        },
        EntityKind::TextLink { url } => MessageEntityKind::TextLink {
            url: url::Url::parse(url)
                .map_err(|e| Error::External(format!("invalid link url {url:?}: {e}")))?,
        },
        EntityKind::Mention => MessageEntityKind::Mention,
        EntityKind::Hashtag => MessageEntityKind::Hashtag,
        EntityKind::Cashtag => MessageEntityKind::Cashtag,
        EntityKind::BotCommand => MessageEntityKind::BotCommand,
        EntityKind::Url => MessageEntityKind::Url,
        EntityKind::Email => MessageEntityKind::Email,
        EntityKind::PhoneNumber => MessageEntityKind::PhoneNumber,
    })
}

fn from_tg_kind(kind: &MessageEntityKind) -> Option<EntityKind> {
    Some(match kind {
        MessageEntityKind::Bold => EntityKind::Bold,
        MessageEntityKind::Italic => EntityKind::Italic,
        MessageEntityKind::Underline => EntityKind::Underline,
        MessageEntityKind::Strikethrough => EntityKind::Strikethrough,
        MessageEntityKind::Spoiler => EntityKind::Spoiler,
        MessageEntityKind::Code => EntityKind::Code,
        MessageEntityKind::Pre { language } => EntityKind::Pre {
            language: language.clone(),
        },
        MessageEntityKind::TextLink { url } => EntityKind::TextLink {
            url: url.to_string(),
        },
        MessageEntityKind::Mention => EntityKind::Mention,
        MessageEntityKind::Hashtag => EntityKind::Hashtag,
        MessageEntityKind::Cashtag => EntityKind::Cashtag,
        MessageEntityKind::BotCommand => EntityKind::BotCommand,
        MessageEntityKind::Url => EntityKind::Url,
        MessageEntityKind::Email => EntityKind::Email,
        MessageEntityKind::PhoneNumber => EntityKind::PhoneNumber,
        // text mentions, custom emoji and newer kinds have no core counterpart
        _ => return None,
    })
}

fn from_tg_entities(text: &str, entities: &[MessageEntity]) -> Vec<Entity> {
    entities
        .iter()
        .filter_map(|e| {
            let kind = from_tg_kind(&e.kind)?;
            let start = byte_offset(text, e.offset);
            let end = byte_offset(text, e.offset + e.length);
            Some(Entity {
                kind,
                offset: start,
                length: end - start,
            })
        })
        .collect()
}

// ============== Messages ==============

pub(crate) fn from_tg_message(msg: &TgMessage) -> Message {
    let text = msg.text().map(str::to_string);
    let entities = match (&text, msg.entities()) {
        (Some(text), Some(entities)) => from_tg_entities(text, entities),
        _ => Vec::new(),
    };
    Message {
        chat_id: ChatId(msg.chat.id.0),
        id: MessageId(msg.id.0),
        from: msg.from().map(|u| UserId(u.id.0)),
        text,
        entities,
        reply_to: msg.reply_to_message().map(|r| MessageId(r.id.0)),
    }
}

pub(crate) fn from_tg_update(update: &TgUpdate) -> Update {
    let message = match &update.kind {
        UpdateKind::Message(msg) => Some(from_tg_message(msg)),
        _ => None,
    };
    Update {
        id: update.id,
        message,
    }
}
