/// Telegram user id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct UserId(pub u64);

/// Telegram chat id (numeric). `0` is the wildcard chat of a registration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChatId(pub i64);

/// Telegram message id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageId(pub i32);

/// A stable reference to a Telegram message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageRef {
    pub chat_id: ChatId,
    pub message_id: MessageId,
}

/// Where a send goes: a chat plus an optional topic.
///
/// `topic` follows the registration convention: positive values are attached
/// as the reply target, zero and negative values attach nothing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Destination {
    pub chat_id: ChatId,
    pub topic: i32,
}

impl Destination {
    pub fn new(chat_id: ChatId, topic: i32) -> Self {
        Self { chat_id, topic }
    }

    /// Destination that answers in the same chat and topic as `msg`.
    pub fn from_message(msg: &Message) -> Self {
        Self {
            chat_id: msg.chat_id,
            topic: msg.topic(),
        }
    }

    /// Reply target to attach to an outgoing message, if any.
    pub fn reply_to(&self) -> Option<MessageId> {
        (self.topic > 0).then_some(MessageId(self.topic))
    }
}

/// Formatting entity kinds understood by the core.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EntityKind {
    Bold,
    Italic,
    Underline,
    Strikethrough,
    Spoiler,
    Code,
    Pre { language: Option<String> },
    TextLink { url: String },
    Mention,
    Hashtag,
    Cashtag,
    BotCommand,
    Url,
    Email,
    PhoneNumber,
}

impl EntityKind {
    /// Parse a component style tag. Only the styles a component may carry are
    /// recognised; anything else yields `None` (plain text).
    pub fn from_style(style: &str, url: &str) -> Option<Self> {
        match style {
            "bold" => Some(Self::Bold),
            "italic" => Some(Self::Italic),
            "underline" => Some(Self::Underline),
            "strikethrough" => Some(Self::Strikethrough),
            "text_link" => Some(Self::TextLink {
                url: url.to_string(),
            }),
            "mention" => Some(Self::Mention),
            _ => None,
        }
    }
}

/// Formatting annotation over a byte range of a message's text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entity {
    pub kind: EntityKind,
    pub offset: usize,
    pub length: usize,
}

/// Transport-agnostic message, used for both sent messages and incoming updates.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    pub chat_id: ChatId,
    pub id: MessageId,
    pub from: Option<UserId>,
    pub text: Option<String>,
    pub entities: Vec<Entity>,
    /// Id of the message this one replies to. Topics are addressed this way.
    pub reply_to: Option<MessageId>,
}

impl Message {
    pub fn reference(&self) -> MessageRef {
        MessageRef {
            chat_id: self.chat_id,
            message_id: self.id,
        }
    }

    /// Topic of the message: the id of its reply target, or 0.
    pub fn topic(&self) -> i32 {
        self.reply_to.map(|m| m.0).unwrap_or(0)
    }

    /// Command token without the leading `/` and `@botname` suffix.
    pub fn command(&self) -> Option<&str> {
        let text = self.text.as_deref()?;
        let rest = text.strip_prefix('/')?;
        let token = rest.split_whitespace().next()?;
        let name = token.split('@').next().unwrap_or(token);
        if name.is_empty() {
            None
        } else {
            Some(name)
        }
    }

    /// Everything after the command token, trimmed.
    pub fn command_args(&self) -> Option<&str> {
        self.command()?;
        let text = self.text.as_deref()?.trim_start();
        Some(
            text.split_once(char::is_whitespace)
                .map(|(_, args)| args.trim())
                .unwrap_or(""),
        )
    }
}

/// One long-poll update.
#[derive(Clone, Debug)]
pub struct Update {
    pub id: i32,
    /// `None` for updates without a message body (callbacks, edits, ...).
    pub message: Option<Message>,
}
