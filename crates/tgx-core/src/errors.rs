use crate::domain::Message;

/// Core error type.
///
/// Adapter crates map their transport errors into this type so callers see one
/// error surface. Validation variants are always returned before any network call.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("tgx: identifier is empty")]
    IdentifierEmpty,

    #[error("tgx: identifier not found")]
    IdentifierNotFound,

    #[error("tgx: identifier already exists")]
    IdentifierAlreadyExists,

    #[error("tgx: text length {len} is too long (max {})", crate::chat::MAX_TEXT_LEN)]
    TextTooLong { len: usize },

    #[error("tgx: {count} entities is too many (max {})", crate::chat::MAX_ENTITIES)]
    TooManyEntities { count: usize },

    #[error("tgx: chat_id is 0")]
    ChatIdZero,

    #[error("tgx: bot_token is empty")]
    BotTokenEmpty,

    #[error("tgx: msg or msg.chat is missing")]
    MessageNotFound,

    /// The transport reported that the message to delete does not exist.
    #[error("tgx: message to delete not found")]
    MessageToDeleteNotFound,

    #[error("tgx: sent {} message(s) before failing: {source}", .sent.len())]
    PartialSend {
        sent: Vec<Message>,
        #[source]
        source: Box<Error>,
    },

    #[error("config error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("external error: {0}")]
    External(String),
}

pub type Result<T> = std::result::Result<T, Error>;
