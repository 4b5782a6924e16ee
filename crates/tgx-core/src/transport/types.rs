use std::path::PathBuf;

use crate::domain::{ChatId, Entity, MessageId, MessageRef};

/// A text message to send.
#[derive(Clone, Debug)]
pub struct OutgoingText {
    pub chat_id: ChatId,
    pub text: String,
    pub entities: Vec<Entity>,
    pub reply_to: Option<MessageId>,
    pub disable_web_page_preview: bool,
}

/// In-place edit of an already sent message.
#[derive(Clone, Debug)]
pub struct TextEdit {
    pub message: MessageRef,
    pub text: String,
    /// `None` keeps whatever the API does by default (no entities).
    pub entities: Option<Vec<Entity>>,
    pub disable_web_page_preview: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PhotoSource {
    Local(PathBuf),
    Url(String),
}

impl PhotoSource {
    pub fn new(path: &str, is_local: bool) -> Self {
        if is_local {
            Self::Local(PathBuf::from(path))
        } else {
            Self::Url(path.to_string())
        }
    }
}

#[derive(Clone, Debug)]
pub struct OutgoingPhoto {
    pub chat_id: ChatId,
    pub photo: PhotoSource,
    pub reply_to: Option<MessageId>,
}
