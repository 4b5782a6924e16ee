use std::sync::{Arc, Weak};

use crate::{
    chat::Chat,
    domain::Message,
    transport::TextEdit,
    Error, Result,
};

/// A message managed by a [`Chat`] under an identifier.
///
/// Holds a weak reference to its chat; once the chat is dropped every
/// operation fails with [`Error::MessageNotFound`].
#[derive(Debug)]
pub struct ChatMsg {
    chat: Weak<Chat>,
    msg: Option<Message>,
    identifier: String,
    description: String,
}

impl ChatMsg {
    pub(crate) fn new(
        chat: Weak<Chat>,
        msg: Option<Message>,
        identifier: String,
        description: String,
    ) -> Self {
        Self {
            chat,
            msg,
            identifier,
            description,
        }
    }

    /// The remote message, or `None` for a virtual target.
    pub fn message(&self) -> Option<&Message> {
        self.msg.as_ref()
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn chat(&self) -> Option<Arc<Chat>> {
        self.chat.upgrade()
    }

    /// Replace the text of the message in place.
    ///
    /// A virtual target has nothing to edit, so the text is sent to the chat as
    /// a new message instead.
    pub async fn edit_text(&self, text: &str) -> Result<()> {
        let chat = self.owner()?;
        let Some(msg) = &self.msg else {
            chat.send_text(None, text).await?;
            return Ok(());
        };
        chat.edit(TextEdit {
            message: msg.reference(),
            text: text.to_string(),
            entities: None,
            disable_web_page_preview: chat.disable_web_page_preview(),
        })
        .await
    }

    /// Edit the message so its text and entities match `other`.
    pub async fn replace_with(&self, other: &Message) -> Result<()> {
        let chat = self.owner()?;
        let msg = self.msg.as_ref().ok_or(Error::MessageNotFound)?;
        chat.edit(TextEdit {
            message: msg.reference(),
            text: other.text.clone().unwrap_or_default(),
            entities: Some(other.entities.clone()),
            disable_web_page_preview: chat.disable_web_page_preview(),
        })
        .await
    }

    /// Delete the remote message. The identifier stays registered; use
    /// [`Chat::delete_msgs`] to free it.
    pub async fn delete(&self) -> Result<()> {
        let Some(msg) = &self.msg else {
            return Ok(());
        };
        self.owner()?.delete_ref(msg.reference()).await
    }

    fn owner(&self) -> Result<Arc<Chat>> {
        self.chat.upgrade().ok_or(Error::MessageNotFound)
    }
}
