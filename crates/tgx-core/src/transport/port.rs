use std::{sync::Arc, time::Duration};

use async_trait::async_trait;

use crate::{
    domain::{Message, MessageRef, Update, UserId},
    transport::types::{OutgoingPhoto, OutgoingText, TextEdit},
    Result,
};

/// Bot API port.
///
/// One instance represents one authenticated bot. It is shared by every chat
/// registered under the same credential and by that credential's monitor task,
/// so implementations must be safe for concurrent use.
#[async_trait]
pub trait BotTransport: Send + Sync {
    /// User id of the bot itself, resolved when the transport was connected.
    fn bot_id(&self) -> UserId;

    async fn send_text(&self, req: OutgoingText) -> Result<Message>;
    async fn edit_text(&self, req: TextEdit) -> Result<()>;

    /// Must map "message to delete not found" to `Error::MessageToDeleteNotFound`.
    async fn delete_message(&self, msg: MessageRef) -> Result<()>;

    async fn send_photo(&self, req: OutgoingPhoto) -> Result<Message>;

    /// Long-poll for updates with id >= `offset`, waiting up to `timeout`.
    async fn get_updates(&self, offset: i32, timeout: Duration) -> Result<Vec<Update>>;
}

/// Creates transports from bot credentials.
///
/// This is the only place a client handle is created; connecting validates the
/// credential, so an error here is surfaced by chat registration.
#[async_trait]
pub trait BotConnector: Send + Sync {
    async fn connect(&self, bot_token: &str) -> Result<Arc<dyn BotTransport>>;
}
