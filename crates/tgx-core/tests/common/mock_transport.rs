//! Mock [`BotTransport`] for integration tests.
//!
//! Updates are fed through a channel and every sent text is forwarded to a
//! receiver held by the test, so a scenario can wait for the bot's reply
//! without touching the network.

use std::{
    sync::{
        atomic::{AtomicI32, Ordering},
        Arc,
    },
    time::Duration,
};

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};

use tgx_core::{
    domain::{ChatId, Message, MessageId, MessageRef, Update, UserId},
    transport::{BotConnector, BotTransport, OutgoingPhoto, OutgoingText, TextEdit},
    Error, Result,
};

pub const BOT_ID: u64 = 777;

pub struct MockTransport {
    next_id: AtomicI32,
    updates: Mutex<mpsc::UnboundedReceiver<Update>>,
    sent_tx: mpsc::UnboundedSender<OutgoingText>,
}

impl MockTransport {
    /// Returns the transport, the sender feeding its updates and the receiver of
    /// every text it sends.
    pub fn new() -> (
        Arc<Self>,
        mpsc::UnboundedSender<Update>,
        mpsc::UnboundedReceiver<OutgoingText>,
    ) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let (sent_tx, sent_rx) = mpsc::unbounded_channel();
        let transport = Arc::new(Self {
            next_id: AtomicI32::new(100),
            updates: Mutex::new(update_rx),
            sent_tx,
        });
        (transport, update_tx, sent_rx)
    }
}

/// A user message in `chat_id`, replying to `reply_to` when set.
pub fn user_message(id: i32, chat_id: i64, text: &str, reply_to: Option<i32>) -> Message {
    Message {
        chat_id: ChatId(chat_id),
        id: MessageId(id),
        from: Some(UserId(BOT_ID + 1)),
        text: Some(text.to_string()),
        entities: Vec::new(),
        reply_to: reply_to.map(MessageId),
    }
}

#[async_trait]
impl BotTransport for MockTransport {
    fn bot_id(&self) -> UserId {
        UserId(BOT_ID)
    }

    async fn send_text(&self, req: OutgoingText) -> Result<Message> {
        let msg = Message {
            chat_id: req.chat_id,
            id: MessageId(self.next_id.fetch_add(1, Ordering::SeqCst)),
            from: Some(UserId(BOT_ID)),
            text: Some(req.text.clone()),
            entities: req.entities.clone(),
            reply_to: req.reply_to,
        };
        let _ = self.sent_tx.send(req);
        Ok(msg)
    }

    async fn edit_text(&self, _req: TextEdit) -> Result<()> {
        Ok(())
    }

    async fn delete_message(&self, _msg: MessageRef) -> Result<()> {
        Ok(())
    }

    async fn send_photo(&self, _req: OutgoingPhoto) -> Result<Message> {
        Err(Error::External("photos are not supported by the mock".to_string()))
    }

    async fn get_updates(&self, offset: i32, timeout: Duration) -> Result<Vec<Update>> {
        let mut rx = self.updates.lock().await;
        match tokio::time::timeout(timeout, rx.recv()).await {
            Ok(Some(update)) if update.id >= offset => Ok(vec![update]),
            Ok(Some(_)) | Err(_) => Ok(Vec::new()),
            Ok(None) => Err(Error::External("update channel closed".to_string())),
        }
    }
}

/// Connector that hands out the same mock for every token.
pub struct MockConnector(pub Arc<MockTransport>);

#[async_trait]
impl BotConnector for MockConnector {
    async fn connect(&self, _bot_token: &str) -> Result<Arc<dyn BotTransport>> {
        let transport: Arc<dyn BotTransport> = self.0.clone();
        Ok(transport)
    }
}
