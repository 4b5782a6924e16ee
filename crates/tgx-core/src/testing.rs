//! In-memory transport for unit tests.

use std::{
    collections::{HashMap, HashSet, VecDeque},
    sync::{
        atomic::{AtomicI32, AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;

use crate::{
    config::ChatConfig,
    domain::{ChatId, Message, MessageId, MessageRef, Update, UserId},
    transport::{BotConnector, BotTransport, OutgoingPhoto, OutgoingText, TextEdit},
    Error, Result,
};

pub(crate) fn chat_config(token: &str, chat_id: i64, topic: i32, identifier: &str) -> ChatConfig {
    ChatConfig {
        bot_token: token.to_string(),
        chat_id,
        chat_topic: topic,
        identifier: identifier.to_string(),
        description: String::new(),
    }
}

#[derive(Default)]
pub(crate) struct FakeTransport {
    bot_id: u64,
    next_id: AtomicI32,
    next_update: AtomicI32,

    send_attempts: AtomicUsize,
    delete_attempts: AtomicUsize,
    fail_sends_after: Mutex<Option<usize>>,
    fail_deletes: Mutex<bool>,
    missing: Mutex<HashSet<i32>>,

    texts: Mutex<Vec<OutgoingText>>,
    edits: Mutex<Vec<TextEdit>>,
    deleted: Mutex<Vec<MessageRef>>,
    photos: Mutex<Vec<OutgoingPhoto>>,

    updates: Mutex<VecDeque<Update>>,
    offsets: Mutex<Vec<i32>>,
}

impl FakeTransport {
    pub(crate) fn new(bot_id: u64) -> Arc<Self> {
        Arc::new(Self {
            bot_id,
            next_id: AtomicI32::new(1000),
            next_update: AtomicI32::new(1),
            ..Default::default()
        })
    }

    /// Sends succeed `n` times, then every attempt fails.
    pub(crate) fn fail_sends_after(&self, n: usize) {
        *self.fail_sends_after.lock().unwrap() = Some(n);
    }

    pub(crate) fn fail_deletes(&self) {
        *self.fail_deletes.lock().unwrap() = true;
    }

    /// Deleting `id` reports "message to delete not found".
    pub(crate) fn mark_missing(&self, id: MessageId) {
        self.missing.lock().unwrap().insert(id.0);
    }

    pub(crate) fn send_attempts(&self) -> usize {
        self.send_attempts.load(Ordering::SeqCst)
    }

    pub(crate) fn delete_attempts(&self) -> usize {
        self.delete_attempts.load(Ordering::SeqCst)
    }

    pub(crate) fn text_requests(&self) -> Vec<OutgoingText> {
        self.texts.lock().unwrap().clone()
    }

    pub(crate) fn sent_texts(&self) -> Vec<String> {
        self.text_requests().into_iter().map(|r| r.text).collect()
    }

    pub(crate) fn edits(&self) -> Vec<TextEdit> {
        self.edits.lock().unwrap().clone()
    }

    pub(crate) fn deleted(&self) -> Vec<MessageRef> {
        self.deleted.lock().unwrap().clone()
    }

    pub(crate) fn photo_requests(&self) -> Vec<OutgoingPhoto> {
        self.photos.lock().unwrap().clone()
    }

    pub(crate) fn offsets(&self) -> Vec<i32> {
        self.offsets.lock().unwrap().clone()
    }

    /// An incoming text message from a user (not the bot).
    pub(crate) fn incoming(&self, chat_id: i64, text: &str, reply_to: Option<i32>) -> Message {
        self.incoming_from(chat_id, self.bot_id + 1, text, reply_to)
    }

    pub(crate) fn incoming_from(
        &self,
        chat_id: i64,
        from: u64,
        text: &str,
        reply_to: Option<i32>,
    ) -> Message {
        Message {
            chat_id: ChatId(chat_id),
            id: MessageId(self.next_id.fetch_add(1, Ordering::SeqCst)),
            from: Some(UserId(from)),
            text: Some(text.to_string()),
            entities: Vec::new(),
            reply_to: reply_to.map(MessageId),
        }
    }

    /// Queue an update for the next `get_updates` call.
    pub(crate) fn push_update(&self, message: Option<Message>) {
        let id = self.next_update.fetch_add(1, Ordering::SeqCst);
        self.updates.lock().unwrap().push_back(Update { id, message });
    }

    fn alloc(&self, chat_id: ChatId, text: Option<String>, reply_to: Option<MessageId>) -> Message {
        Message {
            chat_id,
            id: MessageId(self.next_id.fetch_add(1, Ordering::SeqCst)),
            from: Some(UserId(self.bot_id)),
            text,
            entities: Vec::new(),
            reply_to,
        }
    }
}

#[async_trait]
impl BotTransport for FakeTransport {
    fn bot_id(&self) -> UserId {
        UserId(self.bot_id)
    }

    async fn send_text(&self, req: OutgoingText) -> Result<Message> {
        // Suspend once like a network call would.
        tokio::task::yield_now().await;
        let attempt = self.send_attempts.fetch_add(1, Ordering::SeqCst);
        if let Some(limit) = *self.fail_sends_after.lock().unwrap() {
            if attempt >= limit {
                return Err(Error::External(format!("send attempt {attempt} failed")));
            }
        }
        let mut msg = self.alloc(req.chat_id, Some(req.text.clone()), req.reply_to);
        msg.entities = req.entities.clone();
        self.texts.lock().unwrap().push(req);
        Ok(msg)
    }

    async fn edit_text(&self, req: TextEdit) -> Result<()> {
        self.edits.lock().unwrap().push(req);
        Ok(())
    }

    async fn delete_message(&self, msg: MessageRef) -> Result<()> {
        self.delete_attempts.fetch_add(1, Ordering::SeqCst);
        if *self.fail_deletes.lock().unwrap() {
            return Err(Error::External("delete failed".to_string()));
        }
        if self.missing.lock().unwrap().contains(&msg.message_id.0) {
            return Err(Error::MessageToDeleteNotFound);
        }
        self.deleted.lock().unwrap().push(msg);
        Ok(())
    }

    async fn send_photo(&self, req: OutgoingPhoto) -> Result<Message> {
        let msg = self.alloc(req.chat_id, None, req.reply_to);
        self.photos.lock().unwrap().push(req);
        Ok(msg)
    }

    async fn get_updates(&self, offset: i32, timeout: Duration) -> Result<Vec<Update>> {
        self.offsets.lock().unwrap().push(offset);
        let ready: Vec<Update> = {
            let mut queue = self.updates.lock().unwrap();
            queue.retain(|u| u.id >= offset);
            queue.drain(..).collect()
        };
        if ready.is_empty() {
            tokio::time::sleep(timeout).await;
        }
        Ok(ready)
    }
}

/// Connector handing out one fake per token. Tokens starting with `bad`
/// are rejected like an invalid credential.
#[derive(Default)]
pub(crate) struct FakeConnector {
    transports: Mutex<HashMap<String, Arc<FakeTransport>>>,
    connects: AtomicUsize,
}

impl FakeConnector {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub(crate) fn transport(&self, token: &str) -> Option<Arc<FakeTransport>> {
        self.transports.lock().unwrap().get(token).cloned()
    }
}

#[async_trait]
impl BotConnector for FakeConnector {
    async fn connect(&self, bot_token: &str) -> Result<Arc<dyn BotTransport>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if bot_token.starts_with("bad") {
            return Err(Error::External("Unauthorized".to_string()));
        }
        let id = self.connects.load(Ordering::SeqCst) as u64;
        let fake: Arc<dyn BotTransport> = self
            .transports
            .lock()
            .unwrap()
            .entry(bot_token.to_string())
            .or_insert_with(|| FakeTransport::new(id))
            .clone();
        Ok(fake)
    }
}
