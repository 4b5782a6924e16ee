//! A registered chat: send/edit/delete helpers, managed messages, handlers.

use std::{
    sync::{
        atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
        Arc, PoisonError, RwLock, Weak,
    },
    time::Duration,
};

use dashmap::{mapref::entry::Entry, DashMap};
use tracing::warn;

use crate::{
    chat_msg::ChatMsg,
    components::{compile_components, MsgComponent},
    config::{ChatConfig, ChatDefaults},
    domain::{ChatId, Destination, Entity, Message, MessageId, MessageRef},
    handler::MessageHandler,
    retry::retry,
    transport::{BotTransport, OutgoingPhoto, OutgoingText, PhotoSource, TextEdit},
    utils::split_text,
    Error, Result,
};

/// Maximum text length of one message, in bytes.
pub const MAX_TEXT_LEN: usize = 4096;
/// Maximum number of formatting entities in one message.
pub const MAX_ENTITIES: usize = 100;

/// An identifier maps to one message or to a group registered together.
/// An empty group holds an identifier while its messages are being sent.
enum Managed {
    Single(Arc<ChatMsg>),
    Group(Vec<Arc<ChatMsg>>),
}

type NamedHandler = (String, Arc<dyn MessageHandler>);

/// One registration: a bot credential bound to a chat and topic, with the
/// messages it manages and the handlers it dispatches to.
pub struct Chat {
    transport: Arc<dyn BotTransport>,
    this: Weak<Chat>,

    chat_id: ChatId,
    topic: i32,
    identifier: String,
    description: String,

    disable_web_page_preview: AtomicBool,
    retry: AtomicUsize,
    retry_interval_nanos: AtomicU64,

    managed: DashMap<String, Managed>,

    // command token -> handler
    commands: DashMap<String, Arc<dyn MessageHandler>>,
    // free-text handlers, run in registration order
    message_handlers: RwLock<Vec<NamedHandler>>,
}

impl Chat {
    pub(crate) fn new(
        transport: Arc<dyn BotTransport>,
        config: &ChatConfig,
        defaults: ChatDefaults,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            transport,
            this: this.clone(),
            chat_id: ChatId(config.chat_id),
            topic: config.chat_topic,
            identifier: config.identifier.clone(),
            description: config.description.clone(),
            disable_web_page_preview: AtomicBool::new(defaults.disable_web_page_preview),
            retry: AtomicUsize::new(defaults.retry),
            retry_interval_nanos: AtomicU64::new(duration_nanos(defaults.retry_interval)),
            managed: DashMap::new(),
            commands: DashMap::new(),
            message_handlers: RwLock::new(Vec::new()),
        })
    }

    pub fn chat_id(&self) -> ChatId {
        self.chat_id
    }

    /// Configured topic: 0 = none, negative = whole chat, positive = topic id.
    pub fn topic(&self) -> i32 {
        self.topic
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn transport(&self) -> &Arc<dyn BotTransport> {
        &self.transport
    }

    /// Whether this registration matches every chat of its bot.
    pub fn is_wildcard(&self) -> bool {
        self.chat_id.0 == 0
    }

    // ========== Settings ==========

    pub fn retry(&self) -> usize {
        self.retry.load(Ordering::Relaxed)
    }

    pub fn set_retry(&self, retry: usize) {
        self.retry.store(retry, Ordering::Relaxed);
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_nanos(self.retry_interval_nanos.load(Ordering::Relaxed))
    }

    pub fn set_retry_interval(&self, interval: Duration) {
        self.retry_interval_nanos
            .store(duration_nanos(interval), Ordering::Relaxed);
    }

    pub fn disable_web_page_preview(&self) -> bool {
        self.disable_web_page_preview.load(Ordering::Relaxed)
    }

    pub fn set_disable_web_page_preview(&self, disable: bool) {
        self.disable_web_page_preview
            .store(disable, Ordering::Relaxed);
    }

    // ========== Sending ==========

    /// Send text, split into successive messages of at most [`MAX_TEXT_LEN`] bytes.
    ///
    /// `dest` overrides the chat and topic of this registration. If a chunk fails
    /// after retries, sending stops; messages already sent are returned inside
    /// [`Error::PartialSend`].
    pub async fn send_text(&self, dest: Option<Destination>, text: &str) -> Result<Vec<Message>> {
        let dest = self.resolve(dest)?;
        let mut sent = Vec::new();
        for chunk in split_text(text, MAX_TEXT_LEN) {
            match self.send_to(dest, chunk.to_string(), Vec::new()).await {
                Ok(msg) => sent.push(msg),
                Err(e) => return Err(partial(sent, e)),
            }
        }
        Ok(sent)
    }

    /// Send one message per component group.
    ///
    /// Every group is compiled and validated before anything is sent. A group
    /// compiling to empty text yields `None` at its position.
    pub async fn send_text_with_components(
        &self,
        dest: Option<Destination>,
        groups: &[Vec<MsgComponent>],
    ) -> Result<Vec<Option<Message>>> {
        let dest = self.resolve(dest)?;

        let mut compiled = Vec::with_capacity(groups.len());
        for group in groups {
            let (text, entities) = compile_components(group);
            if text.len() > MAX_TEXT_LEN {
                return Err(Error::TextTooLong { len: text.len() });
            }
            if entities.len() > MAX_ENTITIES {
                return Err(Error::TooManyEntities {
                    count: entities.len(),
                });
            }
            compiled.push((text, entities));
        }

        let mut out = Vec::with_capacity(compiled.len());
        for (text, entities) in compiled {
            if text.is_empty() {
                out.push(None);
                continue;
            }
            match self.send_to(dest, text, entities).await {
                Ok(msg) => out.push(Some(msg)),
                Err(e) => return Err(partial(out.into_iter().flatten().collect(), e)),
            }
        }
        Ok(out)
    }

    /// Send a photo from a local path (`is_local`) or a remote URL.
    pub async fn send_photo(
        &self,
        dest: Option<Destination>,
        path: &str,
        is_local: bool,
    ) -> Result<Message> {
        let dest = self.resolve(dest)?;
        let req = OutgoingPhoto {
            chat_id: dest.chat_id,
            photo: PhotoSource::new(path, is_local),
            reply_to: dest.reply_to(),
        };
        retry(self.retry(), self.retry_interval(), || {
            self.transport.send_photo(req.clone())
        })
        .await
    }

    /// Send text and register the resulting messages under `identifier`.
    ///
    /// The identifier is reserved before sending, so nothing is sent if it is
    /// taken and concurrent callers cannot both send. While the send is in
    /// flight the identifier resolves to no message. On [`Error::PartialSend`]
    /// the chunks already sent stay registered; any other failure frees it.
    pub async fn send_and_register(
        &self,
        dest: Option<Destination>,
        text: &str,
        identifier: &str,
        description: &str,
    ) -> Result<Vec<Arc<ChatMsg>>> {
        check_identifier(identifier)?;
        match self.managed.entry(identifier.to_string()) {
            Entry::Occupied(_) => return Err(Error::IdentifierAlreadyExists),
            Entry::Vacant(slot) => {
                slot.insert(Managed::Group(Vec::new()));
            }
        }

        match self.send_text(dest, text).await {
            Ok(sent) => Ok(self.fill_reserved(sent, identifier, description)),
            Err(Error::PartialSend { sent, source }) => {
                self.fill_reserved(sent.clone(), identifier, description);
                Err(Error::PartialSend { sent, source })
            }
            Err(e) => {
                self.managed.remove(identifier);
                Err(e)
            }
        }
    }

    // ========== Managed messages ==========

    /// Register one message under `identifier`.
    ///
    /// `msg = None` registers a virtual target: editing it sends a new message.
    pub fn register_msg(
        &self,
        msg: Option<Message>,
        identifier: &str,
        description: &str,
    ) -> Result<Arc<ChatMsg>> {
        check_identifier(identifier)?;
        match self.managed.entry(identifier.to_string()) {
            Entry::Occupied(_) => Err(Error::IdentifierAlreadyExists),
            Entry::Vacant(slot) => {
                let chat_msg = Arc::new(self.chat_msg(msg, identifier, description));
                slot.insert(Managed::Single(chat_msg.clone()));
                Ok(chat_msg)
            }
        }
    }

    /// Register a list of messages sharing one identifier and description.
    pub fn register_msgs(
        &self,
        msgs: Vec<Message>,
        identifier: &str,
        description: &str,
    ) -> Result<Vec<Arc<ChatMsg>>> {
        check_identifier(identifier)?;
        match self.managed.entry(identifier.to_string()) {
            Entry::Occupied(_) => Err(Error::IdentifierAlreadyExists),
            Entry::Vacant(slot) => {
                let group: Vec<Arc<ChatMsg>> = msgs
                    .into_iter()
                    .map(|m| Arc::new(self.chat_msg(Some(m), identifier, description)))
                    .collect();
                slot.insert(Managed::Group(group.clone()));
                Ok(group)
            }
        }
    }

    /// First message registered under `identifier`.
    pub fn get_msg(&self, identifier: &str) -> Result<Arc<ChatMsg>> {
        let entry = self
            .managed
            .get(identifier)
            .ok_or(Error::IdentifierNotFound)?;
        match entry.value() {
            Managed::Single(msg) => Ok(msg.clone()),
            Managed::Group(msgs) => msgs.first().cloned().ok_or(Error::IdentifierNotFound),
        }
    }

    /// All messages registered under `identifier`; a single registration is a
    /// one-element vector.
    pub fn get_msgs(&self, identifier: &str) -> Result<Vec<Arc<ChatMsg>>> {
        let entry = self
            .managed
            .get(identifier)
            .ok_or(Error::IdentifierNotFound)?;
        match entry.value() {
            Managed::Single(msg) => Ok(vec![msg.clone()]),
            Managed::Group(msgs) => Ok(msgs.clone()),
        }
    }

    /// Delete the remote messages of `identifier` and free the identifier.
    ///
    /// Remote deletes are best effort; the identifier is freed regardless.
    pub async fn delete_msgs(&self, identifier: &str) -> Result<()> {
        let msgs = self.get_msgs(identifier)?;
        for msg in msgs {
            if let Err(e) = msg.delete().await {
                warn!(
                    chat = %self.identifier,
                    identifier,
                    error = %e,
                    "failed to delete managed message"
                );
            }
        }
        self.managed.remove(identifier);
        Ok(())
    }

    /// Delete an arbitrary message through this chat's bot.
    pub async fn delete_msg(&self, msg: &Message) -> Result<()> {
        self.delete_ref(msg.reference()).await
    }

    pub async fn delete_msg_by_id(&self, chat_id: ChatId, message_id: MessageId) -> Result<()> {
        self.delete_ref(MessageRef {
            chat_id,
            message_id,
        })
        .await
    }

    // ========== Handlers ==========

    /// Register the handler for `/command`. The leading `/` is optional.
    pub fn register_command<H>(&self, command: &str, handler: H)
    where
        H: MessageHandler + 'static,
    {
        let token = command.trim_start_matches('/').to_string();
        self.commands.insert(token, Arc::new(handler));
    }

    /// Register a free-text handler under `name`. Re-registering a name
    /// replaces the handler and keeps its position.
    pub fn register_message_handler<H>(&self, name: &str, handler: H)
    where
        H: MessageHandler + 'static,
    {
        let handler: Arc<dyn MessageHandler> = Arc::new(handler);
        let mut handlers = self
            .message_handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        match handlers.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = handler,
            None => handlers.push((name.to_string(), handler)),
        }
    }

    pub fn has_handlers(&self) -> bool {
        !self.commands.is_empty()
            || !self
                .message_handlers
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .is_empty()
    }

    /// Run the handler registered for the message's command, if any.
    ///
    /// A panic inside the handler is returned as an error.
    pub async fn handle_command(&self, msg: &Message) -> anyhow::Result<()> {
        let Some(command) = msg.command() else {
            return Ok(());
        };
        let handler = self.commands.get(command).map(|h| h.value().clone());
        match handler {
            Some(handler) => run_isolated(handler, msg).await,
            None => Ok(()),
        }
    }

    /// Run every free-text handler in registration order and collect failures.
    ///
    /// A handler that panics is reported as a failure like one returning an error.
    pub async fn handle_message(&self, msg: &Message) -> Vec<(String, anyhow::Error)> {
        let handlers: Vec<NamedHandler> = self
            .message_handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        let mut failures = Vec::new();
        for (name, handler) in handlers {
            if let Err(e) = run_isolated(handler, msg).await {
                failures.push((name, e));
            }
        }
        failures
    }

    // ========== Internal ==========

    fn fill_reserved(
        &self,
        msgs: Vec<Message>,
        identifier: &str,
        description: &str,
    ) -> Vec<Arc<ChatMsg>> {
        let group: Vec<Arc<ChatMsg>> = msgs
            .into_iter()
            .map(|m| Arc::new(self.chat_msg(Some(m), identifier, description)))
            .collect();
        self.managed
            .insert(identifier.to_string(), Managed::Group(group.clone()));
        group
    }

    fn chat_msg(&self, msg: Option<Message>, identifier: &str, description: &str) -> ChatMsg {
        ChatMsg::new(
            self.this.clone(),
            msg,
            identifier.to_string(),
            description.to_string(),
        )
    }

    /// Destination for a send: the override, or this registration's chat/topic.
    pub(crate) fn resolve(&self, dest: Option<Destination>) -> Result<Destination> {
        let dest = dest.unwrap_or(Destination {
            chat_id: self.chat_id,
            topic: self.topic,
        });
        if dest.chat_id.0 == 0 {
            return Err(Error::ChatIdZero);
        }
        Ok(dest)
    }

    pub(crate) async fn send_to(
        &self,
        dest: Destination,
        text: String,
        entities: Vec<Entity>,
    ) -> Result<Message> {
        let req = OutgoingText {
            chat_id: dest.chat_id,
            text,
            entities,
            reply_to: dest.reply_to(),
            disable_web_page_preview: self.disable_web_page_preview(),
        };
        retry(self.retry(), self.retry_interval(), || {
            self.transport.send_text(req.clone())
        })
        .await
    }

    pub(crate) async fn edit(&self, edit: TextEdit) -> Result<()> {
        retry(self.retry(), self.retry_interval(), || {
            self.transport.edit_text(edit.clone())
        })
        .await
    }

    /// Remote delete; a message that is already gone counts as deleted.
    pub(crate) async fn delete_ref(&self, msg: MessageRef) -> Result<()> {
        retry(self.retry(), self.retry_interval(), || async move {
            match self.transport.delete_message(msg).await {
                Err(Error::MessageToDeleteNotFound) => Ok(()),
                other => other,
            }
        })
        .await
    }
}

impl std::fmt::Debug for Chat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chat")
            .field("identifier", &self.identifier)
            .field("chat_id", &self.chat_id)
            .field("topic", &self.topic)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

fn check_identifier(identifier: &str) -> Result<()> {
    if identifier.is_empty() {
        return Err(Error::IdentifierEmpty);
    }
    Ok(())
}

/// Run `handler` on its own task so a panic unwinds that task only.
async fn run_isolated(handler: Arc<dyn MessageHandler>, msg: &Message) -> anyhow::Result<()> {
    let msg = msg.clone();
    match tokio::spawn(async move { handler.handle(&msg).await }).await {
        Ok(res) => res,
        Err(e) if e.is_panic() => Err(anyhow::anyhow!("handler panicked: {e}")),
        Err(e) => Err(anyhow::anyhow!("handler task failed: {e}")),
    }
}

fn partial(sent: Vec<Message>, e: Error) -> Error {
    if sent.is_empty() {
        e
    } else {
        Error::PartialSend {
            sent,
            source: Box::new(e),
        }
    }
}

fn duration_nanos(d: Duration) -> u64 {
    u64::try_from(d.as_nanos()).unwrap_or(u64::MAX)
}
