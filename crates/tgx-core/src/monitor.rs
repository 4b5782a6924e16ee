//! Long-polling dispatch loop: one consumer task per bot credential.

use std::sync::Arc;

use tokio::{task::JoinHandle, time::sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    chat::Chat,
    config::PollConfig,
    domain::{Message, Update},
    registry::{RegisteredBot, Registry},
    transport::BotTransport,
    utils::mask_token,
};

/// Handle to the running consumers.
///
/// Dropping the handle does not stop them; call [`Monitor::shutdown`] or cancel
/// the token passed to [`Monitor::start`].
pub struct Monitor {
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl Monitor {
    /// Spawn one consumer for every credential with at least one handler.
    ///
    /// Credentials whose chats have no handlers are skipped, so handlers must be
    /// registered before the monitor starts. Chats added to an already polled
    /// credential later are picked up on the next update.
    pub fn start(registry: &Arc<Registry>, poll: PollConfig, cancel: CancellationToken) -> Self {
        let mut tasks = Vec::new();
        for bot in registry.registered_bots() {
            if !bot.has_handler() {
                info!(bot = %mask_token(&bot.token), "no handlers registered; not polling");
                continue;
            }
            let consumer = Consumer::new(registry.clone(), bot, poll, cancel.clone());
            tasks.push(tokio::spawn(consumer.run()));
        }
        info!(consumers = tasks.len(), "monitor started");
        Self { cancel, tasks }
    }

    /// Number of consumer tasks spawned.
    pub fn consumers(&self) -> usize {
        self.tasks.len()
    }

    /// Wait for every consumer to finish.
    pub async fn wait(self) {
        for task in self.tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "monitor consumer panicked");
            }
        }
    }

    /// Cancel every consumer and wait for them to stop.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        self.wait().await;
        info!("monitor stopped");
    }
}

struct Consumer {
    registry: Arc<Registry>,
    token: String,
    transport: Arc<dyn BotTransport>,
    poll: PollConfig,
    cancel: CancellationToken,
}

impl Consumer {
    fn new(
        registry: Arc<Registry>,
        bot: RegisteredBot,
        poll: PollConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            registry,
            token: bot.token,
            transport: bot.transport,
            poll,
            cancel,
        }
    }

    async fn run(self) {
        let bot = mask_token(&self.token);
        info!(%bot, "consumer started");

        let mut offset = 0i32;
        loop {
            let polled = tokio::select! {
                _ = self.cancel.cancelled() => break,
                res = self.transport.get_updates(offset, self.poll.timeout) => res,
            };

            match polled {
                Ok(updates) => {
                    for update in updates {
                        offset = offset.max(update.id.saturating_add(1));
                        self.dispatch(update).await;
                    }
                }
                Err(e) => {
                    warn!(%bot, error = %e, "failed to get updates");
                    tokio::select! {
                        _ = self.cancel.cancelled() => break,
                        _ = sleep(self.poll.error_backoff) => {}
                    }
                }
            }
        }

        info!(%bot, "consumer stopped");
    }

    async fn dispatch(&self, update: Update) {
        let Some(msg) = update.message else {
            debug!(update_id = update.id, "skipping update without message");
            return;
        };
        if msg.from == Some(self.transport.bot_id()) {
            debug!(update_id = update.id, "skipping own message");
            return;
        }

        for chat in self.registry.chats_for(&self.token) {
            if !matches(&chat, &msg) {
                continue;
            }
            if let Err(e) = chat.handle_command(&msg).await {
                warn!(chat = %chat.identifier(), error = %e, "command handler failed");
            }
            for (handler, e) in chat.handle_message(&msg).await {
                warn!(chat = %chat.identifier(), %handler, error = %e, "message handler failed");
            }
        }
    }
}

/// Whether an incoming message belongs to `chat`.
///
/// A wildcard chat matches everything. Otherwise the chat id must be equal and,
/// unless the chat's topic is negative, the message topic (its reply target)
/// must equal the chat's topic.
pub(crate) fn matches(chat: &Chat, msg: &Message) -> bool {
    if chat.is_wildcard() {
        return true;
    }
    if chat.chat_id() != msg.chat_id {
        return false;
    }
    chat.topic() < 0 || chat.topic() == msg.topic()
}
