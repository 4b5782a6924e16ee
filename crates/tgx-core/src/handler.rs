use std::future::Future;

use async_trait::async_trait;

use crate::domain::Message;

/// Callback invoked by the monitor for a matching incoming message.
///
/// Async closures `Fn(Message) -> impl Future<Output = anyhow::Result<()>>`
/// implement this trait, so most callers never name it.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, msg: &Message) -> anyhow::Result<()>;
}

#[async_trait]
impl<F, Fut> MessageHandler for F
where
    F: Fn(Message) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    async fn handle(&self, msg: &Message) -> anyhow::Result<()> {
        (self)(msg.clone()).await
    }
}
