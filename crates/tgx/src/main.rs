use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use tgx_core::{
    domain::{Destination, Message},
    Config, Monitor, Registry,
};
use tgx_telegram::TelegramConnector;

#[tokio::main]
async fn main() -> Result<(), tgx_core::Error> {
    tgx_core::logging::init("tgx")?;

    let cfg = Config::load()?;
    let registry = Arc::new(
        Registry::init(Arc::new(TelegramConnector), cfg.defaults, &cfg.chats).await?,
    );

    for chat in registry.chats() {
        let weak = Arc::downgrade(&chat);
        chat.register_command("ping", move |msg: Message| {
            let weak = weak.clone();
            async move {
                let Some(chat) = weak.upgrade() else {
                    return Ok::<_, anyhow::Error>(());
                };
                chat.send_text(Some(Destination::from_message(&msg)), &pong(&msg))
                    .await?;
                Ok::<_, anyhow::Error>(())
            }
        });
    }
    info!(chats = registry.chats().len(), "tgx started");

    let monitor = Monitor::start(&registry, cfg.poll, CancellationToken::new());

    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c; shutting down");
    }
    info!("shutting down");
    monitor.shutdown().await;

    Ok(())
}

/// Reply to `/ping`, echoing any arguments: `/ping db` answers `pong db`.
fn pong(msg: &Message) -> String {
    match msg.command_args() {
        Some(args) if !args.is_empty() => format!("pong {args}"),
        _ => "pong".to_string(),
    }
}
