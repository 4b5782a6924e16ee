//! Core of the tgx chat wrapper.
//!
//! This crate is framework-agnostic. The Telegram client lives behind the
//! [`transport::BotTransport`] port, implemented in an adapter crate.

pub mod chat;
pub mod chat_msg;
pub mod components;
pub mod config;
pub mod domain;
pub mod errors;
pub mod handler;
pub mod logging;
pub mod monitor;
pub mod registry;
pub mod retry;
pub mod transport;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;

pub use chat::Chat;
pub use chat_msg::ChatMsg;
pub use components::{compile_components, MsgComponent};
pub use config::{ChatConfig, ChatDefaults, Config, PollConfig};
pub use errors::{Error, Result};
pub use handler::MessageHandler;
pub use monitor::Monitor;
pub use registry::{RegisteredBot, Registry};
