//! Transport port: the only surface the core uses to reach the bot API.

pub mod port;
pub mod types;

pub use port::{BotConnector, BotTransport};
pub use types::{OutgoingPhoto, OutgoingText, PhotoSource, TextEdit};
