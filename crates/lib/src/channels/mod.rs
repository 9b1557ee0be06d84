//! Inbound channel (Telegram).
//!
//! The Telegram connector long-polls the Bot API, maps text and photo posts to
//! [`InboundEvent`]s and pushes them onto an mpsc queue for the router. It also
//! resolves and downloads photo files on the router's behalf.

mod inbound;
mod telegram;

pub use inbound::{InboundEvent, PhotoRef};
pub use telegram::{
    BotInfo, TelegramChannel, TelegramChat, TelegramError, TelegramMessage, TelegramUpdate,
    PhotoSize,
};
