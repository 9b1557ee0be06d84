//! Outbound notifier: Discord webhook payloads and the client that posts them.

mod discord;
mod payload;

pub use discord::{DiscordError, DiscordWebhook, WebhookInfo};
pub use payload::{
    footer_text, Embed, EmbedFooter, EmbedImage, NotificationStyle, WebhookPayload,
    ATTACHMENT_FILENAME,
};
