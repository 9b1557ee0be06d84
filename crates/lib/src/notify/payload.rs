//! Webhook payload types (Discord execute-webhook JSON).

use crate::config::DiscordConfig;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// File name of the attached image; the embed references it as `attachment://photo.jpg`.
pub const ATTACHMENT_FILENAME: &str = "photo.jpg";

/// `{ content, embeds: [...] }`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WebhookPayload {
    pub content: String,
    pub embeds: Vec<Embed>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Embed {
    pub description: String,
    pub color: u32,
    pub footer: EmbedFooter,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<EmbedImage>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbedFooter {
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbedImage {
    pub url: String,
}

/// Fixed decoration applied to every notification.
#[derive(Debug, Clone)]
pub struct NotificationStyle {
    pub mention: String,
    pub color: u32,
    pub footer_handle: String,
    pub footer_tag: String,
    pub date_format: String,
}

impl From<&DiscordConfig> for NotificationStyle {
    fn from(c: &DiscordConfig) -> Self {
        Self {
            mention: c.mention.clone(),
            color: c.color,
            footer_handle: c.footer_handle.clone(),
            footer_tag: c.footer_tag.clone(),
            date_format: c.date_format.clone(),
        }
    }
}

/// `handle • date • tag`
pub fn footer_text(style: &NotificationStyle, date: NaiveDate) -> String {
    format!(
        "{} • {} • {}",
        style.footer_handle,
        date.format(&style.date_format),
        style.footer_tag
    )
}

impl WebhookPayload {
    /// Build the notification for `body` as of `date`. With `with_image`, the embed shows the attached photo.
    pub fn build(style: &NotificationStyle, body: &str, with_image: bool, date: NaiveDate) -> Self {
        let image = with_image.then(|| EmbedImage {
            url: format!("attachment://{}", ATTACHMENT_FILENAME),
        });
        Self {
            content: style.mention.clone(),
            embeds: vec![Embed {
                description: body.to_string(),
                color: style.color,
                footer: EmbedFooter {
                    text: footer_text(style, date),
                },
                image,
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn style() -> NotificationStyle {
        NotificationStyle::from(&DiscordConfig::default())
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 7).unwrap()
    }

    #[test]
    fn footer_uses_short_italian_date() {
        assert_eq!(
            footer_text(&style(), date()),
            "t.me/poldonews • 7/3/2025 • jes.is-a.dev"
        );
    }

    #[test]
    fn text_payload_serializes_without_image() {
        let p = WebhookPayload::build(&style(), "hello", false, date());
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["content"], "<@1346512369102225560>");
        assert_eq!(json["embeds"][0]["description"], "hello");
        assert_eq!(json["embeds"][0]["color"], 16744256);
        assert!(json["embeds"][0].get("image").is_none());
    }

    #[test]
    fn image_payload_references_attachment() {
        let p = WebhookPayload::build(&style(), "", true, date());
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["embeds"][0]["description"], "");
        assert_eq!(json["embeds"][0]["image"]["url"], "attachment://photo.jpg");
    }
}
