//! Discord webhook client: readiness GET and execute-webhook POST (JSON or multipart).

use crate::notify::payload::{NotificationStyle, WebhookPayload, ATTACHMENT_FILENAME};
use crate::router::NotificationSink;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};

#[derive(Debug, thiserror::Error)]
pub enum DiscordError {
    #[error("discord request failed: {0}")]
    Request(reqwest::Error),
    #[error("discord api error: {0}")]
    Api(String),
    #[error("discord webhook response has no id")]
    MissingId,
    #[error("serializing webhook payload: {0}")]
    Serialize(#[from] serde_json::Error),
}

// The webhook URL is itself the credential.
impl From<reqwest::Error> for DiscordError {
    fn from(e: reqwest::Error) -> Self {
        DiscordError::Request(e.without_url())
    }
}

/// Identity of a webhook as returned by GET on its URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookInfo {
    pub id: String,
    pub name: Option<String>,
}

/// Client for one Discord webhook URL.
#[derive(Clone)]
pub struct DiscordWebhook {
    url: String,
    style: NotificationStyle,
    client: reqwest::Client,
}

impl DiscordWebhook {
    pub fn new(url: impl Into<String>, style: NotificationStyle) -> Self {
        Self {
            url: url.into(),
            style,
            client: reqwest::Client::new(),
        }
    }

    /// GET the webhook URL. Valid when the status is 200 and the body carries an `id`.
    pub async fn verify(&self) -> Result<WebhookInfo, DiscordError> {
        let res = self.client.get(&self.url).send().await?;
        let status = res.status();
        if status != reqwest::StatusCode::OK {
            let body = res.text().await.unwrap_or_default();
            return Err(DiscordError::Api(format!("{} {}", status, body)));
        }
        let data: serde_json::Value = res.json().await?;
        let id = match data.get("id") {
            Some(serde_json::Value::String(s)) if !s.is_empty() => s.clone(),
            Some(serde_json::Value::Number(n)) => n.to_string(),
            _ => return Err(DiscordError::MissingId),
        };
        let name = data
            .get("name")
            .and_then(|v| v.as_str())
            .map(str::to_string);
        Ok(WebhookInfo { id, name })
    }

    /// POST one notification. With image bytes the request is multipart:
    /// `payload_json` (the serialized payload) plus `file` named `photo.jpg`.
    pub async fn send(&self, body: &str, image: Option<Bytes>) -> Result<(), DiscordError> {
        let today = chrono::Local::now().date_naive();
        let payload = WebhookPayload::build(&self.style, body, image.is_some(), today);
        let request = match image {
            Some(bytes) => {
                let file = Part::bytes(Vec::from(bytes))
                    .file_name(ATTACHMENT_FILENAME)
                    .mime_str("image/jpeg")?;
                let form = Form::new()
                    .text("payload_json", serde_json::to_string(&payload)?)
                    .part("file", file);
                self.client.post(&self.url).multipart(form)
            }
            None => self.client.post(&self.url).json(&payload),
        };
        let res = request.send().await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(DiscordError::Api(format!("{} {}", status, body)));
        }
        Ok(())
    }
}

#[async_trait]
impl NotificationSink for DiscordWebhook {
    async fn notify(&self, body: &str, image: Option<Bytes>) -> Result<(), String> {
        self.send(body, image).await.map_err(|e| e.to_string())
    }
}
