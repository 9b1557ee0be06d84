//! Telegram channel: long-poll getUpdates, getMe, and photo download via Bot API.

use crate::channels::inbound::{InboundEvent, PhotoRef};
use crate::config::TelegramConfig;
use crate::router::PhotoSource;
use async_trait::async_trait;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;

const POLL_RETRY_DELAY: Duration = Duration::from_secs(2);
const ALLOWED_UPDATES: &str = r#"["message","channel_post"]"#;

#[derive(Debug, thiserror::Error)]
pub enum TelegramError {
    #[error("telegram request failed: {0}")]
    Request(reqwest::Error),
    #[error("telegram {method} failed: {description}")]
    Api { method: String, description: String },
    #[error("telegram file {0} has no downloadable path")]
    MissingFilePath(String),
    #[error("telegram file download failed: {0}")]
    Download(reqwest::StatusCode),
}

// Request URLs carry the bot token; never let them reach a log line.
impl From<reqwest::Error> for TelegramError {
    fn from(e: reqwest::Error) -> Self {
        TelegramError::Request(e.without_url())
    }
}

/// Bot API envelope: `{ ok, result, description }`.
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
}

/// Telegram update payload (getUpdates result item).
#[derive(Debug, Deserialize)]
pub struct TelegramUpdate {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<TelegramMessage>,
    #[serde(default)]
    pub channel_post: Option<TelegramMessage>,
}

#[derive(Debug, Deserialize)]
pub struct TelegramMessage {
    pub chat: TelegramChat,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub photo: Option<Vec<PhotoSize>>,
}

#[derive(Debug, Deserialize)]
pub struct TelegramChat {
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhotoSize {
    pub file_id: String,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub file_size: Option<u64>,
}

/// getMe result.
#[derive(Debug, Clone, Deserialize)]
pub struct BotInfo {
    pub id: i64,
    pub first_name: String,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TelegramFile {
    file_id: String,
    #[serde(default)]
    file_path: Option<String>,
}

/// Largest variant by pixel area. Ties go to the later entry, since Telegram lists sizes ascending.
pub fn largest_photo(sizes: &[PhotoSize]) -> Option<&PhotoSize> {
    sizes
        .iter()
        .max_by_key(|p| u64::from(p.width) * u64::from(p.height))
}

impl TelegramUpdate {
    /// Map a direct message or channel post to an inbound event. Other kinds (stickers, edits, ...) yield None.
    pub fn into_event(self) -> Option<InboundEvent> {
        let msg = self.message.or(self.channel_post)?;
        let chat_username = msg.chat.username;
        if let Some(sizes) = msg.photo.as_deref() {
            let largest = largest_photo(sizes)?;
            return Some(InboundEvent::Photo {
                chat_username,
                caption: msg.caption,
                photo: PhotoRef {
                    file_id: largest.file_id.clone(),
                    width: largest.width,
                    height: largest.height,
                },
            });
        }
        msg.text.map(|text| InboundEvent::Text {
            chat_username,
            text,
        })
    }
}

/// Telegram channel connector: long-polls for updates and fetches photo files.
pub struct TelegramChannel {
    token: String,
    api_base: String,
    poll_timeout_secs: u64,
    running: AtomicBool,
    stop_signal: Notify,
    client: reqwest::Client,
}

impl TelegramChannel {
    pub fn new(token: impl Into<String>, config: &TelegramConfig) -> Self {
        Self {
            token: token.into(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            poll_timeout_secs: config.poll_timeout_secs,
            running: AtomicBool::new(false),
            stop_signal: Notify::new(),
            client: reqwest::Client::new(),
        }
    }

    fn running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.token, method)
    }

    /// GET a Bot API method and unwrap the `{ ok, result }` envelope.
    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        query: &[(&str, String)],
    ) -> Result<T, TelegramError> {
        let res = self
            .client
            .get(self.method_url(method))
            .query(query)
            .send()
            .await?;
        let status = res.status();
        let body = res.text().await?;
        let api_error = |description: String| TelegramError::Api {
            method: method.to_string(),
            description,
        };
        let data: ApiResponse<T> = serde_json::from_str(&body)
            .map_err(|_| api_error(format!("{} {}", status, body)))?;
        match data.result {
            Some(result) if data.ok => Ok(result),
            _ => Err(api_error(
                data.description
                    .unwrap_or_else(|| format!("{} (ok: {})", status, data.ok)),
            )),
        }
    }

    /// getMe: identity of the bound credential.
    pub async fn get_me(&self) -> Result<BotInfo, TelegramError> {
        self.call("getMe", &[]).await
    }

    /// Remove any webhook so getUpdates works; optionally discard the queued backlog.
    pub async fn delete_webhook(&self, drop_pending_updates: bool) -> Result<(), TelegramError> {
        let _: bool = self
            .call(
                "deleteWebhook",
                &[("drop_pending_updates", drop_pending_updates.to_string())],
            )
            .await?;
        Ok(())
    }

    /// Call Telegram getUpdates (long poll). Returns (updates, next_offset).
    async fn get_updates(
        &self,
        offset: Option<i64>,
    ) -> Result<(Vec<TelegramUpdate>, Option<i64>), TelegramError> {
        let mut query = vec![
            ("timeout", self.poll_timeout_secs.to_string()),
            ("allowed_updates", ALLOWED_UPDATES.to_string()),
        ];
        if let Some(off) = offset {
            query.push(("offset", off.to_string()));
        }
        let updates: Vec<TelegramUpdate> = self.call("getUpdates", &query).await?;
        let next_offset = updates.iter().map(|u| u.update_id).max().map(|id| id + 1);
        Ok((updates, next_offset))
    }

    /// Resolve a file id to its time-limited download path.
    async fn get_file_path(&self, file_id: &str) -> Result<String, TelegramError> {
        let file: TelegramFile = self
            .call("getFile", &[("file_id", file_id.to_string())])
            .await?;
        file.file_path
            .ok_or(TelegramError::MissingFilePath(file.file_id))
    }

    /// Resolve and download the photo variant. Binary body on success.
    pub async fn download_photo(&self, photo: &PhotoRef) -> Result<Bytes, TelegramError> {
        let file_path = self.get_file_path(&photo.file_id).await?;
        let url = format!("{}/file/bot{}/{}", self.api_base, self.token, file_path);
        let res = self.client.get(&url).send().await?;
        if !res.status().is_success() {
            return Err(TelegramError::Download(res.status()));
        }
        Ok(res.bytes().await?)
    }

    /// Start the getUpdates long-poll loop and push events to the router. Returns a handle to await on shutdown.
    pub fn start_inbound(
        self: Arc<Self>,
        inbound_tx: mpsc::Sender<InboundEvent>,
        drop_pending_updates: bool,
    ) -> JoinHandle<()> {
        self.running.store(true, Ordering::SeqCst);
        log::info!("telegram channel: starting getUpdates long-poll loop");
        tokio::spawn(async move {
            if drop_pending_updates {
                if let Err(e) = self.delete_webhook(true).await {
                    log::warn!("telegram: dropping pending updates failed: {}", e);
                }
            }
            run_get_updates_loop(self, inbound_tx).await;
        })
    }

    /// Stop the long-poll loop, interrupting a poll that is in flight.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.stop_signal.notify_one();
    }
}

async fn run_get_updates_loop(channel: Arc<TelegramChannel>, inbound_tx: mpsc::Sender<InboundEvent>) {
    let mut offset: Option<i64> = None;
    while channel.running() {
        let polled = tokio::select! {
            _ = channel.stop_signal.notified() => break,
            polled = channel.get_updates(offset) => polled,
        };
        match polled {
            Ok((updates, next)) => {
                if next.is_some() {
                    offset = next;
                }
                for event in updates.into_iter().filter_map(TelegramUpdate::into_event) {
                    if inbound_tx.send(event).await.is_err() {
                        log::debug!("telegram: inbound queue closed, stopping loop");
                        return;
                    }
                }
            }
            Err(e) => {
                log::debug!("telegram getUpdates error: {}", e);
                tokio::select! {
                    _ = channel.stop_signal.notified() => break,
                    _ = tokio::time::sleep(POLL_RETRY_DELAY) => {}
                }
            }
        }
    }
    log::info!("telegram channel: getUpdates loop stopped");
}

#[async_trait]
impl PhotoSource for TelegramChannel {
    async fn fetch_photo(&self, photo: &PhotoRef) -> Option<Bytes> {
        match self.download_photo(photo).await {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                log::error!("telegram: photo download failed: {}", e);
                None
            }
        }
    }
}
