//! Event router: filter inbound events by origin channel and hand them to the notifier.
//!
//! Each event goes Received -> Forwarded | Dropped. Events are handled independently
//! (one spawned task each); there is no cross-event state and no ordering guarantee.

use crate::channels::{InboundEvent, PhotoRef};
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Resolves and downloads the image attached to a photo event. None means "do not forward".
#[async_trait]
pub trait PhotoSource: Send + Sync {
    async fn fetch_photo(&self, photo: &PhotoRef) -> Option<Bytes>;
}

/// Delivers one notification. Errors carry the reason for logging only.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, body: &str, image: Option<Bytes>) -> Result<(), String>;
}

/// Why an event was not forwarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropReason {
    /// Origin chat is not the monitored channel.
    ChannelMismatch { origin: Option<String> },
    /// The photo could not be resolved or downloaded.
    MissingImage,
    /// The sink rejected or failed the delivery.
    SendFailed(String),
}

/// Terminal state of one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Forwarded,
    Dropped(DropReason),
}

pub struct EventRouter {
    /// Monitored channel username without `@`; None forwards every chat.
    monitored: Option<String>,
    photos: Arc<dyn PhotoSource>,
    sink: Arc<dyn NotificationSink>,
}

impl EventRouter {
    pub fn new(
        monitored: Option<String>,
        photos: Arc<dyn PhotoSource>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            monitored,
            photos,
            sink,
        }
    }

    /// True when the event's origin chat should be forwarded.
    pub fn accepts(&self, event: &InboundEvent) -> bool {
        match self.monitored.as_deref() {
            None => true,
            Some(expected) => event.chat_username() == Some(expected),
        }
    }

    /// Process one inbound event to its terminal state.
    pub async fn handle(&self, event: InboundEvent) -> Outcome {
        if !self.accepts(&event) {
            log::info!(
                "ignored {} message: not from channel @{}",
                event.kind(),
                self.monitored.as_deref().unwrap_or_default()
            );
            return Outcome::Dropped(DropReason::ChannelMismatch {
                origin: event.chat_username().map(str::to_string),
            });
        }

        let image = match &event {
            InboundEvent::Text { .. } => None,
            InboundEvent::Photo { photo, .. } => match self.photos.fetch_photo(photo).await {
                Some(bytes) => Some(bytes),
                None => {
                    log::warn!(
                        "photo {} ({}x{}) not forwarded: no image data",
                        photo.file_id,
                        photo.width,
                        photo.height
                    );
                    return Outcome::Dropped(DropReason::MissingImage);
                }
            },
        };

        match self.sink.notify(event.body(), image).await {
            Ok(()) => {
                log::info!("{} message forwarded to discord", event.kind());
                Outcome::Forwarded
            }
            Err(e) => {
                log::error!("sending {} message to discord failed: {}", event.kind(), e);
                Outcome::Dropped(DropReason::SendFailed(e))
            }
        }
    }

    /// Consume events until the queue closes, handling each in its own task.
    pub fn start(self: Arc<Self>, mut inbound_rx: mpsc::Receiver<InboundEvent>) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(event) = inbound_rx.recv().await {
                let router = self.clone();
                tokio::spawn(async move {
                    router.handle(event).await;
                });
            }
            log::debug!("router: inbound queue closed");
        })
    }
}
