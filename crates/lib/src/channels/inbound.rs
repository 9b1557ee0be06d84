//! Inbound event from the channel: delivered to the router for filtering and forwarding.

/// Reference to the photo variant chosen for download (largest resolution).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoRef {
    pub file_id: String,
    pub width: u32,
    pub height: u32,
}

/// A text or photo post seen by the bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    Text {
        /// Username of the originating chat, without `@`. None for chats that have no public username.
        chat_username: Option<String>,
        text: String,
    },
    Photo {
        chat_username: Option<String>,
        caption: Option<String>,
        photo: PhotoRef,
    },
}

impl InboundEvent {
    pub fn chat_username(&self) -> Option<&str> {
        match self {
            InboundEvent::Text { chat_username, .. } | InboundEvent::Photo { chat_username, .. } => {
                chat_username.as_deref()
            }
        }
    }

    /// Display text for the notification: message body or caption; absent text is empty.
    pub fn body(&self) -> &str {
        match self {
            InboundEvent::Text { text, .. } => text,
            InboundEvent::Photo { caption, .. } => caption.as_deref().unwrap_or(""),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            InboundEvent::Text { .. } => "text",
            InboundEvent::Photo { .. } => "photo",
        }
    }
}
