//! Local stand-ins for the Telegram Bot API and a Discord webhook, served by axum on free ports.

#![allow(dead_code)]

use axum::{
    body::Bytes,
    extract::{FromRequest, Multipart, Request, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use relay::config::Config;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const BOT_TOKEN: &str = "test-token";
pub const FILE_PATH: &str = "photos/file_1.jpg";

pub fn free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind free port");
    listener.local_addr().expect("local_addr").port()
}

/// Serve `app` on an ephemeral port; returns its base URL. The task is left running.
pub async fn spawn_server(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind fake server");
    let addr = listener.local_addr().expect("local_addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{}", addr)
}

/// Poll `check` every 20ms for up to 5s.
pub async fn wait_until<F: Fn() -> bool>(check: F) -> bool {
    for _ in 0..250 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    check()
}

// --- Discord ---

#[derive(Debug, Clone)]
pub enum Captured {
    Json(Value),
    Multipart {
        payload: Value,
        file: Vec<u8>,
        file_name: Option<String>,
    },
}

#[derive(Clone)]
pub struct FakeDiscord {
    get_status: StatusCode,
    get_body: Value,
    pub posts: Arc<Mutex<Vec<Captured>>>,
}

impl FakeDiscord {
    pub fn valid() -> Self {
        Self::with_response(StatusCode::OK, json!({ "id": "123", "name": "x" }))
    }

    pub fn with_response(get_status: StatusCode, get_body: Value) -> Self {
        Self {
            get_status,
            get_body,
            posts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn posts(&self) -> Vec<Captured> {
        self.posts.lock().unwrap().clone()
    }

    /// Serve and return the webhook URL.
    pub async fn spawn(&self) -> String {
        let app = Router::new()
            .route("/api/webhooks/1/secret", get(discord_get).post(discord_post))
            .with_state(self.clone());
        format!("{}/api/webhooks/1/secret", spawn_server(app).await)
    }
}

async fn discord_get(State(state): State<FakeDiscord>) -> impl IntoResponse {
    (state.get_status, Json(state.get_body.clone()))
}

async fn discord_post(State(state): State<FakeDiscord>, req: Request) -> StatusCode {
    let is_multipart = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("multipart/form-data"))
        .unwrap_or(false);
    let captured = if is_multipart {
        let Ok(mut multipart) = Multipart::from_request(req, &()).await else {
            return StatusCode::BAD_REQUEST;
        };
        let mut payload = Value::Null;
        let mut file = Vec::new();
        let mut file_name = None;
        while let Ok(Some(field)) = multipart.next_field().await {
            match field.name().unwrap_or_default().to_string().as_str() {
                "payload_json" => {
                    let text = field.text().await.unwrap_or_default();
                    payload = serde_json::from_str(&text).unwrap_or(Value::Null);
                }
                "file" => {
                    file_name = field.file_name().map(String::from);
                    file = field.bytes().await.map(|b| b.to_vec()).unwrap_or_default();
                }
                _ => {}
            }
        }
        Captured::Multipart {
            payload,
            file,
            file_name,
        }
    } else {
        let Ok(body) = axum::body::to_bytes(req.into_body(), usize::MAX).await else {
            return StatusCode::BAD_REQUEST;
        };
        Captured::Json(serde_json::from_slice(&body).unwrap_or(Value::Null))
    };
    state.posts.lock().unwrap().push(captured);
    StatusCode::NO_CONTENT
}

// --- Telegram ---

#[derive(Clone)]
pub struct FakeTelegram {
    get_me_ok: bool,
    photo: Option<Vec<u8>>,
    updates: Arc<Mutex<Vec<Value>>>,
}

impl FakeTelegram {
    pub fn new() -> Self {
        Self {
            get_me_ok: true,
            photo: None,
            updates: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_bad_token(mut self) -> Self {
        self.get_me_ok = false;
        self
    }

    pub fn with_photo(mut self, bytes: &[u8]) -> Self {
        self.photo = Some(bytes.to_vec());
        self
    }

    /// Queue updates returned by the next getUpdates call.
    pub fn push_updates(&self, updates: Vec<Value>) {
        self.updates.lock().unwrap().extend(updates);
    }

    /// Serve and return the API base URL.
    pub async fn spawn(&self) -> String {
        let bot = format!("/bot{}", BOT_TOKEN);
        let app = Router::new()
            .route(&format!("{}/getMe", bot), get(tg_get_me))
            .route(&format!("{}/getUpdates", bot), get(tg_get_updates))
            .route(&format!("{}/deleteWebhook", bot), get(tg_delete_webhook))
            .route(&format!("{}/getFile", bot), get(tg_get_file))
            .route(&format!("/file{}/{}", bot, FILE_PATH), get(tg_file))
            .with_state(self.clone());
        spawn_server(app).await
    }
}

async fn tg_get_me(State(state): State<FakeTelegram>) -> impl IntoResponse {
    if state.get_me_ok {
        (
            StatusCode::OK,
            Json(json!({ "ok": true, "result": { "id": 123, "is_bot": true, "first_name": "Relay", "username": "relay_bot" } })),
        )
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "ok": false, "error_code": 401, "description": "Unauthorized" })),
        )
    }
}

async fn tg_get_updates(State(state): State<FakeTelegram>) -> Json<Value> {
    let updates: Vec<Value> = std::mem::take(&mut *state.updates.lock().unwrap());
    if updates.is_empty() {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    Json(json!({ "ok": true, "result": updates }))
}

async fn tg_delete_webhook() -> Json<Value> {
    Json(json!({ "ok": true, "result": true }))
}

async fn tg_get_file(State(state): State<FakeTelegram>) -> impl IntoResponse {
    if state.photo.is_some() {
        (
            StatusCode::OK,
            Json(json!({ "ok": true, "result": { "file_id": "big", "file_unique_id": "u", "file_path": FILE_PATH } })),
        )
    } else {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({ "ok": false, "error_code": 400, "description": "Bad Request: invalid file_id" })),
        )
    }
}

async fn tg_file(State(state): State<FakeTelegram>) -> impl IntoResponse {
    match state.photo {
        Some(bytes) => (StatusCode::OK, Bytes::from(bytes)),
        None => (StatusCode::NOT_FOUND, Bytes::new()),
    }
}

pub fn channel_text(update_id: i64, username: &str, text: &str) -> Value {
    json!({
        "update_id": update_id,
        "channel_post": {
            "message_id": update_id,
            "date": 0,
            "chat": { "id": -1001, "type": "channel", "username": username },
            "text": text
        }
    })
}

pub fn channel_photo(update_id: i64, username: &str, caption: Option<&str>) -> Value {
    let mut post = json!({
        "message_id": update_id,
        "date": 0,
        "chat": { "id": -1001, "type": "channel", "username": username },
        "photo": [
            { "file_id": "small", "file_unique_id": "s", "width": 90, "height": 90 },
            { "file_id": "big", "file_unique_id": "b", "width": 1280, "height": 1280 }
        ]
    });
    if let Some(c) = caption {
        post["caption"] = json!(c);
    }
    json!({ "update_id": update_id, "channel_post": post })
}

/// Config pointing at the fakes, liveness on a free loopback port.
pub fn test_config(api_base: &str, webhook_url: &str, channel: Option<&str>) -> Config {
    let mut config = Config::default();
    config.telegram.bot_token = Some(BOT_TOKEN.to_string());
    config.telegram.api_base = api_base.to_string();
    config.telegram.channel_username = channel.map(str::to_string);
    config.telegram.poll_timeout_secs = 0;
    config.discord.webhook_url = Some(webhook_url.to_string());
    config.liveness.bind = "127.0.0.1".to_string();
    config.liveness.port = free_port();
    config
}
