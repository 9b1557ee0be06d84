//! Liveness HTTP responder for external uptime checks.
//!
//! Every request, whatever the path or method, gets `200 text/plain` with a fixed body.

use axum::{
    http::{header, StatusCode},
    response::IntoResponse,
    Router,
};

pub const LIVENESS_BODY: &str = "Bot is alive and running!\n";

/// Router with a single fallback handler; there is no routing.
pub fn router() -> Router {
    Router::new().fallback(alive)
}

async fn alive() -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain")],
        LIVENESS_BODY,
    )
}
