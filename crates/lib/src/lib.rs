//! Relay core library: Telegram inbound channel, Discord webhook notifier,
//! event router, liveness endpoint, and the startup sequence that ties them together.

pub mod channels;
pub mod config;
pub mod liveness;
pub mod notify;
pub mod router;
pub mod startup;
