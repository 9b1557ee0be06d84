//! Startup sequence: readiness checks, then the liveness listener and the inbound subscription.
//!
//! Both checks always run to completion. A bad webhook is fatal (nothing could ever be
//! delivered); a failing getMe is only logged and the relay starts anyway.

use crate::channels::{BotInfo, TelegramChannel, TelegramError};
use crate::config::Config;
use crate::liveness;
use crate::notify::{DiscordError, DiscordWebhook, NotificationStyle, WebhookInfo};
use crate::router::EventRouter;
use anyhow::{Context, Result};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;

const INBOUND_QUEUE: usize = 64;

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("discord webhook is not valid or not reachable: {0}")]
    WebhookInvalid(#[source] DiscordError),
}

/// Result of both readiness checks.
#[derive(Debug)]
pub struct Readiness {
    pub bot: Result<BotInfo, TelegramError>,
    pub webhook: Result<WebhookInfo, DiscordError>,
}

impl Readiness {
    pub fn webhook_ok(&self) -> bool {
        self.webhook.is_ok()
    }

    /// Log the status of both checks.
    pub fn log(&self) {
        match &self.bot {
            Ok(bot) => log::info!(
                "bot started: @{} ({})",
                bot.username.as_deref().unwrap_or("?"),
                bot.first_name
            ),
            Err(e) => log::error!("fetching bot info failed: {}", e),
        }
        match &self.webhook {
            Ok(hook) => log::info!(
                "discord webhook valid. name: {}",
                hook.name.as_deref().unwrap_or("(no webhook name set)")
            ),
            Err(e) => log::error!("discord webhook check failed: {}", e),
        }
    }
}

/// Run getMe and the webhook GET concurrently; neither short-circuits the other.
pub async fn check_readiness(telegram: &TelegramChannel, webhook: &DiscordWebhook) -> Readiness {
    let (bot, webhook) = tokio::join!(telegram.get_me(), webhook.verify());
    Readiness { bot, webhook }
}

fn build_clients(config: &Config) -> Result<(Arc<TelegramChannel>, Arc<DiscordWebhook>)> {
    config.validate()?;
    let token = config.bot_token().unwrap_or_default();
    let url = config.webhook_url().unwrap_or_default();
    let telegram = Arc::new(TelegramChannel::new(token, &config.telegram));
    let webhook = Arc::new(DiscordWebhook::new(
        url,
        NotificationStyle::from(&config.discord),
    ));
    Ok((telegram, webhook))
}

/// Only the readiness checks (for `relay check`).
pub async fn run_checks(config: &Config) -> Result<Readiness> {
    let (telegram, webhook) = build_clients(config)?;
    let readiness = check_readiness(&telegram, &webhook).await;
    readiness.log();
    Ok(readiness)
}

/// Run the relay; blocks until SIGINT/SIGTERM.
pub async fn run_bridge(config: Arc<Config>) -> Result<()> {
    run_bridge_until(config, shutdown_signal()).await
}

/// Run the relay until `shutdown` completes. Fails before binding anything when the
/// webhook check fails ([`StartupError::WebhookInvalid`]). A shutdown that arrives while
/// the checks are still running ends the run cleanly with `Ok(())`.
pub async fn run_bridge_until<F>(config: Arc<Config>, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let (telegram, webhook) = build_clients(&config)?;
    // Raced against the checks so a signal during startup still exits cleanly.
    let mut shutdown = Box::pin(shutdown);

    let readiness = tokio::select! {
        readiness = check_readiness(&telegram, &webhook) => readiness,
        _ = &mut shutdown => {
            log::info!("shutdown requested during startup checks");
            return Ok(());
        }
    };
    readiness.log();
    let monitored = config.monitored_channel().map(str::to_string);
    match &monitored {
        Some(name) => log::info!("monitored telegram channel: @{}", name),
        None => log::warn!("no channel configured; forwarding every message the bot receives"),
    }
    if let Err(e) = readiness.webhook {
        log::error!("relay cannot start because the discord webhook is invalid");
        return Err(StartupError::WebhookInvalid(e).into());
    }
    log::info!("online");

    let bind_addr = format!("{}:{}", config.liveness.bind.trim(), config.liveness.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding liveness listener to {}", bind_addr))?;
    log::info!("liveness server listening on {}", bind_addr);

    let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_QUEUE);
    let router = Arc::new(EventRouter::new(monitored, telegram.clone(), webhook));
    let router_task = router.start(inbound_rx);
    let poll_task = telegram
        .clone()
        .start_inbound(inbound_tx, config.telegram.drop_pending_updates);

    let stop_channel = telegram.clone();
    axum::serve(listener, liveness::router())
        .with_graceful_shutdown(async move {
            shutdown.await;
            log::info!("shutdown requested, stopping telegram subscription");
            stop_channel.stop();
        })
        .await
        .context("liveness server exited")?;

    let _ = poll_task.await;
    let _ = router_task.await;
    log::info!("relay stopped");
    Ok(())
}

/// Future that completes when the process should shut down (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
