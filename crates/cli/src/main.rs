use clap::{Parser, Subcommand};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "relay")]
#[command(about = "Forward Telegram channel posts to a Discord webhook", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Validate the Discord webhook and the Telegram bot token, then exit.
    Check {
        /// Config file path (default: RELAY_CONFIG_PATH or ./relay.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,
    },

    /// Run the relay (default when no subcommand is given).
    Run {
        /// Config file path (default: RELAY_CONFIG_PATH or ./relay.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,

        /// Liveness HTTP port (default from PORT, config, or 3000)
        #[arg(long, short)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() {
    // Environment-only deployments keep their settings in .env; a missing file is fine.
    let _ = dotenvy::dotenv();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("relay {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Check { config }) => match run_check(config).await {
            Ok(true) => {}
            Ok(false) => std::process::exit(1),
            Err(e) => {
                log::error!("check failed: {:#}", e);
                std::process::exit(1);
            }
        },
        Some(Commands::Run { config, port }) => {
            if let Err(e) = run_relay(config, port).await {
                log::error!("relay failed: {:#}", e);
                std::process::exit(1);
            }
        }
        None => {
            if let Err(e) = run_relay(None, None).await {
                log::error!("relay failed: {:#}", e);
                std::process::exit(1);
            }
        }
    }
}

async fn run_check(config_path: Option<std::path::PathBuf>) -> anyhow::Result<bool> {
    let (config, path) = relay::config::load_config(config_path)?;
    log::debug!("using config {}", path.display());
    let readiness = relay::startup::run_checks(&config).await?;
    println!(
        "telegram bot: {}",
        match &readiness.bot {
            Ok(bot) => format!("ok (@{})", bot.username.as_deref().unwrap_or("?")),
            Err(e) => format!("failed ({})", e),
        }
    );
    println!(
        "discord webhook: {}",
        match &readiness.webhook {
            Ok(hook) => format!("ok (id {})", hook.id),
            Err(e) => format!("failed ({})", e),
        }
    );
    Ok(readiness.webhook_ok())
}

async fn run_relay(
    config_path: Option<std::path::PathBuf>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    let (mut config, path) = relay::config::load_config(config_path)?;
    log::debug!("using config {}", path.display());
    if let Some(p) = port {
        config.liveness.port = p;
    }
    relay::startup::run_bridge(Arc::new(config)).await
}
