//! taskbot: Telegram to Todoist bridge
//!
//! Usage:
//!   taskbot                    - Start the webhook server
//!   taskbot --config <path>    - Start with an explicit TOML config file
//!   taskbot --help             - Show help

use std::path::PathBuf;
use std::sync::Arc;

use taskbot_core::{Config, TodoistClient};
use taskbot_telegram::TelegramBot;
use tracing_subscriber::EnvFilter;

/// Run mode
#[derive(Debug, PartialEq, Eq)]
enum RunMode {
    /// Webhook server, optionally with an explicit config file
    Server(Option<PathBuf>),
    /// Show help
    Help,
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = match parse_args(std::env::args().skip(1))? {
        RunMode::Help => {
            print_help();
            return Ok(());
        }
        RunMode::Version => {
            println!("taskbot {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        RunMode::Server(path) => path,
    };

    // Load .env file first so RUST_LOG can come from it
    dotenvy::dotenv().ok();

    // Initialize logging
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(rust_log.as_deref()))
        .init();

    let config = Config::load(config_path.as_deref())
        .map_err(|e| anyhow::anyhow!("Config error: {}", e))?;

    tracing::info!("Starting taskbot...");
    tracing::info!(
        "Allowed chats: {:?}, message replacement: {}",
        config.telegram.allowed_chat_ids,
        config.telegram.replace_last_message
    );

    let todoist = TodoistClient::new(&config.todoist)
        .map_err(|e| anyhow::anyhow!("Failed to create Todoist client: {}", e))?;

    let bot = TelegramBot::new(config.telegram.clone(), Arc::new(todoist))
        .map_err(|e| anyhow::anyhow!("Failed to create Telegram bot: {}", e))?;

    let (shutdown_tx, shutdown_rx) = tokio::sync::broadcast::channel(1);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Received Ctrl+C, shutting down...");
            let _ = shutdown_tx.send(());
        }
    });

    bot.run(config.server.port, shutdown_rx).await?;

    tracing::info!("taskbot stopped");
    Ok(())
}

/// Parse command line arguments
fn parse_args<I>(args: I) -> anyhow::Result<RunMode>
where
    I: IntoIterator<Item = String>,
{
    let mut config_path = None;
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--help" | "-h" => return Ok(RunMode::Help),
            "--version" | "-v" => return Ok(RunMode::Version),
            "--config" | "-c" => {
                let path = args
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--config requires a path"))?;
                config_path = Some(PathBuf::from(path));
            }
            other => anyhow::bail!("Unknown argument: {} (see --help)", other),
        }
    }

    Ok(RunMode::Server(config_path))
}

/// Log filter from `RUST_LOG`, `info` when unset or invalid
fn log_filter(rust_log: Option<&str>) -> EnvFilter {
    rust_log
        .filter(|v| !v.trim().is_empty())
        .and_then(|v| EnvFilter::try_new(v).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

/// Print help message
fn print_help() {
    println!("taskbot - Telegram to Todoist bridge");
    println!();
    println!("Usage:");
    println!("  taskbot                   Start the webhook server");
    println!("  taskbot --config <path>   Load settings from a TOML file");
    println!("  taskbot --help            Show this help message");
    println!("  taskbot --version         Show version");
    println!();
    println!("Environment Variables:");
    println!("  TELEGRAM_TOKEN        Telegram bot token (required)");
    println!("  TODOIST_API           Todoist API token (required)");
    println!("  ALLOWED_CHAT_IDS      Comma-separated chat ids allowed to use the bot (required)");
    println!("  PORT                  Webhook HTTP port (default: 3000)");
    println!("  WEBHOOK_URL           Public base URL; registers <url>/webhook at startup");
    println!("  REPLACE_LAST_MESSAGE  Delete the previous reply before answering (default: false)");
    println!("  TODOIST_BASE_URL      Todoist REST API root");
    println!("  TELEGRAM_API_BASE     Telegram Bot API root");
    println!("  RUST_LOG              Log filter (default: info)");
}
