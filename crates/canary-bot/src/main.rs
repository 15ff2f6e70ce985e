//! Main entry point for the Canary bot.

use anyhow::Result;
use canary_bot::CanaryBot;
use canary_common::logging::init_logging;
use canary_config::ConfigLoader;
use canary_db::Database;
use clap::Parser;
use tracing::{error, info};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path (YAML or TOML)
    #[arg(short, long, env = "CANARY_CONFIG_PATH")]
    config: Option<String>,

    /// Log level or filter, overriding the configuration
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => ConfigLoader::load_config(path)?,
        None => ConfigLoader::load()?,
    };
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }

    let _guard = init_logging(&config.logging)?;
    info!("Starting Canary bot");

    let db = Database::open(&config.database.path).await?;
    info!("Database ready at {}", config.database.path.display());

    let bot = CanaryBot::new(config, db);
    if let Err(e) = bot.start().await {
        error!("Bot stopped with an error: {e}");
        return Err(e.into());
    }

    info!("Bot stopped");
    Ok(())
}
