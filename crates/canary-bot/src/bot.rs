//! Core bot logic using the Poise framework.

use crate::error::{BotError, BotResult};
use canary_commands::{create_framework, run_reminder_loop, Data};
use canary_config::Config;
use canary_db::Database;
use poise::serenity_prelude as serenity;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// Gateway intents the bot needs.
///
/// Message content feeds custom reactions and prefix commands; member
/// events drive role restoration.
pub fn gateway_intents() -> serenity::GatewayIntents {
    serenity::GatewayIntents::non_privileged()
        | serenity::GatewayIntents::MESSAGE_CONTENT
        | serenity::GatewayIntents::GUILD_MEMBERS
}

/// Guild slash commands are registered in, or `None` for global registration.
pub fn registration_guild(config: &Config) -> Option<serenity::GuildId> {
    (config.discord.guild_id != 0).then(|| serenity::GuildId::new(config.discord.guild_id))
}

/// Main bot structure.
pub struct CanaryBot {
    config: Arc<Config>,
    db: Database,
}

impl CanaryBot {
    /// Creates a new bot instance.
    pub fn new(config: Config, db: Database) -> Self {
        Self {
            config: Arc::new(config),
            db,
        }
    }

    /// Configuration the bot runs with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Connects to Discord and runs until the gateway closes or Ctrl-C.
    pub async fn start(&self) -> BotResult<()> {
        let config = self.config.clone();
        let db = self.db.clone();

        let framework = create_framework(&self.config)
            .setup(move |ctx, ready, framework| {
                Box::pin(async move {
                    let commands = &framework.options().commands;
                    match registration_guild(&config) {
                        Some(guild_id) => {
                            poise::builtins::register_in_guild(ctx, commands, guild_id).await?;
                            info!("Slash commands registered in guild {guild_id}");
                        }
                        None => {
                            poise::builtins::register_globally(ctx, commands).await?;
                            info!("Slash commands registered globally");
                        }
                    }
                    info!("Bot connected as {}", ready.user.name);

                    let interval = Duration::from_secs(config.reminders.poll_interval_seconds);
                    tokio::spawn(run_reminder_loop(ctx.clone(), db.clone(), interval));

                    let data = Data::new(config, db).await?;
                    Ok(data)
                })
            })
            .build();

        let mut client = serenity::ClientBuilder::new(&self.config.discord.token, gateway_intents())
            .framework(framework)
            .await
            .map_err(|e| BotError::Framework(format!("{e:?}")))?;

        let shard_manager = client.shard_manager.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for Ctrl-C: {e}");
                return;
            }
            info!("Shutting down");
            shard_manager.shutdown_all().await;
        });

        client.start().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intents_include_privileged_needs() {
        let intents = gateway_intents();
        assert!(intents.contains(serenity::GatewayIntents::MESSAGE_CONTENT));
        assert!(intents.contains(serenity::GatewayIntents::GUILD_MEMBERS));
        assert!(intents.contains(serenity::GatewayIntents::GUILD_MESSAGE_REACTIONS));
    }

    #[test]
    fn test_registration_guild() {
        let mut config = Config::default();
        config.discord.guild_id = 0;
        assert!(registration_guild(&config).is_none());
        config.discord.guild_id = 42;
        assert_eq!(registration_guild(&config), Some(serenity::GuildId::new(42)));
    }
}
