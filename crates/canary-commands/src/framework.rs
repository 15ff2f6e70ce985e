//! Poise framework setup and command registration logic.

use arc_swap::ArcSwap;
use canary_common::CanaryError;
use canary_config::Config;
use canary_db::{Database, DbResult};
use canary_pstrings::{PStringEncodings, ReactionSpec};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::checks::Permissions;
use crate::wizard::SessionRegistry;

/// Application data accessible in all commands.
pub struct Data {
    /// Application configuration.
    pub config: Arc<Config>,
    /// Persistent storage.
    pub db: Database,
    /// Owner and moderator lookups.
    pub permissions: Permissions,
    /// Compiled approved custom reactions.
    pub reactions: ArcSwap<PStringEncodings>,
    /// Users that currently have a wizard open.
    pub sessions: SessionRegistry,
    /// Serializes banner submissions.
    pub banner_lock: tokio::sync::Mutex<()>,
}

impl std::fmt::Debug for Data {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Data")
            .field("config", &"<Config>")
            .field("db", &self.db)
            .field("reactions", &self.reactions.load().len())
            .field("sessions", &self.sessions.len())
            .finish_non_exhaustive()
    }
}

impl Data {
    /// Builds the shared state and compiles the stored custom reactions.
    pub async fn new(config: Arc<Config>, db: Database) -> DbResult<Self> {
        let data = Self {
            permissions: Permissions::new(&config),
            config,
            db,
            reactions: ArcSwap::from_pointee(PStringEncodings::empty()),
            sessions: SessionRegistry::new(),
            banner_lock: tokio::sync::Mutex::new(()),
        };
        data.reload_reactions().await?;
        Ok(data)
    }

    /// Recompiles the approved custom reactions and swaps them in.
    /// Returns how many compiled.
    pub async fn reload_reactions(&self) -> DbResult<usize> {
        let specs = self
            .db
            .custom_reactions(false)
            .await?
            .into_iter()
            .map(|r| ReactionSpec {
                id: r.id,
                prompt: r.prompt,
                response: r.response,
                delete_prompt: r.delete_prompt,
                anywhere: r.anywhere,
                dm: r.dm,
            });

        let encodings = PStringEncodings::new(specs);
        let count = encodings.len();
        if !encodings.skipped().is_empty() {
            warn!(
                skipped = encodings.skipped().len(),
                "Some custom reactions could not be compiled"
            );
        }
        self.reactions.store(Arc::new(encodings));
        info!(count, "Custom reactions reloaded");
        Ok(count)
    }
}

/// Application error type for commands.
pub type Error = Box<dyn std::error::Error + Send + Sync>;

/// Command context type.
pub type Context<'a> = poise::Context<'a, Data, Error>;

/// Shorthand for an error the invoking user should see verbatim.
pub fn user_error(message: impl Into<String>) -> Error {
    CanaryError::validation(message).into()
}

/// Every command the bot registers.
pub fn commands() -> Vec<poise::Command<Data, Error>> {
    vec![
        help(),
        crate::custom_reactions::customreactions(),
        crate::roles::iam(),
        crate::roles::iamn(),
        crate::roles::roles(),
        crate::roles::inrole(),
        crate::roles::mute(),
        crate::roles::unmute(),
        crate::banner::banner(),
        crate::quotes::quote(),
        crate::reminders::remindme(),
        crate::reminders::reminders(),
        crate::reminders::reminder(),
        crate::score::score(),
        crate::score::ranking(),
        crate::games::roll(),
        crate::games::choose(),
    ]
}

/// Builds the framework options for `config`.
pub fn framework_options(config: &Config) -> poise::FrameworkOptions<Data, Error> {
    poise::FrameworkOptions {
        commands: commands(),
        prefix_options: poise::PrefixFrameworkOptions {
            prefix: Some(config.discord.prefix.clone()),
            mention_as_prefix: true,
            case_insensitive_commands: true,
            ..Default::default()
        },
        on_error: |error| Box::pin(on_error(error)),
        event_handler: |ctx, event, framework, data| {
            Box::pin(crate::events::event_handler(ctx, event, framework, data))
        },
        pre_command: |ctx| {
            Box::pin(async move {
                info!(
                    command = %ctx.command().qualified_name,
                    user = %ctx.author().id,
                    "Executing command"
                );
            })
        },
        ..Default::default()
    }
}

/// Creates a new Poise framework.
pub fn create_framework(config: &Config) -> poise::FrameworkBuilder<Data, Error> {
    poise::Framework::builder().options(framework_options(config))
}

/// Global error handler for the framework.
pub async fn on_error(error: poise::FrameworkError<'_, Data, Error>) {
    match error {
        poise::FrameworkError::Setup { error, .. } => {
            error!("Failed to start bot: {:?}", error);
        }
        poise::FrameworkError::Command { error, ctx, .. } => {
            let reply = match error.downcast_ref::<CanaryError>() {
                Some(e) if e.is_user_error() => e.user_message(),
                Some(e) => {
                    error!("Error in command '{}': {:?}", ctx.command().name, e);
                    e.user_message()
                }
                None => {
                    error!("Error in command '{}': {:?}", ctx.command().name, error);
                    "Something went wrong while running that command.".to_string()
                }
            };
            if let Err(e) = ctx.say(reply).await {
                warn!("Could not report command error: {}", e);
            }
        }
        poise::FrameworkError::CommandCheckFailed { error, ctx, .. } => {
            if let Some(error) = error {
                error!("Check for '{}' failed: {:?}", ctx.command().name, error);
            }
            if let Err(e) = ctx
                .say("You don't have permission to use this command.")
                .await
            {
                warn!("Could not report failed check: {}", e);
            }
        }
        poise::FrameworkError::EventHandler { error, event, .. } => {
            error!(
                "Error in event handler for {:?}: {:?}",
                event.snake_case_name(),
                error
            );
        }
        error => {
            if let Err(e) = poise::builtins::on_error(error).await {
                error!("Error while handling error: {}", e);
            }
        }
    }
}

/// Show help for all commands or one of them
#[poise::command(prefix_command, slash_command, track_edits)]
pub async fn help(
    ctx: Context<'_>,
    #[description = "Specific command to show help about"]
    #[rest]
    command: Option<String>,
) -> Result<(), Error> {
    let extra = format!(
        "Type {}help <command> for more info on a command.",
        ctx.data().config.discord.prefix
    );
    poise::builtins::help(
        ctx,
        command.as_deref(),
        poise::builtins::HelpConfiguration {
            extra_text_at_bottom: &extra,
            ..Default::default()
        },
    )
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_names_are_unique() {
        let commands = commands();
        let mut names: Vec<&str> = commands.iter().map(|c| c.name.as_str()).collect();
        let before = names.len();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), before);
        assert!(names.contains(&"customreactions"));
    }

    #[test]
    fn test_custom_reaction_aliases() {
        let command = crate::custom_reactions::customreactions();
        assert!(command.aliases.iter().any(|a| a == "cr"));
        assert!(command.aliases.iter().any(|a| a == "reactions"));
        assert!(command.guild_only);
    }

    #[test]
    fn test_user_error_roundtrip() {
        let err = user_error("Nope.");
        let canary = err.downcast_ref::<CanaryError>().unwrap();
        assert!(canary.is_user_error());
        assert_eq!(canary.user_message(), "Nope.");
    }

    #[tokio::test]
    async fn test_reload_reactions_swaps_encodings() {
        let db = Database::in_memory().await.unwrap();
        let data = Data::new(Arc::new(Config::default()), db.clone()).await.unwrap();
        assert!(data.reactions.load().is_empty());

        db.add_custom_reaction(&canary_db::NewCustomReaction {
            prompt: "ping".to_string(),
            response: "pong".to_string(),
            user_id: canary_common::UserId(1),
            delete_prompt: false,
            anywhere: false,
            dm: false,
            proposal: false,
        })
        .await
        .unwrap();
        assert_eq!(data.reload_reactions().await.unwrap(), 1);

        let mut rng = fastrand::Rng::with_seed(1);
        let resolved = data
            .reactions
            .load()
            .parser("ping", "<@1>", "general", &mut rng)
            .unwrap();
        assert_eq!(resolved.response, "pong");
    }
}
