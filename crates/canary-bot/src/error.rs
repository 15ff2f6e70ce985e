//! Application-wide error types using thiserror.

use canary_common::CanaryError;
use canary_config::ConfigError;
use canary_db::DbError;
use poise::serenity_prelude as serenity;

/// Main application error type.
#[derive(thiserror::Error, Debug)]
pub enum BotError {
    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(#[from] CanaryError),

    /// Configuration file could not be loaded.
    #[error(transparent)]
    ConfigLoad(#[from] ConfigError),

    /// Database could not be opened or migrated.
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    /// Discord/Serenity error.
    #[error("Discord error: {0}")]
    Discord(#[from] serenity::Error),

    /// Poise framework error.
    #[error("Framework error: {0}")]
    Framework(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for the bot application.
pub type BotResult<T> = Result<T, BotError>;
