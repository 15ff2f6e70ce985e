//! Configuration schema definitions.

use canary_common::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Main configuration structure for Canary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Discord connection configuration.
    pub discord: DiscordConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Settings shared by every module.
    pub general: GeneralConfig,
    /// Role self-service and moderation roles.
    pub roles: RolesConfig,
    /// Custom reaction settings.
    pub custom_reactions: CustomReactionsConfig,
    /// Banner contest settings.
    pub banner: BannerConfig,
    /// Reaction score settings.
    pub score: ScoreConfig,
    /// Reminder settings.
    pub reminders: RemindersConfig,
    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Discord bot configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscordConfig {
    /// Discord bot token.
    pub token: String,
    /// Guild commands are registered in; `0` registers globally.
    pub guild_id: u64,
    /// Prefix for text commands.
    pub prefix: String,
    /// Users with owner level permissions.
    pub owner_ids: Vec<u64>,
}

/// Database configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Path of the SQLite database file.
    pub path: PathBuf,
}

/// Settings shared by every module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// IANA timezone used to display and parse wall-clock times.
    pub timezone: String,
    /// Items shown per paginator page.
    pub page_size: usize,
    /// Seconds an interactive menu waits for input before closing.
    pub wizard_timeout_seconds: u64,
}

/// A group of self-assignable roles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RoleCategory {
    /// Role names in this category.
    pub roles: Vec<String>,
    /// Whether a member may hold at most one role of this category.
    pub exclusive: bool,
}

/// Role configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RolesConfig {
    /// Name of the role granting moderator commands.
    pub moderator_role: String,
    /// Name of the role applied to muted members.
    pub muted_role: String,
    /// Self-assignable role categories keyed by category name.
    pub categories: BTreeMap<String, RoleCategory>,
}

/// Custom reaction configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomReactionsConfig {
    /// Whether incoming messages are matched against custom reactions.
    pub enabled: bool,
}

/// Banner contest configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BannerConfig {
    /// Channel submissions are posted to for voting; `0` disables submissions.
    pub submissions_channel_id: u64,
    /// Emoji voters react with.
    pub vote_emoji: String,
}

/// Reaction score configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreConfig {
    /// Emoji name counted as an upvote.
    pub upvote_emoji: String,
    /// Emoji name counted as a downvote.
    pub downvote_emoji: String,
}

/// Reminder configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemindersConfig {
    /// Seconds between checks for due reminders.
    pub poll_interval_seconds: u64,
}

impl Config {
    /// Parsed timezone, falling back to UTC for names that do not parse.
    ///
    /// Validation rejects unknown names, so the fallback only applies to
    /// configs that skipped validation.
    pub fn timezone(&self) -> chrono_tz::Tz {
        self.general.timezone.parse().unwrap_or(chrono_tz::UTC)
    }

    /// Wizard timeout as a duration.
    pub const fn wizard_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.general.wizard_timeout_seconds)
    }

    /// Finds the category holding a role name, compared case-insensitively.
    pub fn category_of(&self, role_name: &str) -> Option<(&str, &RoleCategory)> {
        self.roles.categories.iter().find_map(|(name, category)| {
            category
                .roles
                .iter()
                .any(|r| r.eq_ignore_ascii_case(role_name))
                .then_some((name.as_str(), category))
        })
    }
}
