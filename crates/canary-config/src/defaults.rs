//! Default values for every configuration section.

use crate::schema::*;
use canary_common::logging::LoggingConfig;
use std::collections::BTreeMap;
use std::path::PathBuf;

impl Default for Config {
    fn default() -> Self {
        Self {
            discord: DiscordConfig::default(),
            database: DatabaseConfig::default(),
            general: GeneralConfig::default(),
            roles: RolesConfig::default(),
            custom_reactions: CustomReactionsConfig::default(),
            banner: BannerConfig::default(),
            score: ScoreConfig::default(),
            reminders: RemindersConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            guild_id: 0,
            prefix: "?".to_string(),
            owner_ids: Vec::new(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/canary.db"),
        }
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            timezone: "America/Toronto".to_string(),
            page_size: 10,
            wizard_timeout_seconds: 120,
        }
    }
}

impl Default for RolesConfig {
    fn default() -> Self {
        let mut categories = BTreeMap::new();
        categories.insert(
            "pronouns".to_string(),
            RoleCategory {
                roles: vec!["she/her".into(), "he/him".into(), "they/them".into()],
                exclusive: false,
            },
        );
        categories.insert(
            "year".to_string(),
            RoleCategory {
                roles: vec![
                    "U0".into(),
                    "U1".into(),
                    "U2".into(),
                    "U3".into(),
                    "U4+".into(),
                    "Grad".into(),
                ],
                exclusive: true,
            },
        );
        Self {
            moderator_role: "Discord Moderator".to_string(),
            muted_role: "Muted".to_string(),
            categories,
        }
    }
}

impl Default for CustomReactionsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Default for BannerConfig {
    fn default() -> Self {
        Self {
            submissions_channel_id: 0,
            vote_emoji: "👍".to_string(),
        }
    }
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self {
            upvote_emoji: "upvote".to_string(),
            downvote_emoji: "downvote".to_string(),
        }
    }
}

impl Default for RemindersConfig {
    fn default() -> Self {
        Self {
            poll_interval_seconds: 60,
        }
    }
}
