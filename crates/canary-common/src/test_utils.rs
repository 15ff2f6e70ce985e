//! Test utilities and shared test helpers for Canary.
//!
//! Fixtures and helpers shared by the unit and integration tests of every
//! crate in the workspace.

use chrono::{DateTime, TimeZone, Utc};
use std::sync::Once;
use tracing_subscriber::{fmt, EnvFilter};

/// Initialize test logging once per test run.
static INIT: Once = Once::new();

/// Initialize logging for tests with a sensible default configuration.
/// This function is safe to call multiple times and will only initialize once.
pub fn init_test_logging() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
        let _ = fmt().with_test_writer().with_env_filter(filter).try_init();
    });
}

/// Test fixture for creating a fixed UTC timestamp.
pub fn mock_timestamp(
    year: i32,
    month: u32,
    day: u32,
    hour: u32,
    min: u32,
    sec: u32,
) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, min, sec)
        .unwrap()
}

/// Create a temporary directory for tests that automatically cleans up.
#[cfg(feature = "tempfile")]
pub fn create_temp_dir() -> tempfile::TempDir {
    tempfile::tempdir().expect("Failed to create temporary directory")
}

/// Discord-related test utilities.
pub mod discord_fixtures {
    use crate::UserId;

    /// Create a test user ID.
    pub fn test_user_id() -> UserId {
        UserId(987_654_321_098_765_432)
    }

    /// Create multiple test user IDs.
    pub fn test_user_ids(count: usize) -> Vec<UserId> {
        (0..count as u64)
            .map(|i| UserId(100_000_000_000_000_000 + i))
            .collect()
    }
}

/// Configuration-related test utilities.
pub mod config_fixtures {
    /// Create a minimal valid test configuration as YAML string.
    pub fn minimal_config_yaml() -> &'static str {
        r#"
discord:
  token: "test_token"
  guild_id: 123456789012345678
"#
    }

    /// Create a full test configuration as YAML string.
    pub fn full_config_yaml() -> &'static str {
        concat!(
            "discord:\n",
            "  token: \"test_token_full\"\n",
            "  guild_id: 123456789012345678\n",
            "  prefix: \"!\"\n",
            "  owner_ids: [42]\n",
            "\n",
            "database:\n",
            "  path: \"data/test.db\"\n",
            "\n",
            "general:\n",
            "  timezone: \"America/Toronto\"\n",
            "  page_size: 8\n",
            "  wizard_timeout_seconds: 90\n",
            "\n",
            "roles:\n",
            "  moderator_role: \"Discord Moderator\"\n",
            "  muted_role: \"Muted\"\n",
            "  categories:\n",
            "    pronouns:\n",
            "      roles: [\"she/her\", \"he/him\", \"they/them\"]\n",
            "      exclusive: false\n",
            "    year:\n",
            "      roles: [\"U0\", \"U1\", \"U2\", \"U3\"]\n",
            "      exclusive: true\n",
            "\n",
            "custom_reactions:\n",
            "  enabled: true\n",
            "\n",
            "banner:\n",
            "  submissions_channel_id: 777\n",
            "  vote_emoji: \"👍\"\n",
            "\n",
            "score:\n",
            "  upvote_emoji: \"upvote\"\n",
            "  downvote_emoji: \"downvote\"\n",
            "\n",
            "reminders:\n",
            "  poll_interval_seconds: 30\n",
            "\n",
            "logging:\n",
            "  level: \"debug\"\n",
            "  format: \"compact\"\n"
        )
    }
}
