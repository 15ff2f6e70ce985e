//! Row types for every table.

use canary_common::{MessageId, RoleId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};
use std::fmt;
use std::str::FromStr;

use crate::error::DbError;

fn user_id(row: &SqliteRow, column: &str) -> Result<UserId, sqlx::Error> {
    Ok(UserId::from_i64(row.try_get(column)?))
}

/// A saved quote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quote {
    /// Row id
    pub id: i64,
    /// Member the quote is attributed to
    pub user_id: UserId,
    /// Display name of that member when the quote was saved
    pub name: String,
    /// The quote itself
    pub quote: String,
    /// When it was saved
    pub created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, SqliteRow> for Quote {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            user_id: user_id(row, "user_id")?,
            name: row.try_get("name")?,
            quote: row.try_get("quote")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

/// A custom reaction, approved or proposed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomReaction {
    /// Row id
    pub id: i64,
    /// Placeholder string a message must match
    pub prompt: String,
    /// Placeholder string sent back
    pub response: String,
    /// Creator
    pub user_id: UserId,
    /// Delete the triggering message
    pub delete_prompt: bool,
    /// Match inside longer messages
    pub anywhere: bool,
    /// Answer by direct message
    pub dm: bool,
    /// Awaiting moderator approval
    pub proposal: bool,
    /// When it was created
    pub created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, SqliteRow> for CustomReaction {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            prompt: row.try_get("prompt")?,
            response: row.try_get("response")?,
            user_id: user_id(row, "user_id")?,
            delete_prompt: row.try_get("delete_prompt")?,
            anywhere: row.try_get("anywhere")?,
            dm: row.try_get("dm")?,
            proposal: row.try_get("proposal")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

/// Fields of a custom reaction that is about to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCustomReaction {
    /// Placeholder string a message must match
    pub prompt: String,
    /// Placeholder string sent back
    pub response: String,
    /// Creator
    pub user_id: UserId,
    /// Delete the triggering message
    pub delete_prompt: bool,
    /// Match inside longer messages
    pub anywhere: bool,
    /// Answer by direct message
    pub dm: bool,
    /// Awaiting moderator approval
    pub proposal: bool,
}

/// How often a reminder fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    /// Fires once and is deleted
    Once,
    /// Every day
    Daily,
    /// Every seven days
    Weekly,
    /// Same day every calendar month
    Monthly,
}

impl Frequency {
    /// Column value.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Once => "once",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }

    /// Whether the reminder survives firing.
    pub const fn is_repeating(self) -> bool {
        !matches!(self, Self::Once)
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "once" => Ok(Self::Once),
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            other => Err(DbError::invalid_data(format!(
                "unknown reminder frequency '{other}'"
            ))),
        }
    }
}

/// A stored reminder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reminder {
    /// Row id
    pub id: i64,
    /// Who gets reminded
    pub user_id: UserId,
    /// Display name of that user
    pub name: String,
    /// Reminder text
    pub reminder: String,
    /// Repetition
    pub frequency: Frequency,
    /// Next time it fires
    pub due_at: DateTime<Utc>,
    /// Last time it fired, for repeating reminders
    pub last_reminded_at: Option<DateTime<Utc>>,
}

impl<'r> FromRow<'r, SqliteRow> for Reminder {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let frequency: String = row.try_get("frequency")?;
        Ok(Self {
            id: row.try_get("id")?,
            user_id: user_id(row, "user_id")?,
            name: row.try_get("name")?,
            reminder: row.try_get("reminder")?,
            frequency: frequency.parse().map_err(|e| sqlx::Error::ColumnDecode {
                index: "frequency".to_string(),
                source: Box::new(e),
            })?,
            due_at: row.try_get("due_at")?,
            last_reminded_at: row.try_get("last_reminded_at")?,
        })
    }
}

/// Fields of a reminder that is about to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReminder {
    /// Who gets reminded
    pub user_id: UserId,
    /// Display name of that user
    pub name: String,
    /// Reminder text
    pub reminder: String,
    /// Repetition
    pub frequency: Frequency,
    /// First time it fires
    pub due_at: DateTime<Utc>,
}

/// Roles saved for a member, either on mute or when they left the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleSnapshot {
    /// Member the roles belong to
    pub user_id: UserId,
    /// Saved roles
    pub role_ids: Vec<RoleId>,
    /// When the snapshot was taken
    pub taken_at: DateTime<Utc>,
}

/// A banner contest entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BannerSubmission {
    /// Submitter
    pub user_id: UserId,
    /// Submitted image
    pub image_url: String,
    /// Message in the submissions channel that collects votes
    pub message_id: MessageId,
    /// When it was submitted
    pub submitted_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, SqliteRow> for BannerSubmission {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            user_id: user_id(row, "user_id")?,
            image_url: row.try_get("image_url")?,
            message_id: MessageId::from_i64(row.try_get("message_id")?),
            submitted_at: row.try_get("submitted_at")?,
        })
    }
}

/// One scored reaction on a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactionRecord {
    /// Who reacted
    pub reacter_id: UserId,
    /// Author of the message
    pub reactee_id: UserId,
    /// Emoji name
    pub reaction_name: String,
    /// Message reacted to
    pub message_id: MessageId,
}

/// A member's vote totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Score {
    /// Upvotes received
    pub upvotes: i64,
    /// Downvotes received
    pub downvotes: i64,
}

impl Score {
    /// Upvotes minus downvotes.
    pub const fn net(&self) -> i64 {
        self.upvotes - self.downvotes
    }
}

/// A row of the score ranking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankingEntry {
    /// Member
    pub user_id: UserId,
    /// Last known display name
    pub name: String,
    /// Vote totals
    pub score: Score,
}

impl<'r> FromRow<'r, SqliteRow> for RankingEntry {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            user_id: user_id(row, "user_id")?,
            name: row.try_get("name")?,
            score: Score {
                upvotes: row.try_get("upvotes")?,
                downvotes: row.try_get("downvotes")?,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frequency_parse() {
        assert_eq!("Daily".parse::<Frequency>().unwrap(), Frequency::Daily);
        assert_eq!("once".parse::<Frequency>().unwrap(), Frequency::Once);
        assert!("yearly".parse::<Frequency>().is_err());
        assert!(Frequency::Monthly.is_repeating());
        assert!(!Frequency::Once.is_repeating());
        assert_eq!(Frequency::Weekly.to_string(), "weekly");
    }

    #[test]
    fn test_net_score() {
        let score = Score {
            upvotes: 3,
            downvotes: 5,
        };
        assert_eq!(score.net(), -2);
    }
}
