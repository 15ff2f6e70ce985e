//! Reminder queries.

use canary_common::UserId;
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::connection::Database;
use crate::error::DbResult;
use crate::models::{NewReminder, Reminder};

const SELECT_REMINDERS: &str =
    "SELECT id, user_id, name, reminder, frequency, due_at, last_reminded_at FROM reminders";

impl Database {
    /// Store a reminder and return its id.
    pub async fn add_reminder(&self, reminder: &NewReminder) -> DbResult<i64> {
        let result = sqlx::query(
            "INSERT INTO reminders (user_id, name, reminder, frequency, due_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(reminder.user_id.as_i64())
        .bind(&reminder.name)
        .bind(&reminder.reminder)
        .bind(reminder.frequency.as_str())
        .bind(reminder.due_at)
        .execute(self.pool())
        .await?;

        let id = result.last_insert_rowid();
        debug!(reminder_id = id, user_id = %reminder.user_id, due_at = %reminder.due_at, "Saved reminder");
        Ok(id)
    }

    /// A user's reminders, soonest first.
    pub async fn reminders_for(&self, user_id: UserId) -> DbResult<Vec<Reminder>> {
        let mut reminders =
            sqlx::query_as::<_, Reminder>(&format!("{SELECT_REMINDERS} WHERE user_id = ?"))
                .bind(user_id.as_i64())
                .fetch_all(self.pool())
                .await?;
        reminders.sort_by_key(|r| (r.due_at, r.id));
        Ok(reminders)
    }

    /// Every stored reminder, by id.
    pub async fn all_reminders(&self) -> DbResult<Vec<Reminder>> {
        let reminders = sqlx::query_as::<_, Reminder>(&format!("{SELECT_REMINDERS} ORDER BY id"))
            .fetch_all(self.pool())
            .await?;
        Ok(reminders)
    }

    /// Reminders whose due time is not after `now`.
    pub async fn due_reminders(&self, now: DateTime<Utc>) -> DbResult<Vec<Reminder>> {
        let mut reminders = self.all_reminders().await?;
        reminders.retain(|r| r.due_at <= now);
        Ok(reminders)
    }

    /// Move a repeating reminder to its next occurrence.
    pub async fn reschedule_reminder(
        &self,
        id: i64,
        due_at: DateTime<Utc>,
        reminded_at: DateTime<Utc>,
    ) -> DbResult<bool> {
        let result =
            sqlx::query("UPDATE reminders SET due_at = ?, last_reminded_at = ? WHERE id = ?")
                .bind(due_at)
                .bind(reminded_at)
                .bind(id)
                .execute(self.pool())
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete a reminder. Returns whether it existed.
    pub async fn delete_reminder(&self, id: i64) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM reminders WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete a reminder only if it belongs to `user_id`.
    pub async fn delete_user_reminder(&self, id: i64, user_id: UserId) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM reminders WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id.as_i64())
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
