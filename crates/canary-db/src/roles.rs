//! Role snapshots taken on mute and when a member leaves.

use canary_common::{RoleId, UserId};
use chrono::{DateTime, Utc};
use sqlx::Row;
use tracing::debug;

use crate::connection::Database;
use crate::error::DbResult;
use crate::models::RoleSnapshot;

/// Which snapshot table to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SnapshotTable {
    Muted,
    Previous,
}

impl SnapshotTable {
    const fn name(self) -> &'static str {
        match self {
            Self::Muted => "muted_users",
            Self::Previous => "previous_roles",
        }
    }

    const fn time_column(self) -> &'static str {
        match self {
            Self::Muted => "muted_at",
            Self::Previous => "saved_at",
        }
    }
}

impl Database {
    /// Record the roles taken from a muted member.
    pub async fn save_mute(&self, user_id: UserId, role_ids: &[RoleId]) -> DbResult<()> {
        self.save_snapshot(SnapshotTable::Muted, user_id, role_ids).await
    }

    /// The roles taken from a member when they were muted, if they are muted.
    pub async fn mute_snapshot(&self, user_id: UserId) -> DbResult<Option<RoleSnapshot>> {
        self.snapshot(SnapshotTable::Muted, user_id).await
    }

    /// Forget a mute. Returns whether the member was muted.
    pub async fn delete_mute(&self, user_id: UserId) -> DbResult<bool> {
        self.delete_snapshot(SnapshotTable::Muted, user_id).await
    }

    /// Record the roles of a member who left the server.
    pub async fn save_previous_roles(&self, user_id: UserId, role_ids: &[RoleId]) -> DbResult<()> {
        self.save_snapshot(SnapshotTable::Previous, user_id, role_ids)
            .await
    }

    /// Roles a returning member had when they left.
    pub async fn previous_roles(&self, user_id: UserId) -> DbResult<Option<RoleSnapshot>> {
        self.snapshot(SnapshotTable::Previous, user_id).await
    }

    /// Forget a departed member's roles.
    pub async fn delete_previous_roles(&self, user_id: UserId) -> DbResult<bool> {
        self.delete_snapshot(SnapshotTable::Previous, user_id).await
    }

    async fn save_snapshot(
        &self,
        table: SnapshotTable,
        user_id: UserId,
        role_ids: &[RoleId],
    ) -> DbResult<()> {
        let role_ids_json = serde_json::to_string(role_ids)?;
        sqlx::query(&format!(
            "INSERT OR REPLACE INTO {} (user_id, role_ids, {}) VALUES (?, ?, ?)",
            table.name(),
            table.time_column()
        ))
        .bind(user_id.as_i64())
        .bind(role_ids_json)
        .bind(Utc::now())
        .execute(self.pool())
        .await?;

        debug!(user_id = %user_id, roles = role_ids.len(), table = table.name(), "Saved role snapshot");
        Ok(())
    }

    async fn snapshot(&self, table: SnapshotTable, user_id: UserId) -> DbResult<Option<RoleSnapshot>> {
        let row = sqlx::query(&format!(
            "SELECT role_ids, {} AS taken_at FROM {} WHERE user_id = ?",
            table.time_column(),
            table.name()
        ))
        .bind(user_id.as_i64())
        .fetch_optional(self.pool())
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let role_ids_json: String = row.try_get("role_ids")?;
        let taken_at: DateTime<Utc> = row.try_get("taken_at")?;
        Ok(Some(RoleSnapshot {
            user_id,
            role_ids: serde_json::from_str(&role_ids_json)?,
            taken_at,
        }))
    }

    async fn delete_snapshot(&self, table: SnapshotTable, user_id: UserId) -> DbResult<bool> {
        let result = sqlx::query(&format!("DELETE FROM {} WHERE user_id = ?", table.name()))
            .bind(user_id.as_i64())
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mute_and_previous_are_separate() {
        let db = Database::in_memory().await.unwrap();
        let user = UserId(10);

        db.save_mute(user, &[RoleId(1), RoleId(2)]).await.unwrap();
        assert!(db.previous_roles(user).await.unwrap().is_none());

        let snapshot = db.mute_snapshot(user).await.unwrap().unwrap();
        assert_eq!(snapshot.role_ids, vec![RoleId(1), RoleId(2)]);

        db.save_previous_roles(user, &[RoleId(3)]).await.unwrap();
        db.save_previous_roles(user, &[RoleId(4)]).await.unwrap();
        assert_eq!(
            db.previous_roles(user).await.unwrap().unwrap().role_ids,
            vec![RoleId(4)]
        );

        assert!(db.delete_mute(user).await.unwrap());
        assert!(!db.delete_mute(user).await.unwrap());
        assert!(db.delete_previous_roles(user).await.unwrap());
    }

    #[tokio::test]
    async fn test_empty_snapshot() {
        let db = Database::in_memory().await.unwrap();
        db.save_mute(UserId(1), &[]).await.unwrap();
        let snapshot = db.mute_snapshot(UserId(1)).await.unwrap().unwrap();
        assert!(snapshot.role_ids.is_empty());
    }
}
