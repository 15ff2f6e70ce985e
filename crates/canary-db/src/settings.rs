//! Key/value settings stored as JSON.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::connection::Database;
use crate::error::DbResult;

impl Database {
    /// Read a setting, or `None` when it was never written.
    pub async fn get_setting<T: DeserializeOwned>(&self, key: &str) -> DbResult<Option<T>> {
        let value: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(self.pool())
            .await?;

        value
            .map(|json| serde_json::from_str(&json))
            .transpose()
            .map_err(Into::into)
    }

    /// Write a setting, replacing any previous value.
    pub async fn set_setting<T: Serialize + Sync + ?Sized>(&self, key: &str, value: &T) -> DbResult<()> {
        let json = serde_json::to_string(value)?;
        sqlx::query(
            "INSERT INTO settings (key, value) VALUES (?, ?) ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        )
        .bind(key)
        .bind(json)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    /// Remove a setting. Returns whether it existed.
    pub async fn delete_setting(&self, key: &str) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM settings WHERE key = ?")
            .bind(key)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Window {
        active: bool,
        ends: i64,
    }

    #[tokio::test]
    async fn test_roundtrip_and_overwrite() {
        let db = Database::in_memory().await.unwrap();
        assert!(db.get_setting::<Window>("w").await.unwrap().is_none());

        db.set_setting("w", &Window { active: true, ends: 5 }).await.unwrap();
        db.set_setting("w", &Window { active: false, ends: 6 }).await.unwrap();
        assert_eq!(
            db.get_setting::<Window>("w").await.unwrap(),
            Some(Window { active: false, ends: 6 })
        );

        // wrong shape surfaces as a serialization error
        assert!(db.get_setting::<Vec<u8>>("w").await.is_err());
        assert!(db.delete_setting("w").await.unwrap());
    }
}
