//! Quote queries.

use canary_common::UserId;
use chrono::Utc;
use tracing::debug;

use crate::connection::Database;
use crate::error::DbResult;
use crate::models::Quote;

const SELECT_QUOTES: &str = "SELECT id, user_id, name, quote, created_at FROM quotes";

impl Database {
    /// Store a quote attributed to `user_id` and return its id.
    pub async fn add_quote(&self, user_id: UserId, name: &str, quote: &str) -> DbResult<i64> {
        let result = sqlx::query(
            "INSERT INTO quotes (user_id, name, quote, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(user_id.as_i64())
        .bind(name)
        .bind(quote)
        .bind(Utc::now())
        .execute(self.pool())
        .await?;

        let id = result.last_insert_rowid();
        debug!(quote_id = id, user_id = %user_id, "Saved quote");
        Ok(id)
    }

    /// Look up one quote.
    pub async fn quote(&self, id: i64) -> DbResult<Option<Quote>> {
        let quote = sqlx::query_as::<_, Quote>(&format!("{SELECT_QUOTES} WHERE id = ?"))
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(quote)
    }

    /// Quotes in insertion order, optionally filtered by member and by a
    /// case-insensitive substring of the quote text.
    ///
    /// The text filter runs here rather than in SQL: SQLite's `LOWER()`
    /// only folds ASCII letters.
    pub async fn quotes(&self, user_id: Option<UserId>, query: Option<&str>) -> DbResult<Vec<Quote>> {
        let mut quotes = sqlx::query_as::<_, Quote>(&format!(
            "{SELECT_QUOTES} WHERE (?1 IS NULL OR user_id = ?1) ORDER BY id"
        ))
        .bind(user_id.map(UserId::as_i64))
        .fetch_all(self.pool())
        .await?;

        if let Some(query) = query.map(str::to_lowercase) {
            quotes.retain(|q| q.quote.to_lowercase().contains(&query));
        }
        Ok(quotes)
    }

    /// A random quote among those [`Database::quotes`] would return.
    pub async fn random_quote(
        &self,
        user_id: Option<UserId>,
        query: Option<&str>,
    ) -> DbResult<Option<Quote>> {
        let candidates = self.quotes(user_id, query).await?;
        debug!(candidates = candidates.len(), "Picking a random quote");
        Ok(fastrand::choice(candidates))
    }

    /// Delete a quote. Returns whether it existed.
    pub async fn delete_quote(&self, id: i64) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM quotes WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
