//! Member names and scored reactions.

use canary_common::UserId;
use tracing::debug;

use crate::connection::Database;
use crate::error::DbResult;
use crate::models::{RankingEntry, ReactionRecord, Score};

impl Database {
    /// Insert a member or refresh their display name.
    pub async fn upsert_member(&self, user_id: UserId, name: &str) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO members (id, name) VALUES (?, ?) ON CONFLICT(id) DO UPDATE SET name = excluded.name",
        )
        .bind(user_id.as_i64())
        .bind(name)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    /// A member's last known display name.
    pub async fn member_name(&self, user_id: UserId) -> DbResult<Option<String>> {
        let name = sqlx::query_scalar("SELECT name FROM members WHERE id = ?")
            .bind(user_id.as_i64())
            .fetch_optional(self.pool())
            .await?;
        Ok(name)
    }

    /// Record a reaction. Returns false when it was already recorded.
    pub async fn add_reaction(&self, record: &ReactionRecord) -> DbResult<bool> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO reactions (reacter_id, reactee_id, reaction_name, message_id) VALUES (?, ?, ?, ?)",
        )
        .bind(record.reacter_id.as_i64())
        .bind(record.reactee_id.as_i64())
        .bind(&record.reaction_name)
        .bind(record.message_id.as_i64())
        .execute(self.pool())
        .await?;

        debug!(
            reacter = %record.reacter_id,
            reactee = %record.reactee_id,
            reaction = %record.reaction_name,
            "Recorded reaction"
        );
        Ok(result.rows_affected() > 0)
    }

    /// Forget a reaction. Returns whether it was recorded.
    pub async fn remove_reaction(&self, record: &ReactionRecord) -> DbResult<bool> {
        let result = sqlx::query(
            "DELETE FROM reactions WHERE reacter_id = ? AND reactee_id = ? AND reaction_name = ? AND message_id = ?",
        )
        .bind(record.reacter_id.as_i64())
        .bind(record.reactee_id.as_i64())
        .bind(&record.reaction_name)
        .bind(record.message_id.as_i64())
        .execute(self.pool())
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Votes received by one member.
    pub async fn score(&self, user_id: UserId, upvote: &str, downvote: &str) -> DbResult<Score> {
        let (upvotes, downvotes): (i64, i64) = sqlx::query_as(
            r"
            SELECT
                COALESCE(SUM(CASE WHEN reaction_name = ? THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN reaction_name = ? THEN 1 ELSE 0 END), 0)
            FROM reactions
            WHERE reactee_id = ?
            ",
        )
        .bind(upvote)
        .bind(downvote)
        .bind(user_id.as_i64())
        .fetch_one(self.pool())
        .await?;
        Ok(Score { upvotes, downvotes })
    }

    /// Every member with at least one vote, best net score first and lowest
    /// id first among ties.
    pub async fn ranking(&self, upvote: &str, downvote: &str) -> DbResult<Vec<RankingEntry>> {
        let ranking = sqlx::query_as::<_, RankingEntry>(
            r"
            SELECT user_id, name, upvotes, downvotes FROM (
                SELECT
                    m.id AS user_id,
                    m.name AS name,
                    COALESCE(SUM(CASE WHEN r.reaction_name = ? THEN 1 ELSE 0 END), 0) AS upvotes,
                    COALESCE(SUM(CASE WHEN r.reaction_name = ? THEN 1 ELSE 0 END), 0) AS downvotes
                FROM members m
                JOIN reactions r ON r.reactee_id = m.id
                GROUP BY m.id, m.name
            )
            WHERE upvotes > 0 OR downvotes > 0
            ORDER BY upvotes - downvotes DESC, user_id ASC
            ",
        )
        .bind(upvote)
        .bind(downvote)
        .fetch_all(self.pool())
        .await?;
        Ok(ranking)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canary_common::MessageId;

    fn vote(reacter: u64, reactee: u64, name: &str, message: u64) -> ReactionRecord {
        ReactionRecord {
            reacter_id: UserId(reacter),
            reactee_id: UserId(reactee),
            reaction_name: name.to_string(),
            message_id: MessageId(message),
        }
    }

    #[tokio::test]
    async fn test_duplicate_votes_count_once() {
        let db = Database::in_memory().await.unwrap();
        assert!(db.add_reaction(&vote(1, 2, "upvote", 9)).await.unwrap());
        assert!(!db.add_reaction(&vote(1, 2, "upvote", 9)).await.unwrap());
        assert!(db.add_reaction(&vote(1, 2, "downvote", 9)).await.unwrap());
        db.add_reaction(&vote(1, 2, "heart", 9)).await.unwrap();

        let score = db.score(UserId(2), "upvote", "downvote").await.unwrap();
        assert_eq!(score, Score { upvotes: 1, downvotes: 1 });

        assert!(db.remove_reaction(&vote(1, 2, "downvote", 9)).await.unwrap());
        assert_eq!(db.score(UserId(2), "upvote", "downvote").await.unwrap().net(), 1);
    }

    #[tokio::test]
    async fn test_ranking_order() {
        let db = Database::in_memory().await.unwrap();
        for (id, name) in [(20, "b"), (10, "a"), (30, "c"), (40, "untouched")] {
            db.upsert_member(UserId(id), name).await.unwrap();
        }
        // a and b tie on +2, c sits at -1
        for message in 0..2 {
            db.add_reaction(&vote(99, 10, "upvote", message)).await.unwrap();
            db.add_reaction(&vote(99, 20, "upvote", message)).await.unwrap();
        }
        db.add_reaction(&vote(99, 30, "downvote", 5)).await.unwrap();
        db.add_reaction(&vote(99, 40, "heart", 6)).await.unwrap();

        let ranking = db.ranking("upvote", "downvote").await.unwrap();
        let order: Vec<u64> = ranking.iter().map(|e| e.user_id.0).collect();
        assert_eq!(order, vec![10, 20, 30]);
        assert_eq!(ranking[2].score.net(), -1);

        db.upsert_member(UserId(10), "renamed").await.unwrap();
        assert_eq!(db.member_name(UserId(10)).await.unwrap().as_deref(), Some("renamed"));
    }
}
