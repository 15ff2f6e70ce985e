//! Custom reaction queries.

use chrono::Utc;
use tracing::{debug, info};

use crate::connection::Database;
use crate::error::DbResult;
use crate::models::{CustomReaction, NewCustomReaction};

const SELECT_REACTIONS: &str = "SELECT id, prompt, response, user_id, delete_prompt, anywhere, dm, proposal, created_at FROM custom_reactions";

impl Database {
    /// Store a reaction or proposal and return its id.
    pub async fn add_custom_reaction(&self, reaction: &NewCustomReaction) -> DbResult<i64> {
        let result = sqlx::query(
            r"
            INSERT INTO custom_reactions (
                prompt, response, user_id, delete_prompt, anywhere, dm, proposal, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ",
        )
        .bind(&reaction.prompt)
        .bind(&reaction.response)
        .bind(reaction.user_id.as_i64())
        .bind(reaction.delete_prompt)
        .bind(reaction.anywhere)
        .bind(reaction.dm)
        .bind(reaction.proposal)
        .bind(Utc::now())
        .execute(self.pool())
        .await?;

        let id = result.last_insert_rowid();
        info!(
            reaction_id = id,
            proposal = reaction.proposal,
            "Saved custom reaction"
        );
        Ok(id)
    }

    /// Look up one reaction or proposal.
    pub async fn custom_reaction(&self, id: i64) -> DbResult<Option<CustomReaction>> {
        let reaction =
            sqlx::query_as::<_, CustomReaction>(&format!("{SELECT_REACTIONS} WHERE id = ?"))
                .bind(id)
                .fetch_optional(self.pool())
                .await?;
        Ok(reaction)
    }

    /// Approved reactions (`proposals == false`) or pending proposals, by id.
    pub async fn custom_reactions(&self, proposals: bool) -> DbResult<Vec<CustomReaction>> {
        let reactions = sqlx::query_as::<_, CustomReaction>(&format!(
            "{SELECT_REACTIONS} WHERE proposal = ? ORDER BY id"
        ))
        .bind(proposals)
        .fetch_all(self.pool())
        .await?;
        Ok(reactions)
    }

    /// Overwrite the editable fields of a reaction. Returns whether it existed.
    pub async fn update_custom_reaction(&self, reaction: &CustomReaction) -> DbResult<bool> {
        let result = sqlx::query(
            r"
            UPDATE custom_reactions
            SET prompt = ?, response = ?, delete_prompt = ?, anywhere = ?, dm = ?
            WHERE id = ?
            ",
        )
        .bind(&reaction.prompt)
        .bind(&reaction.response)
        .bind(reaction.delete_prompt)
        .bind(reaction.anywhere)
        .bind(reaction.dm)
        .bind(reaction.id)
        .execute(self.pool())
        .await?;

        debug!(reaction_id = reaction.id, "Updated custom reaction");
        Ok(result.rows_affected() > 0)
    }

    /// Turn a proposal into an approved reaction. Returns whether a proposal
    /// with that id existed.
    pub async fn approve_custom_reaction(&self, id: i64) -> DbResult<bool> {
        let result =
            sqlx::query("UPDATE custom_reactions SET proposal = 0 WHERE id = ? AND proposal = 1")
                .bind(id)
                .execute(self.pool())
                .await?;
        let approved = result.rows_affected() > 0;
        if approved {
            info!(reaction_id = id, "Approved custom reaction proposal");
        }
        Ok(approved)
    }

    /// Delete a reaction or proposal. Returns whether it existed.
    pub async fn delete_custom_reaction(&self, id: i64) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM custom_reactions WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await?;
        let deleted = result.rows_affected() > 0;
        if deleted {
            info!(reaction_id = id, "Deleted custom reaction");
        }
        Ok(deleted)
    }
}
