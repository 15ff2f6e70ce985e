//! Banner contest submissions.

use canary_common::UserId;
use tracing::{debug, info};

use crate::connection::Database;
use crate::error::DbResult;
use crate::models::BannerSubmission;

const SELECT_SUBMISSIONS: &str =
    "SELECT user_id, image_url, message_id, submitted_at FROM banner_submissions";

impl Database {
    /// Store a submission, replacing the user's previous one.
    pub async fn upsert_banner_submission(&self, submission: &BannerSubmission) -> DbResult<()> {
        sqlx::query(
            r"
            INSERT INTO banner_submissions (user_id, image_url, message_id, submitted_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                image_url = excluded.image_url,
                message_id = excluded.message_id,
                submitted_at = excluded.submitted_at
            ",
        )
        .bind(submission.user_id.as_i64())
        .bind(&submission.image_url)
        .bind(submission.message_id.as_i64())
        .bind(submission.submitted_at)
        .execute(self.pool())
        .await?;

        debug!(user_id = %submission.user_id, message_id = %submission.message_id, "Saved banner submission");
        Ok(())
    }

    /// A user's current submission.
    pub async fn banner_submission(&self, user_id: UserId) -> DbResult<Option<BannerSubmission>> {
        let submission = sqlx::query_as::<_, BannerSubmission>(&format!(
            "{SELECT_SUBMISSIONS} WHERE user_id = ?"
        ))
        .bind(user_id.as_i64())
        .fetch_optional(self.pool())
        .await?;
        Ok(submission)
    }

    /// Every submission, oldest first.
    pub async fn banner_submissions(&self) -> DbResult<Vec<BannerSubmission>> {
        let submissions = sqlx::query_as::<_, BannerSubmission>(&format!(
            "{SELECT_SUBMISSIONS} ORDER BY submitted_at, user_id"
        ))
        .fetch_all(self.pool())
        .await?;
        Ok(submissions)
    }

    /// Remove every submission. Returns how many were removed.
    pub async fn clear_banner_submissions(&self) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM banner_submissions")
            .execute(self.pool())
            .await?;
        info!(removed = result.rows_affected(), "Cleared banner submissions");
        Ok(result.rows_affected())
    }
}
