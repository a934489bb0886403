//! Comment moderation: bulk approval and the moderation queue.

use cinelog_common::AppResult;
use cinelog_db::repositories::{CommentFilter, CommentRepository};

use super::comment::{CommentService, CommentWithAuthor};

/// Moderation service for comment visibility.
#[derive(Clone)]
pub struct ModerationService {
    comment_repo: CommentRepository,
    comment_service: CommentService,
}

/// Confirmation shown to a moderator after a bulk action.
#[must_use]
pub fn approval_message(count: u64, approved: bool) -> String {
    let noun = if count == 1 { "comment" } else { "comments" };
    let state = if approved { "approved" } else { "unapproved" };
    format!("{count} {noun} marked as {state}.")
}

impl ModerationService {
    /// Create a new moderation service.
    #[must_use]
    pub const fn new(comment_repo: CommentRepository, comment_service: CommentService) -> Self {
        Self {
            comment_repo,
            comment_service,
        }
    }

    /// Make exactly the selected comments publicly visible.
    pub async fn approve(&self, ids: &[String]) -> AppResult<u64> {
        let count = self.comment_repo.set_approved(ids, true).await?;
        tracing::info!(selected = ids.len(), updated = count, "Approved comments");
        Ok(count)
    }

    /// Hide exactly the selected comments.
    pub async fn reject(&self, ids: &[String]) -> AppResult<u64> {
        let count = self.comment_repo.set_approved(ids, false).await?;
        tracing::info!(selected = ids.len(), updated = count, "Rejected comments");
        Ok(count)
    }

    /// Comments matching the moderation filters, newest first.
    pub async fn list(&self, filter: &CommentFilter) -> AppResult<Vec<CommentWithAuthor>> {
        let comments = self.comment_repo.search(filter).await?;
        self.comment_service.with_authors(comments).await
    }
}
