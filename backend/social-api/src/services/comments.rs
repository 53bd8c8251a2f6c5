/// Comment lifecycle and comment likes
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::db::{CommentRepository, LikeOutcome};
use crate::error::{AppError, Result};
use crate::models::{Comment, NewComment};
use crate::validators::normalize_comment_text;

const COMMENT_NOT_FOUND: &str = "Comment not found";

#[derive(Clone)]
pub struct CommentStore {
    comments: Arc<dyn CommentRepository>,
}

impl CommentStore {
    pub fn new(comments: Arc<dyn CommentRepository>) -> Self {
        Self { comments }
    }

    async fn require_owned(
        &self,
        comment_id: Uuid,
        actor_id: Uuid,
        action: &str,
    ) -> Result<Comment> {
        let comment = self.get_by_id(comment_id).await?;
        if comment.user_id != actor_id {
            return Err(AppError::Forbidden(format!(
                "Not authorized to {} this comment",
                action
            )));
        }
        Ok(comment)
    }

    /// Any authenticated actor may comment on an existing post
    pub async fn create(&self, post_id: Uuid, actor_id: Uuid, text: &str) -> Result<Comment> {
        let text = normalize_comment_text(text)?;

        let comment = self
            .comments
            .insert_comment(NewComment {
                post_id,
                user_id: actor_id,
                text,
            })
            .await?
            .ok_or_else(|| AppError::NotFound("Post not found".into()))?;

        info!(comment_id = %comment.id, %post_id, user_id = %actor_id, "comment added");
        Ok(comment)
    }

    pub async fn get_by_id(&self, comment_id: Uuid) -> Result<Comment> {
        self.comments
            .find_comment(comment_id)
            .await?
            .ok_or_else(|| AppError::NotFound(COMMENT_NOT_FOUND.into()))
    }

    /// Newest first; an unknown post simply has no comments
    pub async fn list_by_post(&self, post_id: Uuid) -> Result<Vec<Comment>> {
        let comments = self.comments.list_comments_by_post(post_id).await?;
        debug!(%post_id, count = comments.len(), "listed comments");
        Ok(comments)
    }

    /// Owner-only. Without new text only the update timestamp moves.
    pub async fn update(
        &self,
        comment_id: Uuid,
        actor_id: Uuid,
        text: Option<&str>,
    ) -> Result<Comment> {
        self.require_owned(comment_id, actor_id, "update").await?;

        let text = text.map(normalize_comment_text).transpose()?;

        let updated = self
            .comments
            .update_comment_text(comment_id, text)
            .await?
            .ok_or_else(|| AppError::NotFound(COMMENT_NOT_FOUND.into()))?;

        info!(%comment_id, "comment updated");
        Ok(updated)
    }

    /// Owner-only. Detaches the comment from its post.
    pub async fn delete(&self, comment_id: Uuid, actor_id: Uuid) -> Result<()> {
        self.require_owned(comment_id, actor_id, "delete").await?;

        if !self.comments.delete_comment(comment_id).await? {
            return Err(AppError::NotFound(COMMENT_NOT_FOUND.into()));
        }

        info!(%comment_id, "comment deleted");
        Ok(())
    }

    pub async fn like(&self, comment_id: Uuid, actor_id: Uuid) -> Result<Vec<Uuid>> {
        match self.comments.add_comment_like(comment_id, actor_id).await? {
            LikeOutcome::Changed(likes) => Ok(likes),
            LikeOutcome::Unchanged => {
                Err(AppError::Conflict("Already liked this comment".into()))
            }
            LikeOutcome::Missing => Err(AppError::NotFound(COMMENT_NOT_FOUND.into())),
        }
    }

    pub async fn unlike(&self, comment_id: Uuid, actor_id: Uuid) -> Result<Vec<Uuid>> {
        match self.comments.remove_comment_like(comment_id, actor_id).await? {
            LikeOutcome::Changed(likes) => Ok(likes),
            LikeOutcome::Unchanged => Err(AppError::Conflict("Comment not liked".into())),
            LikeOutcome::Missing => Err(AppError::NotFound(COMMENT_NOT_FOUND.into())),
        }
    }
}
