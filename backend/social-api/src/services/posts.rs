/// Post lifecycle and post likes
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use super::{discard_upload, release_replaced, upload_image};
use crate::db::{LikeOutcome, PostRepository};
use crate::error::{AppError, Result};
use crate::media::{release_image, ImageRelease, ImageStore};
use crate::models::{NewPost, Post, PostChanges, PostUpdate};
use crate::validators::normalize_post_text;

const POST_NOT_FOUND: &str = "Post not found";

/// What a successful delete removed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostDeletion {
    pub comments_removed: u64,
    /// `None` when the post had no image
    pub image: Option<ImageRelease>,
}

#[derive(Clone)]
pub struct PostStore {
    posts: Arc<dyn PostRepository>,
    images: Arc<dyn ImageStore>,
}

impl PostStore {
    pub fn new(posts: Arc<dyn PostRepository>, images: Arc<dyn ImageStore>) -> Self {
        Self { posts, images }
    }

    /// Load a post the actor owns
    async fn require_owned(&self, post_id: Uuid, actor_id: Uuid, action: &str) -> Result<Post> {
        let post = self.get_by_id(post_id).await?;
        if post.user_id != actor_id {
            return Err(AppError::Forbidden(format!(
                "Not authorized to {} this post",
                action
            )));
        }
        Ok(post)
    }

    /// Text is validated before the image is uploaded; a failed upload
    /// persists nothing.
    pub async fn create(&self, owner_id: Uuid, text: &str, image: Option<&str>) -> Result<Post> {
        let text = normalize_post_text(text)?;
        let image = upload_image(self.images.as_ref(), image).await?;

        let post = match self
            .posts
            .insert_post(NewPost {
                user_id: owner_id,
                text,
                image: image.clone(),
            })
            .await
        {
            Ok(post) => post,
            Err(e) => {
                discard_upload(self.images.as_ref(), image.as_deref()).await;
                return Err(e);
            }
        };

        info!(post_id = %post.id, user_id = %owner_id, has_image = post.image.is_some(), "post created");
        Ok(post)
    }

    pub async fn get_by_id(&self, post_id: Uuid) -> Result<Post> {
        self.posts
            .find_post(post_id)
            .await?
            .ok_or_else(|| AppError::NotFound(POST_NOT_FOUND.into()))
    }

    /// Newest first
    pub async fn list_all(&self) -> Result<Vec<Post>> {
        let posts = self.posts.list_posts().await?;
        debug!(count = posts.len(), "listed posts");
        Ok(posts)
    }

    /// Newest first
    pub async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Post>> {
        self.posts.list_posts_by_user(user_id).await
    }

    /// Owner-only partial update. A replacement image is uploaded first; the
    /// image the write actually replaced is released once it succeeds.
    pub async fn update(&self, post_id: Uuid, actor_id: Uuid, update: PostUpdate) -> Result<Post> {
        self.require_owned(post_id, actor_id, "update").await?;

        let text = update.text.as_deref().map(normalize_post_text).transpose()?;
        let uploaded = upload_image(self.images.as_ref(), update.image.as_deref()).await?;

        let changes = PostChanges {
            text,
            image: uploaded.clone(),
        };
        let revision = match self.posts.update_post(post_id, changes).await {
            Ok(Some(revision)) => revision,
            Ok(None) => {
                discard_upload(self.images.as_ref(), uploaded.as_deref()).await;
                return Err(AppError::NotFound(POST_NOT_FOUND.into()));
            }
            Err(e) => {
                discard_upload(self.images.as_ref(), uploaded.as_deref()).await;
                return Err(e);
            }
        };

        release_replaced(
            self.images.as_ref(),
            revision.previous_image.as_deref(),
            uploaded.as_deref(),
        )
        .await;

        info!(%post_id, "post updated");
        Ok(revision.current)
    }

    /// Owner-only. Removes the post with all its comments, then releases
    /// the image.
    pub async fn delete(&self, post_id: Uuid, actor_id: Uuid) -> Result<PostDeletion> {
        self.require_owned(post_id, actor_id, "delete").await?;

        let removed = self
            .posts
            .delete_post(post_id)
            .await?
            .ok_or_else(|| AppError::NotFound(POST_NOT_FOUND.into()))?;
        let comments_removed = removed.comments_removed;

        let image = match removed.image.as_deref() {
            Some(url) => Some(release_image(self.images.as_ref(), url).await),
            None => None,
        };

        info!(%post_id, comments_removed, "post deleted");
        Ok(PostDeletion {
            comments_removed,
            image,
        })
    }

    /// Returns the resulting like-er set
    pub async fn like(&self, post_id: Uuid, actor_id: Uuid) -> Result<Vec<Uuid>> {
        match self.posts.add_post_like(post_id, actor_id).await? {
            LikeOutcome::Changed(likes) => {
                debug!(%post_id, user_id = %actor_id, "post liked");
                Ok(likes)
            }
            LikeOutcome::Unchanged => Err(AppError::Conflict("Already liked this post".into())),
            LikeOutcome::Missing => Err(AppError::NotFound(POST_NOT_FOUND.into())),
        }
    }

    pub async fn unlike(&self, post_id: Uuid, actor_id: Uuid) -> Result<Vec<Uuid>> {
        match self.posts.remove_post_like(post_id, actor_id).await? {
            LikeOutcome::Changed(likes) => {
                debug!(%post_id, user_id = %actor_id, "post unliked");
                Ok(likes)
            }
            LikeOutcome::Unchanged => Err(AppError::Conflict("Post not liked".into())),
            LikeOutcome::Missing => Err(AppError::NotFound(POST_NOT_FOUND.into())),
        }
    }
}
