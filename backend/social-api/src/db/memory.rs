use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    CommentRepository, EdgeChange, LikeOutcome, PostRepository, RemovedPost, Revision,
    UserRepository,
};
use crate::error::{AppError, Result};
use crate::models::{
    Comment, NewComment, NewPost, NewUser, Post, PostChanges, ProfileChanges, User, UserSummary,
};

/// In-process document store implementing all three repositories.
///
/// Used when no `DATABASE_URL` is configured and by the test suites. One
/// `RwLock` guards everything, so each trait method is a single atomic step.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    users: HashMap<Uuid, User>,
    /// Insertion order, oldest first
    user_order: Vec<Uuid>,
    posts: HashMap<Uuid, Post>,
    /// Insertion order, oldest first
    post_order: Vec<Uuid>,
    comments: HashMap<Uuid, Comment>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Add `user_id` to a like-er set unless present
fn add_like(likes: &mut Vec<Uuid>, user_id: Uuid) -> LikeOutcome {
    if likes.contains(&user_id) {
        return LikeOutcome::Unchanged;
    }
    likes.push(user_id);
    LikeOutcome::Changed(likes.clone())
}

fn remove_like(likes: &mut Vec<Uuid>, user_id: Uuid) -> LikeOutcome {
    let before = likes.len();
    likes.retain(|id| *id != user_id);
    if likes.len() == before {
        return LikeOutcome::Unchanged;
    }
    LikeOutcome::Changed(likes.clone())
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn insert_user(&self, new_user: NewUser) -> Result<User> {
        let mut state = self.state.write().await;

        if state.users.values().any(|u| u.username == new_user.username) {
            return Err(AppError::Conflict("username already taken".into()));
        }
        if state.users.values().any(|u| u.email == new_user.email) {
            return Err(AppError::Conflict("email already registered".into()));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            username: new_user.username,
            email: new_user.email,
            password_hash: new_user.password_hash,
            full_name: new_user.full_name,
            bio: String::new(),
            profile_picture: None,
            followers: Vec::new(),
            following: Vec::new(),
            created_at: now,
            updated_at: now,
        };

        state.user_order.push(user.id);
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user(&self, user_id: Uuid) -> Result<Option<User>> {
        Ok(self.state.read().await.users.get(&user_id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let state = self.state.read().await;
        Ok(state.users.values().find(|u| u.email == email).cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let state = self.state.read().await;
        Ok(state
            .user_order
            .iter()
            .filter_map(|id| state.users.get(id).cloned())
            .collect())
    }

    async fn search_users(&self, query: &str) -> Result<Vec<User>> {
        let needle = query.to_lowercase();
        let state = self.state.read().await;
        Ok(state
            .user_order
            .iter()
            .filter_map(|id| state.users.get(id))
            .filter(|u| {
                u.username.to_lowercase().contains(&needle)
                    || u.full_name.to_lowercase().contains(&needle)
                    || u.email.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect())
    }

    async fn find_user_summaries(&self, user_ids: &[Uuid]) -> Result<Vec<UserSummary>> {
        let state = self.state.read().await;
        Ok(user_ids
            .iter()
            .filter_map(|id| state.users.get(id))
            .map(|u| UserSummary {
                id: u.id,
                username: u.username.clone(),
                full_name: u.full_name.clone(),
                profile_picture: u.profile_picture.clone(),
            })
            .collect())
    }

    async fn update_profile(
        &self,
        user_id: Uuid,
        changes: ProfileChanges,
    ) -> Result<Option<Revision<User>>> {
        let mut state = self.state.write().await;
        let Some(user) = state.users.get_mut(&user_id) else {
            return Ok(None);
        };
        let previous_image = user.profile_picture.clone();

        if let Some(full_name) = changes.full_name {
            user.full_name = full_name;
        }
        if let Some(bio) = changes.bio {
            user.bio = bio;
        }
        if let Some(picture) = changes.profile_picture {
            user.profile_picture = Some(picture);
        }
        user.updated_at = Utc::now();

        Ok(Some(Revision {
            current: user.clone(),
            previous_image,
        }))
    }

    async fn add_follow(&self, follower_id: Uuid, followee_id: Uuid) -> Result<EdgeChange> {
        let mut state = self.state.write().await;
        if !state.users.contains_key(&follower_id) || !state.users.contains_key(&followee_id) {
            return Ok(EdgeChange::Missing);
        }

        let followee = state
            .users
            .get_mut(&followee_id)
            .ok_or_else(|| AppError::Internal("followee vanished under lock".into()))?;
        if followee.followers.contains(&follower_id) {
            return Ok(EdgeChange::Unchanged);
        }
        followee.followers.push(follower_id);

        let follower = state
            .users
            .get_mut(&follower_id)
            .ok_or_else(|| AppError::Internal("follower vanished under lock".into()))?;
        if !follower.following.contains(&followee_id) {
            follower.following.push(followee_id);
        }

        Ok(EdgeChange::Applied)
    }

    async fn remove_follow(&self, follower_id: Uuid, followee_id: Uuid) -> Result<EdgeChange> {
        let mut state = self.state.write().await;
        if !state.users.contains_key(&follower_id) || !state.users.contains_key(&followee_id) {
            return Ok(EdgeChange::Missing);
        }

        let mut removed = false;
        if let Some(followee) = state.users.get_mut(&followee_id) {
            let before = followee.followers.len();
            followee.followers.retain(|id| *id != follower_id);
            removed |= followee.followers.len() != before;
        }
        if let Some(follower) = state.users.get_mut(&follower_id) {
            let before = follower.following.len();
            follower.following.retain(|id| *id != followee_id);
            removed |= follower.following.len() != before;
        }

        Ok(if removed {
            EdgeChange::Applied
        } else {
            EdgeChange::Unchanged
        })
    }
}

#[async_trait]
impl PostRepository for MemoryStore {
    async fn insert_post(&self, new_post: NewPost) -> Result<Post> {
        let now = Utc::now();
        let post = Post {
            id: Uuid::new_v4(),
            user_id: new_post.user_id,
            text: new_post.text,
            image: new_post.image,
            likes: Vec::new(),
            comments: Vec::new(),
            created_at: now,
            updated_at: now,
        };

        let mut state = self.state.write().await;
        state.post_order.push(post.id);
        state.posts.insert(post.id, post.clone());
        Ok(post)
    }

    async fn find_post(&self, post_id: Uuid) -> Result<Option<Post>> {
        Ok(self.state.read().await.posts.get(&post_id).cloned())
    }

    async fn list_posts(&self) -> Result<Vec<Post>> {
        let state = self.state.read().await;
        Ok(state
            .post_order
            .iter()
            .rev()
            .filter_map(|id| state.posts.get(id).cloned())
            .collect())
    }

    async fn list_posts_by_user(&self, user_id: Uuid) -> Result<Vec<Post>> {
        let state = self.state.read().await;
        Ok(state
            .post_order
            .iter()
            .rev()
            .filter_map(|id| state.posts.get(id))
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn update_post(
        &self,
        post_id: Uuid,
        changes: PostChanges,
    ) -> Result<Option<Revision<Post>>> {
        let mut state = self.state.write().await;
        let Some(post) = state.posts.get_mut(&post_id) else {
            return Ok(None);
        };
        let previous_image = post.image.clone();

        if let Some(text) = changes.text {
            post.text = text;
        }
        if let Some(image) = changes.image {
            post.image = Some(image);
        }
        post.updated_at = Utc::now();

        Ok(Some(Revision {
            current: post.clone(),
            previous_image,
        }))
    }

    async fn delete_post(&self, post_id: Uuid) -> Result<Option<RemovedPost>> {
        let mut state = self.state.write().await;
        let Some(post) = state.posts.remove(&post_id) else {
            return Ok(None);
        };
        state.post_order.retain(|id| *id != post_id);

        // Sweep by parent id rather than the post's list so nothing can dangle
        let before = state.comments.len();
        state.comments.retain(|_, c| c.post_id != post_id);
        Ok(Some(RemovedPost {
            comments_removed: (before - state.comments.len()) as u64,
            image: post.image,
        }))
    }

    async fn add_post_like(&self, post_id: Uuid, user_id: Uuid) -> Result<LikeOutcome> {
        let mut state = self.state.write().await;
        Ok(match state.posts.get_mut(&post_id) {
            Some(post) => add_like(&mut post.likes, user_id),
            None => LikeOutcome::Missing,
        })
    }

    async fn remove_post_like(&self, post_id: Uuid, user_id: Uuid) -> Result<LikeOutcome> {
        let mut state = self.state.write().await;
        Ok(match state.posts.get_mut(&post_id) {
            Some(post) => remove_like(&mut post.likes, user_id),
            None => LikeOutcome::Missing,
        })
    }
}

#[async_trait]
impl CommentRepository for MemoryStore {
    async fn insert_comment(&self, new_comment: NewComment) -> Result<Option<Comment>> {
        let mut state = self.state.write().await;
        let Some(post) = state.posts.get_mut(&new_comment.post_id) else {
            return Ok(None);
        };

        let now = Utc::now();
        let comment = Comment {
            id: Uuid::new_v4(),
            post_id: new_comment.post_id,
            user_id: new_comment.user_id,
            text: new_comment.text,
            likes: Vec::new(),
            created_at: now,
            updated_at: now,
        };

        post.comments.push(comment.id);
        state.comments.insert(comment.id, comment.clone());
        Ok(Some(comment))
    }

    async fn find_comment(&self, comment_id: Uuid) -> Result<Option<Comment>> {
        Ok(self.state.read().await.comments.get(&comment_id).cloned())
    }

    async fn list_comments_by_post(&self, post_id: Uuid) -> Result<Vec<Comment>> {
        let state = self.state.read().await;
        let Some(post) = state.posts.get(&post_id) else {
            return Ok(Vec::new());
        };

        Ok(post
            .comments
            .iter()
            .rev()
            .filter_map(|id| state.comments.get(id).cloned())
            .collect())
    }

    async fn update_comment_text(
        &self,
        comment_id: Uuid,
        text: Option<String>,
    ) -> Result<Option<Comment>> {
        let mut state = self.state.write().await;
        let Some(comment) = state.comments.get_mut(&comment_id) else {
            return Ok(None);
        };

        if let Some(text) = text {
            comment.text = text;
        }
        comment.updated_at = Utc::now();
        Ok(Some(comment.clone()))
    }

    async fn delete_comment(&self, comment_id: Uuid) -> Result<bool> {
        let mut state = self.state.write().await;
        let Some(comment) = state.comments.remove(&comment_id) else {
            return Ok(false);
        };

        if let Some(post) = state.posts.get_mut(&comment.post_id) {
            post.comments.retain(|id| *id != comment_id);
        }
        Ok(true)
    }

    async fn add_comment_like(&self, comment_id: Uuid, user_id: Uuid) -> Result<LikeOutcome> {
        let mut state = self.state.write().await;
        Ok(match state.comments.get_mut(&comment_id) {
            Some(comment) => add_like(&mut comment.likes, user_id),
            None => LikeOutcome::Missing,
        })
    }

    async fn remove_comment_like(&self, comment_id: Uuid, user_id: Uuid) -> Result<LikeOutcome> {
        let mut state = self.state.write().await;
        Ok(match state.comments.get_mut(&comment_id) {
            Some(comment) => remove_like(&mut comment.likes, user_id),
            None => LikeOutcome::Missing,
        })
    }
}
