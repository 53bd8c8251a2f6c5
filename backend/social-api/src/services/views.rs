/// Read views with referenced users and comments embedded
///
/// Every view is assembled from stored entities plus one batched summary
/// lookup for all user ids they reference.
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use uuid::Uuid;

use crate::db::{CommentRepository, UserRepository};
use crate::error::{AppError, Result};
use crate::models::{Comment, CommentView, Post, PostView, User, UserSummary, UserView};

type Summaries = HashMap<Uuid, UserSummary>;

#[derive(Clone)]
pub struct ViewAssembler {
    users: Arc<dyn UserRepository>,
    comments: Arc<dyn CommentRepository>,
}

impl ViewAssembler {
    pub fn new(users: Arc<dyn UserRepository>, comments: Arc<dyn CommentRepository>) -> Self {
        Self { users, comments }
    }

    async fn summaries(&self, ids: HashSet<Uuid>) -> Result<Summaries> {
        let ids: Vec<Uuid> = ids.into_iter().collect();
        let found = self.users.find_user_summaries(&ids).await?;
        Ok(found.into_iter().map(|s| (s.id, s)).collect())
    }

    pub async fn user(&self, user: User) -> Result<UserView> {
        let ids = user
            .followers
            .iter()
            .chain(user.following.iter())
            .copied()
            .collect();
        let summaries = self.summaries(ids).await?;

        Ok(UserView {
            followers: resolve(&summaries, &user.followers),
            following: resolve(&summaries, &user.following),
            id: user.id,
            username: user.username,
            email: user.email,
            full_name: user.full_name,
            bio: user.bio,
            profile_picture: user.profile_picture,
            created_at: user.created_at,
            updated_at: user.updated_at,
        })
    }

    /// Keeps the order of `comments`
    pub async fn comments(&self, comments: Vec<Comment>) -> Result<Vec<CommentView>> {
        let summaries = self.summaries(comment_user_ids(&comments)).await?;
        Ok(comments
            .into_iter()
            .map(|c| comment_view(&summaries, c))
            .collect())
    }

    /// Keeps the order of `posts`; each post's comments come oldest first
    pub async fn posts(&self, posts: Vec<Post>) -> Result<Vec<PostView>> {
        let mut comments_by_post = HashMap::with_capacity(posts.len());
        for post in &posts {
            let comments = self.comments.list_comments_by_post(post.id).await?;
            let by_id: HashMap<Uuid, Comment> =
                comments.into_iter().map(|c| (c.id, c)).collect();
            comments_by_post.insert(post.id, by_id);
        }

        let mut ids: HashSet<Uuid> = HashSet::new();
        for post in &posts {
            ids.insert(post.user_id);
            ids.extend(post.likes.iter().copied());
        }
        for comments in comments_by_post.values() {
            for comment in comments.values() {
                ids.insert(comment.user_id);
                ids.extend(comment.likes.iter().copied());
            }
        }
        let summaries = self.summaries(ids).await?;

        Ok(posts
            .into_iter()
            .map(|post| {
                let mut stored = comments_by_post.remove(&post.id).unwrap_or_default();
                // A comment created after the post row was read is left out
                let comments = post
                    .comments
                    .iter()
                    .filter_map(|id| stored.remove(id))
                    .map(|c| comment_view(&summaries, c))
                    .collect();

                PostView {
                    user: summaries.get(&post.user_id).cloned(),
                    likes: resolve(&summaries, &post.likes),
                    comments,
                    id: post.id,
                    text: post.text,
                    image: post.image,
                    created_at: post.created_at,
                    updated_at: post.updated_at,
                }
            })
            .collect())
    }

    pub async fn post(&self, post: Post) -> Result<PostView> {
        self.posts(vec![post])
            .await?
            .pop()
            .ok_or_else(|| AppError::Internal("post view missing".into()))
    }
}

/// Summaries for `ids` in order, skipping users that no longer exist
fn resolve(summaries: &Summaries, ids: &[Uuid]) -> Vec<UserSummary> {
    ids.iter().filter_map(|id| summaries.get(id).cloned()).collect()
}

fn comment_user_ids(comments: &[Comment]) -> HashSet<Uuid> {
    comments
        .iter()
        .flat_map(|c| std::iter::once(c.user_id).chain(c.likes.iter().copied()))
        .collect()
}

fn comment_view(summaries: &Summaries, comment: Comment) -> CommentView {
    CommentView {
        user: summaries.get(&comment.user_id).cloned(),
        likes: resolve(summaries, &comment.likes),
        id: comment.id,
        post_id: comment.post_id,
        text: comment.text,
        created_at: comment.created_at,
        updated_at: comment.updated_at,
    }
}
