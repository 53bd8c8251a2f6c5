/// Persistence layer
///
/// Three repository traits, one per aggregate, each with a PostgreSQL
/// implementation (`user_repo`, `post_repo`, `comment_repo`) and an
/// in-process one (`memory`). Every method that reads-modifies-writes is
/// atomic: the PostgreSQL versions run in a transaction holding row locks,
/// the in-memory store holds its write lock for the whole operation.
pub mod comment_repo;
pub mod memory;
pub mod post_repo;
pub mod user_repo;

pub use comment_repo::PgCommentRepository;
pub use memory::MemoryStore;
pub use post_repo::PgPostRepository;
pub use user_repo::PgUserRepository;

use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{
    Comment, NewComment, NewPost, NewUser, Post, PostChanges, ProfileChanges, User, UserSummary,
};

/// Result of adding or removing a follow edge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeChange {
    Applied,
    /// Edge already present (add) or already absent (remove)
    Unchanged,
    /// One of the two users does not exist
    Missing,
}

/// Result of adding or removing a like
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LikeOutcome {
    /// The resulting like-er set
    Changed(Vec<Uuid>),
    /// Already liked (add) or not liked (remove)
    Unchanged,
    /// Target post/comment does not exist
    Missing,
}

/// An updated entity together with the image it carried just before the
/// write. Both are read under the same lock, so concurrent updates each see
/// the image they actually replaced.
#[derive(Debug, Clone, PartialEq)]
pub struct Revision<T> {
    pub current: T,
    pub previous_image: Option<String>,
}

/// What `delete_post` removed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovedPost {
    pub comments_removed: u64,
    /// The post's image at the moment of deletion
    pub image: Option<String>,
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fails with `Conflict` on duplicate username or email
    async fn insert_user(&self, new_user: NewUser) -> Result<User>;

    async fn find_user(&self, user_id: Uuid) -> Result<Option<User>>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;

    /// All users, oldest account first
    async fn list_users(&self) -> Result<Vec<User>>;

    /// Case-insensitive literal substring match on username, full name, email
    async fn search_users(&self, query: &str) -> Result<Vec<User>>;

    /// Summaries for the given ids, in no particular order; unknown ids are skipped
    async fn find_user_summaries(&self, user_ids: &[Uuid]) -> Result<Vec<UserSummary>>;

    /// `None` when the user does not exist. `previous_image` is the profile
    /// picture before this write.
    async fn update_profile(
        &self,
        user_id: Uuid,
        changes: ProfileChanges,
    ) -> Result<Option<Revision<User>>>;

    /// Add `follower_id` to followee's followers and followee to follower's following
    async fn add_follow(&self, follower_id: Uuid, followee_id: Uuid) -> Result<EdgeChange>;

    async fn remove_follow(&self, follower_id: Uuid, followee_id: Uuid) -> Result<EdgeChange>;
}

#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn insert_post(&self, new_post: NewPost) -> Result<Post>;

    async fn find_post(&self, post_id: Uuid) -> Result<Option<Post>>;

    /// Newest first
    async fn list_posts(&self) -> Result<Vec<Post>>;

    /// Newest first
    async fn list_posts_by_user(&self, user_id: Uuid) -> Result<Vec<Post>>;

    /// `None` when the post does not exist
    async fn update_post(
        &self,
        post_id: Uuid,
        changes: PostChanges,
    ) -> Result<Option<Revision<Post>>>;

    /// Deletes the post and every comment on it; `None` when the post does
    /// not exist
    async fn delete_post(&self, post_id: Uuid) -> Result<Option<RemovedPost>>;

    async fn add_post_like(&self, post_id: Uuid, user_id: Uuid) -> Result<LikeOutcome>;

    async fn remove_post_like(&self, post_id: Uuid, user_id: Uuid) -> Result<LikeOutcome>;
}

#[async_trait]
pub trait CommentRepository: Send + Sync {
    /// Stores the comment and appends it to the parent post's comment list.
    /// `None` when the parent post does not exist.
    async fn insert_comment(&self, new_comment: NewComment) -> Result<Option<Comment>>;

    async fn find_comment(&self, comment_id: Uuid) -> Result<Option<Comment>>;

    /// Newest first
    async fn list_comments_by_post(&self, post_id: Uuid) -> Result<Vec<Comment>>;

    /// Replaces the text when given; always moves `updated_at`
    async fn update_comment_text(
        &self,
        comment_id: Uuid,
        text: Option<String>,
    ) -> Result<Option<Comment>>;

    /// Removes the comment and detaches it from its post; `false` if absent
    async fn delete_comment(&self, comment_id: Uuid) -> Result<bool>;

    async fn add_comment_like(&self, comment_id: Uuid, user_id: Uuid) -> Result<LikeOutcome>;

    async fn remove_comment_like(&self, comment_id: Uuid, user_id: Uuid) -> Result<LikeOutcome>;
}

/// The repository set a service graph is built from
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub posts: Arc<dyn PostRepository>,
    pub comments: Arc<dyn CommentRepository>,
}

impl Repositories {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            users: Arc::new(PgUserRepository::new(pool.clone())),
            posts: Arc::new(PgPostRepository::new(pool.clone())),
            comments: Arc::new(PgCommentRepository::new(pool)),
        }
    }

    /// All three traits served by one shared [`MemoryStore`]
    pub fn in_memory() -> Self {
        let store = Arc::new(MemoryStore::new());
        Self {
            users: store.clone(),
            posts: store.clone(),
            comments: store,
        }
    }
}
