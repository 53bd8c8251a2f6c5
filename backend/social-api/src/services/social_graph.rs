use std::sync::Arc;
use uuid::Uuid;

use super::{CommentStore, PostDeletion, PostStore, UserDirectory, ViewAssembler};
use crate::auth::Authenticator;
use crate::db::Repositories;
use crate::error::Result;
use crate::media::ImageStore;
use crate::models::{
    AuthSession, Comment, CommentView, Post, PostUpdate, PostView, ProfileUpdate, UserProfile,
    UserView,
};

/// The service graph handlers talk to
///
/// Built once at start-up from a [`Repositories`] set, an image host and an
/// authenticator, then shared through `web::Data`. Holds nothing but its
/// collaborators.
#[derive(Clone)]
pub struct SocialGraphService {
    users: UserDirectory,
    posts: PostStore,
    comments: CommentStore,
    views: ViewAssembler,
    auth: Arc<dyn Authenticator>,
}

impl SocialGraphService {
    pub fn new(
        repos: Repositories,
        images: Arc<dyn ImageStore>,
        auth: Arc<dyn Authenticator>,
    ) -> Self {
        Self {
            views: ViewAssembler::new(repos.users.clone(), repos.comments.clone()),
            users: UserDirectory::new(repos.users, images.clone()),
            posts: PostStore::new(repos.posts, images),
            comments: CommentStore::new(repos.comments),
            auth,
        }
    }

    pub fn users(&self) -> &UserDirectory {
        &self.users
    }

    pub fn posts(&self) -> &PostStore {
        &self.posts
    }

    pub fn comments(&self) -> &CommentStore {
        &self.comments
    }

    // ---------------------------------------------------------------------
    // Authentication
    // ---------------------------------------------------------------------

    /// Resolve a bearer credential to the acting user
    pub fn authenticate(&self, credential: &str) -> Result<Uuid> {
        self.auth.verify(credential)
    }

    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
        full_name: Option<&str>,
    ) -> Result<AuthSession> {
        let user = self
            .users
            .register(username, email, password, full_name)
            .await?;
        let token = self.auth.issue(&user)?;
        Ok(AuthSession {
            token,
            user: user.into(),
        })
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthSession> {
        let user = self.users.login(email, password).await?;
        let token = self.auth.issue(&user)?;
        Ok(AuthSession {
            token,
            user: user.into(),
        })
    }

    pub async fn me(&self, actor_id: Uuid) -> Result<UserProfile> {
        self.users.get_by_id(actor_id).await
    }

    // ---------------------------------------------------------------------
    // Users
    // ---------------------------------------------------------------------

    pub async fn get_user(&self, user_id: Uuid) -> Result<UserProfile> {
        self.users.get_by_id(user_id).await
    }

    /// Follower and following profiles embedded
    pub async fn get_user_view(&self, user_id: Uuid) -> Result<UserView> {
        let user = self.users.get_user(user_id).await?;
        self.views.user(user).await
    }

    pub async fn list_users(&self) -> Result<Vec<UserProfile>> {
        self.users.list().await
    }

    pub async fn search_users(&self, query: Option<&str>) -> Result<Vec<UserProfile>> {
        self.users.search(query).await
    }

    pub async fn update_profile(
        &self,
        actor_id: Uuid,
        update: ProfileUpdate,
    ) -> Result<UserProfile> {
        self.users.update_profile(actor_id, update).await
    }

    pub async fn follow(&self, actor_id: Uuid, target_id: Uuid) -> Result<()> {
        self.users.follow(actor_id, target_id).await
    }

    pub async fn unfollow(&self, actor_id: Uuid, target_id: Uuid) -> Result<()> {
        self.users.unfollow(actor_id, target_id).await
    }

    // ---------------------------------------------------------------------
    // Posts
    // ---------------------------------------------------------------------

    pub async fn create_post(
        &self,
        actor_id: Uuid,
        text: &str,
        image: Option<&str>,
    ) -> Result<Post> {
        self.posts.create(actor_id, text, image).await
    }

    pub async fn get_post(&self, post_id: Uuid) -> Result<Post> {
        self.posts.get_by_id(post_id).await
    }

    pub async fn list_posts(&self) -> Result<Vec<Post>> {
        self.posts.list_all().await
    }

    pub async fn list_user_posts(&self, user_id: Uuid) -> Result<Vec<Post>> {
        self.posts.list_by_user(user_id).await
    }

    /// Author, like-ers and comments embedded
    pub async fn get_post_view(&self, post_id: Uuid) -> Result<PostView> {
        let post = self.posts.get_by_id(post_id).await?;
        self.views.post(post).await
    }

    pub async fn list_post_views(&self) -> Result<Vec<PostView>> {
        let posts = self.posts.list_all().await?;
        self.views.posts(posts).await
    }

    pub async fn list_user_post_views(&self, user_id: Uuid) -> Result<Vec<PostView>> {
        let posts = self.posts.list_by_user(user_id).await?;
        self.views.posts(posts).await
    }

    pub async fn update_post(
        &self,
        post_id: Uuid,
        actor_id: Uuid,
        update: PostUpdate,
    ) -> Result<Post> {
        self.posts.update(post_id, actor_id, update).await
    }

    pub async fn delete_post(&self, post_id: Uuid, actor_id: Uuid) -> Result<PostDeletion> {
        self.posts.delete(post_id, actor_id).await
    }

    pub async fn like_post(&self, post_id: Uuid, actor_id: Uuid) -> Result<Vec<Uuid>> {
        self.posts.like(post_id, actor_id).await
    }

    pub async fn unlike_post(&self, post_id: Uuid, actor_id: Uuid) -> Result<Vec<Uuid>> {
        self.posts.unlike(post_id, actor_id).await
    }

    // ---------------------------------------------------------------------
    // Comments
    // ---------------------------------------------------------------------

    pub async fn add_comment(&self, post_id: Uuid, actor_id: Uuid, text: &str) -> Result<Comment> {
        self.comments.create(post_id, actor_id, text).await
    }

    pub async fn get_comment(&self, comment_id: Uuid) -> Result<Comment> {
        self.comments.get_by_id(comment_id).await
    }

    pub async fn list_comments(&self, post_id: Uuid) -> Result<Vec<Comment>> {
        self.comments.list_by_post(post_id).await
    }

    /// Newest first, authors and like-ers embedded
    pub async fn list_comment_views(&self, post_id: Uuid) -> Result<Vec<CommentView>> {
        let comments = self.comments.list_by_post(post_id).await?;
        self.views.comments(comments).await
    }

    pub async fn update_comment(
        &self,
        comment_id: Uuid,
        actor_id: Uuid,
        text: Option<&str>,
    ) -> Result<Comment> {
        self.comments.update(comment_id, actor_id, text).await
    }

    pub async fn delete_comment(&self, comment_id: Uuid, actor_id: Uuid) -> Result<()> {
        self.comments.delete(comment_id, actor_id).await
    }

    pub async fn like_comment(&self, comment_id: Uuid, actor_id: Uuid) -> Result<Vec<Uuid>> {
        self.comments.like(comment_id, actor_id).await
    }

    pub async fn unlike_comment(&self, comment_id: Uuid, actor_id: Uuid) -> Result<Vec<Uuid>> {
        self.comments.unlike(comment_id, actor_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::User;
    use crate::services::testing::RecordingImages;

    /// Token is the user id itself
    struct PlainIds;

    impl Authenticator for PlainIds {
        fn verify(&self, credential: &str) -> Result<Uuid> {
            Uuid::parse_str(credential)
                .map_err(|_| AppError::InvalidCredential("bad token".into()))
        }

        fn issue(&self, user: &User) -> Result<String> {
            Ok(user.id.to_string())
        }
    }

    fn service() -> SocialGraphService {
        SocialGraphService::new(
            Repositories::in_memory(),
            Arc::new(RecordingImages::default()),
            Arc::new(PlainIds),
        )
    }

    #[tokio::test]
    async fn test_register_issues_verifiable_token() {
        let graph = service();
        let session = graph
            .register("alice", "alice@example.com", "secret1", None)
            .await
            .unwrap();

        assert_eq!(graph.authenticate(&session.token).unwrap(), session.user.id);
        assert_eq!(graph.me(session.user.id).await.unwrap(), session.user);

        let again = graph.login("alice@example.com", "secret1").await.unwrap();
        assert_eq!(again.user.id, session.user.id);
        assert!(matches!(
            graph.authenticate("garbage"),
            Err(AppError::InvalidCredential(_))
        ));
    }

    #[tokio::test]
    async fn test_deleting_post_removes_its_comments() {
        let graph = service();
        let owner = graph
            .register("owner", "owner@example.com", "secret1", None)
            .await
            .unwrap()
            .user
            .id;

        let post = graph.create_post(owner, "hello", None).await.unwrap();
        let c1 = graph.add_comment(post.id, owner, "one").await.unwrap();
        let c2 = graph.add_comment(post.id, owner, "two").await.unwrap();

        let deletion = graph.delete_post(post.id, owner).await.unwrap();
        assert_eq!(deletion.comments_removed, 2);
        assert_eq!(deletion.image, None);

        for id in [c1.id, c2.id] {
            assert!(matches!(
                graph.get_comment(id).await,
                Err(AppError::NotFound(_))
            ));
        }
        assert!(graph.list_comments(post.id).await.unwrap().is_empty());
    }
}
