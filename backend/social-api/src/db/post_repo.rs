use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::{LikeOutcome, PostRepository, RemovedPost, Revision};
use crate::error::Result;
use crate::models::{NewPost, Post, PostChanges};

const POST_COLUMNS: &str = r#"
    p.id, p.user_id, p.text, p.image,
    ARRAY(
        SELECT l.user_id FROM post_likes l
        WHERE l.post_id = p.id
        ORDER BY l.created_at, l.user_id
    ) AS likes,
    ARRAY(
        SELECT c.id FROM comments c
        WHERE c.post_id = p.id
        ORDER BY c.created_at, c.id
    ) AS comments,
    p.created_at, p.updated_at
"#;

#[derive(Clone)]
pub struct PgPostRepository {
    pool: PgPool,
}

impl PgPostRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Row-lock the post and read its image; `None` when it does not exist
    async fn lock_post_image(
        tx: &mut Transaction<'_, Postgres>,
        post_id: Uuid,
    ) -> Result<Option<Option<String>>> {
        let image: Option<Option<String>> =
            sqlx::query_scalar("SELECT image FROM posts WHERE id = $1 FOR UPDATE")
                .bind(post_id)
                .fetch_optional(&mut **tx)
                .await?;
        Ok(image)
    }

    /// Row-lock the post; `false` when it does not exist
    async fn lock_post(tx: &mut Transaction<'_, Postgres>, post_id: Uuid) -> Result<bool> {
        Ok(Self::lock_post_image(tx, post_id).await?.is_some())
    }

    async fn likes_of(tx: &mut Transaction<'_, Postgres>, post_id: Uuid) -> Result<Vec<Uuid>> {
        let likes: Vec<Uuid> = sqlx::query_scalar(
            r#"
            SELECT user_id FROM post_likes
            WHERE post_id = $1
            ORDER BY created_at, user_id
            "#,
        )
        .bind(post_id)
        .fetch_all(&mut **tx)
        .await?;
        Ok(likes)
    }
}

#[async_trait]
impl PostRepository for PgPostRepository {
    async fn insert_post(&self, new_post: NewPost) -> Result<Post> {
        let post = sqlx::query_as::<_, Post>(
            r#"
            INSERT INTO posts (id, user_id, text, image)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, text, image,
                      ARRAY[]::uuid[] AS likes, ARRAY[]::uuid[] AS comments,
                      created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new_post.user_id)
        .bind(&new_post.text)
        .bind(&new_post.image)
        .fetch_one(&self.pool)
        .await?;

        Ok(post)
    }

    async fn find_post(&self, post_id: Uuid) -> Result<Option<Post>> {
        let sql = format!("SELECT {} FROM posts p WHERE p.id = $1", POST_COLUMNS);
        let post = sqlx::query_as::<_, Post>(&sql)
            .bind(post_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(post)
    }

    async fn list_posts(&self) -> Result<Vec<Post>> {
        let sql = format!(
            "SELECT {} FROM posts p ORDER BY p.created_at DESC, p.id DESC",
            POST_COLUMNS
        );
        let posts = sqlx::query_as::<_, Post>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(posts)
    }

    async fn list_posts_by_user(&self, user_id: Uuid) -> Result<Vec<Post>> {
        let sql = format!(
            "SELECT {} FROM posts p WHERE p.user_id = $1 ORDER BY p.created_at DESC, p.id DESC",
            POST_COLUMNS
        );
        let posts = sqlx::query_as::<_, Post>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(posts)
    }

    async fn update_post(
        &self,
        post_id: Uuid,
        changes: PostChanges,
    ) -> Result<Option<Revision<Post>>> {
        let mut tx = self.pool.begin().await?;
        let Some(previous_image) = Self::lock_post_image(&mut tx, post_id).await? else {
            return Ok(None);
        };

        sqlx::query(
            r#"
            UPDATE posts
            SET text = COALESCE($2, text),
                image = COALESCE($3, image),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(post_id)
        .bind(changes.text)
        .bind(changes.image)
        .execute(&mut *tx)
        .await?;

        let sql = format!("SELECT {} FROM posts p WHERE p.id = $1", POST_COLUMNS);
        let post = sqlx::query_as::<_, Post>(&sql)
            .bind(post_id)
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(Some(Revision {
            current: post,
            previous_image,
        }))
    }

    async fn delete_post(&self, post_id: Uuid) -> Result<Option<RemovedPost>> {
        let mut tx = self.pool.begin().await?;
        let Some(image) = Self::lock_post_image(&mut tx, post_id).await? else {
            return Ok(None);
        };

        // Comment likes go with their comments via ON DELETE CASCADE
        let comments = sqlx::query("DELETE FROM comments WHERE post_id = $1")
            .bind(post_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(post_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(Some(RemovedPost {
            comments_removed: comments,
            image,
        }))
    }

    async fn add_post_like(&self, post_id: Uuid, user_id: Uuid) -> Result<LikeOutcome> {
        let mut tx = self.pool.begin().await?;
        if !Self::lock_post(&mut tx, post_id).await? {
            return Ok(LikeOutcome::Missing);
        }

        let inserted = sqlx::query(
            r#"
            INSERT INTO post_likes (post_id, user_id)
            VALUES ($1, $2)
            ON CONFLICT (post_id, user_id) DO NOTHING
            "#,
        )
        .bind(post_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if inserted == 0 {
            return Ok(LikeOutcome::Unchanged);
        }

        let likes = Self::likes_of(&mut tx, post_id).await?;
        tx.commit().await?;
        Ok(LikeOutcome::Changed(likes))
    }

    async fn remove_post_like(&self, post_id: Uuid, user_id: Uuid) -> Result<LikeOutcome> {
        let mut tx = self.pool.begin().await?;
        if !Self::lock_post(&mut tx, post_id).await? {
            return Ok(LikeOutcome::Missing);
        }

        let removed = sqlx::query("DELETE FROM post_likes WHERE post_id = $1 AND user_id = $2")
            .bind(post_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if removed == 0 {
            return Ok(LikeOutcome::Unchanged);
        }

        let likes = Self::likes_of(&mut tx, post_id).await?;
        tx.commit().await?;
        Ok(LikeOutcome::Changed(likes))
    }
}
