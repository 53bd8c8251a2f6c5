use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::{CommentRepository, LikeOutcome};
use crate::error::Result;
use crate::models::{Comment, NewComment};

const COMMENT_COLUMNS: &str = r#"
    c.id, c.post_id, c.user_id, c.text,
    ARRAY(
        SELECT l.user_id FROM comment_likes l
        WHERE l.comment_id = c.id
        ORDER BY l.created_at, l.user_id
    ) AS likes,
    c.created_at, c.updated_at
"#;

#[derive(Clone)]
pub struct PgCommentRepository {
    pool: PgPool,
}

impl PgCommentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn lock_comment(tx: &mut Transaction<'_, Postgres>, comment_id: Uuid) -> Result<bool> {
        let locked: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM comments WHERE id = $1 FOR UPDATE")
                .bind(comment_id)
                .fetch_optional(&mut **tx)
                .await?;
        Ok(locked.is_some())
    }

    async fn likes_of(tx: &mut Transaction<'_, Postgres>, comment_id: Uuid) -> Result<Vec<Uuid>> {
        let likes: Vec<Uuid> = sqlx::query_scalar(
            r#"
            SELECT user_id FROM comment_likes
            WHERE comment_id = $1
            ORDER BY created_at, user_id
            "#,
        )
        .bind(comment_id)
        .fetch_all(&mut **tx)
        .await?;
        Ok(likes)
    }
}

#[async_trait]
impl CommentRepository for PgCommentRepository {
    async fn insert_comment(&self, new_comment: NewComment) -> Result<Option<Comment>> {
        let mut tx = self.pool.begin().await?;

        // Holding the parent row keeps a concurrent delete_post from orphaning us
        let parent: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM posts WHERE id = $1 FOR UPDATE")
                .bind(new_comment.post_id)
                .fetch_optional(&mut *tx)
                .await?;
        if parent.is_none() {
            return Ok(None);
        }

        let comment = sqlx::query_as::<_, Comment>(
            r#"
            INSERT INTO comments (id, post_id, user_id, text)
            VALUES ($1, $2, $3, $4)
            RETURNING id, post_id, user_id, text, ARRAY[]::uuid[] AS likes,
                      created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new_comment.post_id)
        .bind(new_comment.user_id)
        .bind(&new_comment.text)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        Ok(Some(comment))
    }

    async fn find_comment(&self, comment_id: Uuid) -> Result<Option<Comment>> {
        let sql = format!("SELECT {} FROM comments c WHERE c.id = $1", COMMENT_COLUMNS);
        let comment = sqlx::query_as::<_, Comment>(&sql)
            .bind(comment_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(comment)
    }

    async fn list_comments_by_post(&self, post_id: Uuid) -> Result<Vec<Comment>> {
        let sql = format!(
            "SELECT {} FROM comments c WHERE c.post_id = $1 ORDER BY c.created_at DESC, c.id DESC",
            COMMENT_COLUMNS
        );
        let comments = sqlx::query_as::<_, Comment>(&sql)
            .bind(post_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(comments)
    }

    async fn update_comment_text(
        &self,
        comment_id: Uuid,
        text: Option<String>,
    ) -> Result<Option<Comment>> {
        let updated: Option<Uuid> = sqlx::query_scalar(
            r#"
            UPDATE comments
            SET text = COALESCE($2, text), updated_at = NOW()
            WHERE id = $1
            RETURNING id
            "#,
        )
        .bind(comment_id)
        .bind(text)
        .fetch_optional(&self.pool)
        .await?;

        match updated {
            Some(id) => self.find_comment(id).await,
            None => Ok(None),
        }
    }

    async fn delete_comment(&self, comment_id: Uuid) -> Result<bool> {
        // The post's comment list is derived from this table, so one delete detaches it
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(comment_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn add_comment_like(&self, comment_id: Uuid, user_id: Uuid) -> Result<LikeOutcome> {
        let mut tx = self.pool.begin().await?;
        if !Self::lock_comment(&mut tx, comment_id).await? {
            return Ok(LikeOutcome::Missing);
        }

        let inserted = sqlx::query(
            r#"
            INSERT INTO comment_likes (comment_id, user_id)
            VALUES ($1, $2)
            ON CONFLICT (comment_id, user_id) DO NOTHING
            "#,
        )
        .bind(comment_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if inserted == 0 {
            return Ok(LikeOutcome::Unchanged);
        }

        let likes = Self::likes_of(&mut tx, comment_id).await?;
        tx.commit().await?;
        Ok(LikeOutcome::Changed(likes))
    }

    async fn remove_comment_like(&self, comment_id: Uuid, user_id: Uuid) -> Result<LikeOutcome> {
        let mut tx = self.pool.begin().await?;
        if !Self::lock_comment(&mut tx, comment_id).await? {
            return Ok(LikeOutcome::Missing);
        }

        let removed =
            sqlx::query("DELETE FROM comment_likes WHERE comment_id = $1 AND user_id = $2")
                .bind(comment_id)
                .bind(user_id)
                .execute(&mut *tx)
                .await?
                .rows_affected();

        if removed == 0 {
            return Ok(LikeOutcome::Unchanged);
        }

        let likes = Self::likes_of(&mut tx, comment_id).await?;
        tx.commit().await?;
        Ok(LikeOutcome::Changed(likes))
    }
}
