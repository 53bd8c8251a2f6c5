use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::{EdgeChange, Revision, UserRepository};
use crate::error::Result;
use crate::models::{NewUser, ProfileChanges, User, UserSummary};

/// Columns of a `User` row, with both follow directions folded into arrays
const USER_COLUMNS: &str = r#"
    u.id, u.username, u.email, u.password_hash, u.full_name, u.bio, u.profile_picture,
    ARRAY(
        SELECT f.follower_id FROM follows f
        WHERE f.followee_id = u.id
        ORDER BY f.created_at, f.follower_id
    ) AS followers,
    ARRAY(
        SELECT f.followee_id FROM follows f
        WHERE f.follower_id = u.id
        ORDER BY f.created_at, f.followee_id
    ) AS following,
    u.created_at, u.updated_at
"#;

/// Escape LIKE metacharacters so the query matches literally
fn like_pattern(query: &str) -> String {
    let escaped = query
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Share-lock both endpoints of a follow edge; `false` if either is missing
    async fn lock_pair(
        tx: &mut Transaction<'_, Postgres>,
        follower_id: Uuid,
        followee_id: Uuid,
    ) -> Result<bool> {
        let found: Vec<Uuid> = sqlx::query_scalar(
            r#"
            SELECT id FROM users
            WHERE id = ANY($1)
            FOR SHARE
            "#,
        )
        .bind(vec![follower_id, followee_id])
        .fetch_all(&mut **tx)
        .await?;

        Ok(found.contains(&follower_id) && found.contains(&followee_id))
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn insert_user(&self, new_user: NewUser) -> Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, username, email, password_hash, full_name)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, username, email, password_hash, full_name, bio, profile_picture,
                      ARRAY[]::uuid[] AS followers, ARRAY[]::uuid[] AS following,
                      created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new_user.username)
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .bind(&new_user.full_name)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_user(&self, user_id: Uuid) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users u WHERE u.id = $1", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users u WHERE u.email = $1", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let sql = format!(
            "SELECT {} FROM users u ORDER BY u.created_at, u.id",
            USER_COLUMNS
        );
        let users = sqlx::query_as::<_, User>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    async fn search_users(&self, query: &str) -> Result<Vec<User>> {
        let sql = format!(
            r#"
            SELECT {} FROM users u
            WHERE u.username ILIKE $1 ESCAPE '\'
               OR u.full_name ILIKE $1 ESCAPE '\'
               OR u.email ILIKE $1 ESCAPE '\'
            ORDER BY u.created_at, u.id
            "#,
            USER_COLUMNS
        );
        let users = sqlx::query_as::<_, User>(&sql)
            .bind(like_pattern(query))
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    async fn find_user_summaries(&self, user_ids: &[Uuid]) -> Result<Vec<UserSummary>> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }

        let summaries = sqlx::query_as::<_, UserSummary>(
            r#"
            SELECT id, username, full_name, profile_picture
            FROM users
            WHERE id = ANY($1)
            "#,
        )
        .bind(user_ids.to_vec())
        .fetch_all(&self.pool)
        .await?;
        Ok(summaries)
    }

    async fn update_profile(
        &self,
        user_id: Uuid,
        changes: ProfileChanges,
    ) -> Result<Option<Revision<User>>> {
        let mut tx = self.pool.begin().await?;
        let previous: Option<Option<String>> =
            sqlx::query_scalar("SELECT profile_picture FROM users WHERE id = $1 FOR UPDATE")
                .bind(user_id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(previous_image) = previous else {
            return Ok(None);
        };

        sqlx::query(
            r#"
            UPDATE users
            SET full_name = COALESCE($2, full_name),
                bio = COALESCE($3, bio),
                profile_picture = COALESCE($4, profile_picture),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .bind(changes.full_name)
        .bind(changes.bio)
        .bind(changes.profile_picture)
        .execute(&mut *tx)
        .await?;

        let sql = format!("SELECT {} FROM users u WHERE u.id = $1", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(user_id)
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(Some(Revision {
            current: user,
            previous_image,
        }))
    }

    async fn add_follow(&self, follower_id: Uuid, followee_id: Uuid) -> Result<EdgeChange> {
        let mut tx = self.pool.begin().await?;
        if !Self::lock_pair(&mut tx, follower_id, followee_id).await? {
            return Ok(EdgeChange::Missing);
        }

        let result = sqlx::query(
            r#"
            INSERT INTO follows (follower_id, followee_id)
            VALUES ($1, $2)
            ON CONFLICT (follower_id, followee_id) DO NOTHING
            "#,
        )
        .bind(follower_id)
        .bind(followee_id)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        Ok(if result.rows_affected() > 0 {
            EdgeChange::Applied
        } else {
            EdgeChange::Unchanged
        })
    }

    async fn remove_follow(&self, follower_id: Uuid, followee_id: Uuid) -> Result<EdgeChange> {
        let mut tx = self.pool.begin().await?;
        if !Self::lock_pair(&mut tx, follower_id, followee_id).await? {
            return Ok(EdgeChange::Missing);
        }

        let result = sqlx::query(
            r#"
            DELETE FROM follows
            WHERE follower_id = $1 AND followee_id = $2
            "#,
        )
        .bind(follower_id)
        .bind(followee_id)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        Ok(if result.rows_affected() > 0 {
            EdgeChange::Applied
        } else {
            EdgeChange::Unchanged
        })
    }
}
