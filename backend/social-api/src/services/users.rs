/// Accounts, profiles and the follow graph
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use super::{discard_upload, release_replaced, upload_image};
use crate::db::{EdgeChange, UserRepository};
use crate::error::{AppError, Result};
use crate::media::ImageStore;
use crate::models::{NewUser, ProfileChanges, ProfileUpdate, User, UserProfile};
use crate::security::{hash_password, verify_password};
use crate::validators::{check_password, normalize_email, normalize_username};

const USER_NOT_FOUND: &str = "User not found";
const BAD_LOGIN: &str = "Invalid email or password";

#[derive(Clone)]
pub struct UserDirectory {
    users: Arc<dyn UserRepository>,
    images: Arc<dyn ImageStore>,
}

impl UserDirectory {
    pub fn new(users: Arc<dyn UserRepository>, images: Arc<dyn ImageStore>) -> Self {
        Self { users, images }
    }

    async fn require(&self, user_id: Uuid) -> Result<User> {
        self.users
            .find_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(USER_NOT_FOUND.into()))
    }

    /// Create an account. Username is trimmed, email lower-cased, password
    /// stored as an Argon2id hash.
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
        full_name: Option<&str>,
    ) -> Result<User> {
        let username = normalize_username(username)?;
        let email = normalize_email(email)?;
        check_password(password)?;

        let password_hash = hash_password(password)?;
        let user = self
            .users
            .insert_user(NewUser {
                username,
                email,
                password_hash,
                full_name: full_name.map(str::trim).unwrap_or_default().to_string(),
            })
            .await?;

        info!(user_id = %user.id, username = %user.username, "user registered");
        Ok(user)
    }

    /// Check credentials. Unknown email and wrong password are indistinguishable.
    pub async fn login(&self, email: &str, password: &str) -> Result<User> {
        let email = email.trim().to_lowercase();
        let Some(user) = self.users.find_user_by_email(&email).await? else {
            return Err(AppError::InvalidCredential(BAD_LOGIN.into()));
        };

        if !verify_password(password, &user.password_hash)? {
            debug!(user_id = %user.id, "password mismatch");
            return Err(AppError::InvalidCredential(BAD_LOGIN.into()));
        }

        info!(user_id = %user.id, "user logged in");
        Ok(user)
    }

    /// Full entity, for token issuance
    pub async fn get_user(&self, user_id: Uuid) -> Result<User> {
        self.require(user_id).await
    }

    pub async fn get_by_id(&self, user_id: Uuid) -> Result<UserProfile> {
        self.require(user_id).await.map(UserProfile::from)
    }

    pub async fn list(&self) -> Result<Vec<UserProfile>> {
        let users = self.users.list_users().await?;
        debug!(count = users.len(), "listed users");
        Ok(users.into_iter().map(UserProfile::from).collect())
    }

    pub async fn search(&self, query: Option<&str>) -> Result<Vec<UserProfile>> {
        let query = query.map(str::trim).unwrap_or_default();
        if query.is_empty() {
            return Err(AppError::Validation("Search query is required".into()));
        }

        let users = self.users.search_users(query).await?;
        debug!(%query, count = users.len(), "searched users");
        Ok(users.into_iter().map(UserProfile::from).collect())
    }

    /// Apply the provided fields only. A new picture is uploaded before
    /// anything is written; the picture it replaced is released afterwards.
    pub async fn update_profile(
        &self,
        user_id: Uuid,
        update: ProfileUpdate,
    ) -> Result<UserProfile> {
        self.require(user_id).await?;

        let uploaded = upload_image(self.images.as_ref(), update.profile_picture.as_deref()).await?;
        let changes = ProfileChanges {
            full_name: update.full_name,
            bio: update.bio,
            profile_picture: uploaded.clone(),
        };

        let revision = match self.users.update_profile(user_id, changes).await {
            Ok(Some(revision)) => revision,
            Ok(None) => {
                discard_upload(self.images.as_ref(), uploaded.as_deref()).await;
                return Err(AppError::NotFound(USER_NOT_FOUND.into()));
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

        info!(%user_id, "profile updated");
        Ok(revision.current.into())
    }

    pub async fn follow(&self, actor_id: Uuid, target_id: Uuid) -> Result<()> {
        if actor_id == target_id {
            return Err(AppError::Validation("Cannot follow yourself".into()));
        }

        match self.users.add_follow(actor_id, target_id).await? {
            EdgeChange::Applied => {
                info!(follower = %actor_id, followee = %target_id, "follow added");
                Ok(())
            }
            EdgeChange::Unchanged => Err(AppError::Conflict(
                "Already following this user".into(),
            )),
            EdgeChange::Missing => Err(AppError::NotFound(USER_NOT_FOUND.into())),
        }
    }

    /// Idempotent: not following is not an error
    pub async fn unfollow(&self, actor_id: Uuid, target_id: Uuid) -> Result<()> {
        match self.users.remove_follow(actor_id, target_id).await? {
            EdgeChange::Applied => {
                info!(follower = %actor_id, followee = %target_id, "follow removed");
                Ok(())
            }
            EdgeChange::Unchanged => Ok(()),
            EdgeChange::Missing => Err(AppError::NotFound(USER_NOT_FOUND.into())),
        }
    }
}
