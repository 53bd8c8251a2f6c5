/// Data models for social-api
///
/// - `User`: account plus follow graph edges (never serialized directly)
/// - `UserProfile`: the public view of a user
/// - `Post`, `Comment`: engagement entities with their like-er sets
/// - `UserSummary`, `UserView`, `PostView`, `CommentView`: read views with
///   referenced users (and a post's comments) embedded
/// - `New*` / `*Changes`: inputs handed to the repositories
/// - `*Update`: caller-facing change requests, before image upload
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub const POST_TEXT_MAX_CHARS: usize = 5000;
pub const COMMENT_TEXT_MAX_CHARS: usize = 1000;

/// User entity as stored. Carries the password hash, so it is deliberately
/// not `Serialize`; convert into [`UserProfile`] before returning it.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub full_name: String,
    pub bio: String,
    pub profile_picture: Option<String>,
    /// Users following this user
    pub followers: Vec<Uuid>,
    /// Users this user follows
    pub following: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Public view of a user (credential excluded)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub bio: String,
    pub profile_picture: Option<String>,
    pub followers: Vec<Uuid>,
    pub following: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            full_name: user.full_name,
            bio: user.bio,
            profile_picture: user.profile_picture,
            followers: user.followers,
            following: user.following,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Post {
    pub id: Uuid,
    pub user_id: Uuid,
    pub text: String,
    pub image: Option<String>,
    /// Like-er ids, each at most once, in like order
    pub likes: Vec<Uuid>,
    /// Comment ids in creation order
    pub comments: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub user_id: Uuid,
    pub text: String,
    pub likes: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =====================================================================
// Read views
// =====================================================================

/// A referenced user as embedded in other views. Never carries the email
/// or the password hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct UserSummary {
    pub id: Uuid,
    pub username: String,
    pub full_name: String,
    pub profile_picture: Option<String>,
}

/// A user with follower and following profiles embedded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserView {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub bio: String,
    pub profile_picture: Option<String>,
    pub followers: Vec<UserSummary>,
    pub following: Vec<UserSummary>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A comment with its author and like-ers embedded.
///
/// `user` is `None` only if the author row is gone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentView {
    pub id: Uuid,
    pub post_id: Uuid,
    pub user: Option<UserSummary>,
    pub text: String,
    pub likes: Vec<UserSummary>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A post with its author, like-ers and comments (oldest first) embedded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostView {
    pub id: Uuid,
    pub user: Option<UserSummary>,
    pub text: String,
    pub image: Option<String>,
    pub likes: Vec<UserSummary>,
    pub comments: Vec<CommentView>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =====================================================================
// Repository inputs
// =====================================================================

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub full_name: String,
}

/// Partial profile update; `None` leaves the field untouched
#[derive(Debug, Clone, Default)]
pub struct ProfileChanges {
    pub full_name: Option<String>,
    pub bio: Option<String>,
    pub profile_picture: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub user_id: Uuid,
    pub text: String,
    pub image: Option<String>,
}

/// Partial post update; `None` leaves the field untouched
#[derive(Debug, Clone, Default)]
pub struct PostChanges {
    pub text: Option<String>,
    pub image: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub post_id: Uuid,
    pub user_id: Uuid,
    pub text: String,
}

// =====================================================================
// Service inputs
// =====================================================================

/// Requested profile changes. `profile_picture` is an encoded image payload
/// that still has to be uploaded.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub full_name: Option<String>,
    pub bio: Option<String>,
    pub profile_picture: Option<String>,
}

/// Requested post changes. `image` is an encoded image payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostUpdate {
    pub text: Option<String>,
    pub image: Option<String>,
}

/// Access token plus the profile it was issued for
#[derive(Debug, Clone, Serialize)]
pub struct AuthSession {
    pub token: String,
    pub user: UserProfile,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_omits_password_hash() {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            username: "alice".into(),
            email: "alice@example.com".into(),
            password_hash: "$argon2id$v=19$secret".into(),
            full_name: "Alice".into(),
            bio: String::new(),
            profile_picture: None,
            followers: vec![],
            following: vec![],
            created_at: now,
            updated_at: now,
        };

        let json = serde_json::to_value(UserProfile::from(user)).unwrap();
        assert!(json.get("password_hash").is_none());
        assert!(!json.to_string().contains("argon2"));
        assert_eq!(json["username"], "alice");
    }
}
