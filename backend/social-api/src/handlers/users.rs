/// User endpoints: directory, profile, follow graph
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::Result;
use crate::middleware::Actor;
use crate::models::ProfileUpdate;
use crate::services::SocialGraphService;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub query: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    #[serde(default, alias = "fullName")]
    pub full_name: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    /// Encoded image (data URI or remote URL)
    #[serde(default, alias = "profilePicture")]
    pub profile_picture: Option<String>,
}

pub async fn list_users(graph: web::Data<SocialGraphService>) -> Result<HttpResponse> {
    let users = graph.list_users().await?;
    Ok(HttpResponse::Ok().json(users))
}

pub async fn search_users(
    graph: web::Data<SocialGraphService>,
    query: web::Query<SearchQuery>,
) -> Result<HttpResponse> {
    let users = graph.search_users(query.query.as_deref()).await?;
    Ok(HttpResponse::Ok().json(users))
}

pub async fn get_user(
    graph: web::Data<SocialGraphService>,
    user_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let user = graph.get_user_view(*user_id).await?;
    Ok(HttpResponse::Ok().json(user))
}

pub async fn update_profile(
    graph: web::Data<SocialGraphService>,
    actor: Actor,
    req: web::Json<UpdateProfileRequest>,
) -> Result<HttpResponse> {
    let req = req.into_inner();
    let user = graph
        .update_profile(
            actor.0,
            ProfileUpdate {
                full_name: req.full_name,
                bio: req.bio,
                profile_picture: req.profile_picture,
            },
        )
        .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Profile updated successfully",
        "user": user,
    })))
}

pub async fn follow_user(
    graph: web::Data<SocialGraphService>,
    actor: Actor,
    target_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    graph.follow(actor.0, *target_id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "User followed successfully" })))
}

pub async fn unfollow_user(
    graph: web::Data<SocialGraphService>,
    actor: Actor,
    target_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    graph.unfollow(actor.0, *target_id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "User unfollowed successfully" })))
}
