/// Post endpoints
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::Result;
use crate::middleware::Actor;
use crate::models::PostUpdate;
use crate::services::SocialGraphService;

#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    pub text: String,
    /// Encoded image (data URI or remote URL)
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePostRequest {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

pub async fn create_post(
    graph: web::Data<SocialGraphService>,
    actor: Actor,
    req: web::Json<CreatePostRequest>,
) -> Result<HttpResponse> {
    let post = graph
        .create_post(actor.0, &req.text, req.image.as_deref())
        .await?;

    Ok(HttpResponse::Created().json(serde_json::json!({
        "message": "Post created successfully",
        "post": post,
    })))
}

pub async fn list_posts(graph: web::Data<SocialGraphService>) -> Result<HttpResponse> {
    let posts = graph.list_post_views().await?;
    Ok(HttpResponse::Ok().json(posts))
}

pub async fn get_user_posts(
    graph: web::Data<SocialGraphService>,
    user_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let posts = graph.list_user_post_views(*user_id).await?;
    Ok(HttpResponse::Ok().json(posts))
}

pub async fn get_post(
    graph: web::Data<SocialGraphService>,
    post_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let post = graph.get_post_view(*post_id).await?;
    Ok(HttpResponse::Ok().json(post))
}

pub async fn update_post(
    graph: web::Data<SocialGraphService>,
    actor: Actor,
    post_id: web::Path<Uuid>,
    req: web::Json<UpdatePostRequest>,
) -> Result<HttpResponse> {
    let req = req.into_inner();
    let post = graph
        .update_post(
            *post_id,
            actor.0,
            PostUpdate {
                text: req.text,
                image: req.image,
            },
        )
        .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Post updated successfully",
        "post": post,
    })))
}

pub async fn delete_post(
    graph: web::Data<SocialGraphService>,
    actor: Actor,
    post_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    graph.delete_post(*post_id, actor.0).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "Post deleted successfully" })))
}

pub async fn like_post(
    graph: web::Data<SocialGraphService>,
    actor: Actor,
    post_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let likes = graph.like_post(*post_id, actor.0).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Post liked successfully",
        "likes": likes,
    })))
}

pub async fn unlike_post(
    graph: web::Data<SocialGraphService>,
    actor: Actor,
    post_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let likes = graph.unlike_post(*post_id, actor.0).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Post unliked successfully",
        "likes": likes,
    })))
}
