/// Comment endpoints
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::Result;
use crate::middleware::Actor;
use crate::services::SocialGraphService;

#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCommentRequest {
    #[serde(default)]
    pub text: Option<String>,
}

pub async fn list_comments(
    graph: web::Data<SocialGraphService>,
    post_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let comments = graph.list_comment_views(*post_id).await?;
    Ok(HttpResponse::Ok().json(comments))
}

pub async fn add_comment(
    graph: web::Data<SocialGraphService>,
    actor: Actor,
    post_id: web::Path<Uuid>,
    req: web::Json<CreateCommentRequest>,
) -> Result<HttpResponse> {
    let comment = graph.add_comment(*post_id, actor.0, &req.text).await?;
    Ok(HttpResponse::Created().json(serde_json::json!({
        "message": "Comment added successfully",
        "comment": comment,
    })))
}

pub async fn update_comment(
    graph: web::Data<SocialGraphService>,
    actor: Actor,
    comment_id: web::Path<Uuid>,
    req: web::Json<UpdateCommentRequest>,
) -> Result<HttpResponse> {
    let comment = graph
        .update_comment(*comment_id, actor.0, req.text.as_deref())
        .await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Comment updated successfully",
        "comment": comment,
    })))
}

pub async fn delete_comment(
    graph: web::Data<SocialGraphService>,
    actor: Actor,
    comment_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    graph.delete_comment(*comment_id, actor.0).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "Comment deleted successfully" })))
}

pub async fn like_comment(
    graph: web::Data<SocialGraphService>,
    actor: Actor,
    comment_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let likes = graph.like_comment(*comment_id, actor.0).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Comment liked successfully",
        "likes": likes,
    })))
}

pub async fn unlike_comment(
    graph: web::Data<SocialGraphService>,
    actor: Actor,
    comment_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let likes = graph.unlike_comment(*comment_id, actor.0).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Comment unliked successfully",
        "likes": likes,
    })))
}
