/// Account endpoints: register, login, current user
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use validator::Validate;

use crate::error::Result;
use crate::middleware::Actor;
use crate::services::SocialGraphService;

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(custom(function = "crate::validators::validate_username_field"))]
    pub username: String,
    #[validate(custom(function = "crate::validators::validate_email_field"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    #[serde(default, alias = "fullName")]
    pub full_name: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(custom(function = "crate::validators::validate_email_field"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

pub async fn register(
    graph: web::Data<SocialGraphService>,
    req: web::Json<RegisterRequest>,
) -> Result<HttpResponse> {
    req.validate()?;

    let session = graph
        .register(
            &req.username,
            &req.email,
            &req.password,
            req.full_name.as_deref(),
        )
        .await?;

    Ok(HttpResponse::Created().json(serde_json::json!({
        "message": "User registered successfully",
        "token": session.token,
        "user": session.user,
    })))
}

pub async fn login(
    graph: web::Data<SocialGraphService>,
    req: web::Json<LoginRequest>,
) -> Result<HttpResponse> {
    req.validate()?;

    let session = graph.login(&req.email, &req.password).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Login successful",
        "token": session.token,
        "user": session.user,
    })))
}

pub async fn me(graph: web::Data<SocialGraphService>, actor: Actor) -> Result<HttpResponse> {
    let user = graph.me(actor.0).await?;
    Ok(HttpResponse::Ok().json(user))
}
