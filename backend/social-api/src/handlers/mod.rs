/// HTTP handlers for social-api
///
/// - auth: register, login, current user
/// - users: directory, search, profile, follow graph
/// - posts: CRUD and likes
/// - comments: CRUD and likes, keyed by post for listing/creation
pub mod auth;
pub mod comments;
pub mod health;
pub mod posts;
pub mod users;

use actix_web::{web, HttpResponse, ResponseError};

use crate::error::AppError;

/// Request body ceiling; image payloads arrive inline as data URIs
pub const JSON_LIMIT_BYTES: usize = 50 * 1024 * 1024;

/// JSON extractor config rendering body errors in the API's error shape
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(JSON_LIMIT_BYTES)
        .error_handler(|err, _req| AppError::Validation(err.to_string()).into())
}

/// Path extractor config: a malformed id is a bad request
pub fn path_config() -> web::PathConfig {
    web::PathConfig::default().error_handler(|err, _req| {
        AppError::Validation(format!("Invalid identifier: {}", err)).into()
    })
}

/// Register every route on `cfg`
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(health::banner))
        .service(
            web::scope("/api")
                .route("/health", web::get().to(health::health_check))
                .service(
                    web::scope("/auth")
                        .route("/register", web::post().to(auth::register))
                        .route("/login", web::post().to(auth::login))
                        .route("/me", web::get().to(auth::me)),
                )
                .service(
                    web::scope("/users")
                        .route("", web::get().to(users::list_users))
                        .route("/search", web::get().to(users::search_users))
                        .route("/profile", web::put().to(users::update_profile))
                        .route("/{id}", web::get().to(users::get_user))
                        .route("/{id}/follow", web::post().to(users::follow_user))
                        .route("/{id}/unfollow", web::post().to(users::unfollow_user)),
                )
                .service(
                    web::scope("/posts")
                        .route("", web::get().to(posts::list_posts))
                        .route("", web::post().to(posts::create_post))
                        .route("/user/{user_id}", web::get().to(posts::get_user_posts))
                        .route("/{id}", web::get().to(posts::get_post))
                        .route("/{id}", web::put().to(posts::update_post))
                        .route("/{id}", web::delete().to(posts::delete_post))
                        .route("/{id}/like", web::post().to(posts::like_post))
                        .route("/{id}/unlike", web::post().to(posts::unlike_post)),
                )
                .service(
                    web::scope("/comments")
                        // GET/POST take a post id, PUT/DELETE a comment id
                        .route("/{id}", web::get().to(comments::list_comments))
                        .route("/{id}", web::post().to(comments::add_comment))
                        .route("/{id}", web::put().to(comments::update_comment))
                        .route("/{id}", web::delete().to(comments::delete_comment))
                        .route("/{id}/like", web::post().to(comments::like_comment))
                        .route("/{id}/unlike", web::post().to(comments::unlike_comment)),
                ),
        )
        .default_service(web::to(not_found));
}

async fn not_found() -> HttpResponse {
    AppError::NotFound("Route not found".into()).error_response()
}
