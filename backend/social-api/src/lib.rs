/// Social API Library
///
/// REST backend for a small social network: accounts, profiles, a follow
/// graph, posts, comments and likes, with images hosted externally.
///
/// # Modules
///
/// - `handlers`: HTTP request handlers and route table
/// - `services`: business logic (`UserDirectory`, `PostStore`, `CommentStore`,
///   composed into `SocialGraphService`)
/// - `db`: repository traits with PostgreSQL and in-memory implementations
/// - `models`: entities, views and repository inputs
/// - `media`: image hosting
/// - `auth`: bearer credential verification and issuance
/// - `middleware`: request authentication
/// - `security`: password hashing
/// - `validators`: input normalization
/// - `error`: error types and HTTP mapping
/// - `config`: configuration management
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod media;
pub mod middleware;
pub mod models;
pub mod security;
pub mod services;
pub mod validators;

pub use config::Config;
pub use error::{AppError, Result};

use actix_web::web;

/// Extractor configs plus every route. The caller supplies the
/// `web::Data<SocialGraphService>` and wraps [`middleware::BearerAuth`].
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(handlers::json_config())
        .app_data(handlers::path_config());
    handlers::configure_routes(cfg);
}
