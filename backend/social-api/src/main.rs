use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crypto_core::JwtKeys;
use social_api::auth::{Authenticator, JwtAuthenticator};
use social_api::db::Repositories;
use social_api::media::{CloudinaryImageStore, ImageStore, UnconfiguredImageStore};
use social_api::middleware::BearerAuth;
use social_api::services::SocialGraphService;
use social_api::Config;

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = terminate.recv() => {},
                }
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

async fn build_repositories(config: &Config) -> Result<Repositories> {
    let Some(url) = config.database.url.as_deref() else {
        warn!("DATABASE_URL not set; using the in-memory store (data is lost on restart)");
        return Ok(Repositories::in_memory());
    };

    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .acquire_timeout(Duration::from_secs(10))
        .idle_timeout(Duration::from_secs(600))
        .connect(url)
        .await
        .context("Failed to connect to database")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;
    info!("Database pool created and migrations applied");

    Ok(Repositories::postgres(pool))
}

fn build_image_store(config: &Config) -> Result<Arc<dyn ImageStore>> {
    match config.images.cloudinary.clone() {
        Some(credentials) => {
            info!(
                cloud = %credentials.cloud_name,
                folder = %config.images.folder,
                "Image hosting: Cloudinary"
            );
            let store = CloudinaryImageStore::new(credentials, &config.images)
                .context("Failed to build image hosting client")?;
            Ok(Arc::new(store))
        }
        None => {
            warn!("Cloudinary credentials not set; image uploads will be rejected");
            Ok(Arc::new(UnconfiguredImageStore))
        }
    }
}

fn build_authenticator(config: &Config) -> Result<Arc<dyn Authenticator>> {
    let keys = match config.jwt.private_key_pem.as_deref() {
        Some(private_pem) => JwtKeys::from_pem(private_pem, &config.jwt.public_key_pem)
            .context("Failed to parse JWT key pair")?,
        None => {
            warn!("JWT private key not set; register and login are disabled");
            JwtKeys::validation_only(&config.jwt.public_key_pem)
                .context("Failed to parse JWT public key")?
        }
    };
    Ok(Arc::new(JwtAuthenticator::new(keys)))
}

#[actix_web::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,actix_web=info,sqlx=warn"));
    let registry = tracing_subscriber::registry().with(filter);
    // LOG_FORMAT=json for structured output
    if std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json")) {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    let config = Config::from_env().context("Failed to load configuration")?;
    info!(
        "Starting social-api v{} (env={})",
        env!("CARGO_PKG_VERSION"),
        config.app.env
    );

    let repos = build_repositories(&config).await?;
    let images = build_image_store(&config)?;
    let auth = build_authenticator(&config)?;
    let graph = web::Data::new(SocialGraphService::new(repos, images, auth));

    let bind_address = format!("{}:{}", config.app.host, config.app.port);
    let allowed_origins = config.cors.allowed_origins.clone();
    info!("Starting HTTP server on {}", bind_address);

    let server = HttpServer::new(move || {
        let mut cors = Cors::default()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);
        for origin in allowed_origins.split(',').map(str::trim) {
            if origin == "*" {
                cors = cors.allow_any_origin();
            } else if !origin.is_empty() {
                cors = cors.allowed_origin(origin);
            }
        }

        App::new()
            .app_data(graph.clone())
            .wrap(BearerAuth)
            .wrap(cors)
            .wrap(TracingLogger::default())
            .configure(social_api::configure)
    })
    .bind(&bind_address)
    .with_context(|| format!("Failed to bind {}", bind_address))?
    .disable_signals()
    .run();

    let handle = server.handle();
    let server_task = actix_web::rt::spawn(server);

    shutdown_signal().await;
    info!("Shutdown signal received, stopping HTTP server");
    handle.stop(true).await;

    match server_task.await {
        Ok(result) => result.context("HTTP server error")?,
        Err(e) => warn!("HTTP server task panicked: {}", e),
    }

    info!("social-api shut down");
    Ok(())
}
