/// Configuration management for social-api
///
/// Loads configuration from environment variables (and a `.env` file when
/// present, see `main.rs`).
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application settings
    pub app: AppConfig,
    /// CORS configuration
    pub cors: CorsConfig,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Token verification / issuance keys
    pub jwt: JwtConfig,
    /// Image hosting
    pub images: ImageConfig,
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application environment (development, staging, production)
    pub env: String,
    /// Server host to bind to
    pub host: String,
    /// Server port to bind to
    pub port: u16,
}

impl AppConfig {
    pub fn is_production(&self) -> bool {
        self.env.eq_ignore_ascii_case("production")
    }
}

/// CORS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Comma-separated list of allowed origins
    pub allowed_origins: String,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL URL; the in-memory store is used when unset
    pub url: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// JWT key material (PEM)
#[derive(Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    pub public_key_pem: String,
    /// Without a private key the service verifies tokens but cannot issue them
    pub private_key_pem: Option<String>,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("public_key_pem", &"<redacted>")
            .field("private_key_pem", &self.private_key_pem.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Cloudinary credentials
#[derive(Clone, Serialize, Deserialize)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
}

impl std::fmt::Debug for CloudinaryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudinaryConfig")
            .field("cloud_name", &self.cloud_name)
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .finish()
    }
}

/// Image hosting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageConfig {
    /// `None` disables uploads
    pub cloudinary: Option<CloudinaryConfig>,
    /// Folder every upload lands in
    #[serde(default = "default_image_folder")]
    pub folder: String,
    /// Upper bound on a single upload/destroy round trip
    #[serde(default = "default_image_timeout_ms")]
    pub request_timeout_ms: u64,
}

// Default values
fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

fn default_image_folder() -> String {
    "social-media".to_string()
}

fn default_image_timeout_ms() -> u64 {
    10_000
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let app_env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let app = AppConfig {
            env: app_env,
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(5000),
        };

        let cors = {
            let allowed_origins = match std::env::var("CORS_ALLOWED_ORIGINS") {
                Ok(value) => value,
                Err(_) if app.is_production() => {
                    bail!("CORS_ALLOWED_ORIGINS must be set in production")
                }
                Err(_) => "*".to_string(),
            };

            if app.is_production() && allowed_origins.trim() == "*" {
                bail!("CORS_ALLOWED_ORIGINS cannot be '*' in production");
            }

            CorsConfig { allowed_origins }
        };

        let database = DatabaseConfig {
            url: std::env::var("DATABASE_URL")
                .ok()
                .filter(|url| !url.trim().is_empty()),
            max_connections: std::env::var("DB_MAX_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or_else(default_max_connections),
            min_connections: std::env::var("DB_MIN_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or_else(default_min_connections),
        };

        if database.url.is_none() && app.is_production() {
            bail!("DATABASE_URL must be set in production");
        }

        let jwt = JwtConfig {
            public_key_pem: load_pem("JWT_PUBLIC_KEY_PEM", "JWT_PUBLIC_KEY_FILE")?
                .context("JWT_PUBLIC_KEY_PEM or JWT_PUBLIC_KEY_FILE must be set")?,
            private_key_pem: load_pem("JWT_PRIVATE_KEY_PEM", "JWT_PRIVATE_KEY_FILE")?,
        };

        let cloudinary = match (
            std::env::var("CLOUDINARY_NAME"),
            std::env::var("CLOUDINARY_API_KEY"),
            std::env::var("CLOUDINARY_API_SECRET"),
        ) {
            (Ok(cloud_name), Ok(api_key), Ok(api_secret)) => Some(CloudinaryConfig {
                cloud_name,
                api_key,
                api_secret,
            }),
            _ => None,
        };

        let images = ImageConfig {
            cloudinary,
            folder: std::env::var("CLOUDINARY_FOLDER").unwrap_or_else(|_| default_image_folder()),
            request_timeout_ms: std::env::var("IMAGE_REQUEST_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_image_timeout_ms),
        };

        Ok(Config {
            app,
            cors,
            database,
            jwt,
            images,
        })
    }
}

/// Read a PEM either inline from `inline_var` or from the file named by `file_var`.
/// Inline values may use literal `\n` sequences.
fn load_pem(inline_var: &str, file_var: &str) -> Result<Option<String>> {
    if let Ok(pem) = std::env::var(inline_var) {
        return Ok(Some(pem.replace("\\n", "\n")));
    }

    match std::env::var(file_var) {
        Ok(path) => std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {} from {}", file_var, path))
            .map(Some),
        Err(_) => Ok(None),
    }
}
