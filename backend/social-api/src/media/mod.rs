/// Image hosting
///
/// Uploads are fatal to the operation that needs them; deletions are
/// advisory. [`release_image`] is the only way services delete an image, and
/// it logs and swallows failures.
pub mod cloudinary;

pub use cloudinary::CloudinaryImageStore;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImageError {
    #[error("Image upload failed: {0}")]
    Upload(String),

    #[error("Image deletion failed: {0}")]
    Delete(String),

    #[error("Image hosting is not configured")]
    NotConfigured,
}

/// External image host
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Store an encoded image (data URI or remote URL) and return its durable URL
    async fn upload(&self, encoded_image: &str) -> Result<String, ImageError>;

    /// Remove a previously uploaded image
    async fn delete(&self, url: &str) -> Result<(), ImageError>;
}

/// Outcome of a best-effort image deletion
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageRelease {
    Released,
    /// The host refused or timed out; the primary mutation still stands
    Failed(String),
}

impl ImageRelease {
    pub fn is_released(&self) -> bool {
        matches!(self, ImageRelease::Released)
    }
}

/// Delete `url` from the image host without ever failing the caller
pub async fn release_image(store: &dyn ImageStore, url: &str) -> ImageRelease {
    match store.delete(url).await {
        Ok(()) => {
            tracing::debug!(%url, "image released");
            ImageRelease::Released
        }
        Err(e) => {
            tracing::warn!(%url, error = %e, "image release failed; continuing");
            ImageRelease::Failed(e.to_string())
        }
    }
}

/// Used when no image host is configured: uploads fail, deletes are no-ops
#[derive(Debug, Default, Clone, Copy)]
pub struct UnconfiguredImageStore;

#[async_trait]
impl ImageStore for UnconfiguredImageStore {
    async fn upload(&self, _encoded_image: &str) -> Result<String, ImageError> {
        Err(ImageError::NotConfigured)
    }

    async fn delete(&self, _url: &str) -> Result<(), ImageError> {
        Ok(())
    }
}
