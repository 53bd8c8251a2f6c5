/// Business logic layer for social-api
///
/// - `UserDirectory`: accounts, profiles and the follow graph
/// - `PostStore`: posts and their like sets
/// - `CommentStore`: comments and their like sets
/// - `ViewAssembler`: read views with referenced users embedded
/// - `SocialGraphService`: the composed service handlers talk to
pub mod comments;
pub mod posts;
pub mod social_graph;
pub mod users;
pub mod views;

pub use comments::CommentStore;
pub use posts::{PostDeletion, PostStore};
pub use social_graph::SocialGraphService;
pub use users::UserDirectory;
pub use views::ViewAssembler;

use crate::error::Result;
use crate::media::{release_image, ImageStore};

/// Upload an encoded image if one was supplied. Blank payloads count as absent.
pub(crate) async fn upload_image(
    images: &dyn ImageStore,
    payload: Option<&str>,
) -> Result<Option<String>> {
    match payload.map(str::trim).filter(|p| !p.is_empty()) {
        Some(encoded) => Ok(Some(images.upload(encoded).await?)),
        None => Ok(None),
    }
}

/// Release an image uploaded for a write that did not happen
pub(crate) async fn discard_upload(images: &dyn ImageStore, url: Option<&str>) {
    if let Some(url) = url {
        release_image(images, url).await;
    }
}

/// Release `old` once `new` has replaced it
pub(crate) async fn release_replaced(
    images: &dyn ImageStore,
    old: Option<&str>,
    new: Option<&str>,
) {
    if let (Some(old), Some(new)) = (old, new) {
        if old != new {
            release_image(images, old).await;
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;

    use crate::media::{ImageError, ImageStore};

    /// Image host double that records every call
    #[derive(Default)]
    pub struct RecordingImages {
        pub uploads: Mutex<Vec<String>>,
        pub deletes: Mutex<Vec<String>>,
        pub fail_uploads: bool,
        /// Held before an upload completes, to interleave concurrent callers
        pub upload_delay: Option<Duration>,
    }

    impl RecordingImages {
        pub fn failing() -> Self {
            Self {
                fail_uploads: true,
                ..Self::default()
            }
        }

        pub fn slow(delay: Duration) -> Self {
            Self {
                upload_delay: Some(delay),
                ..Self::default()
            }
        }

        pub fn deleted(&self) -> Vec<String> {
            self.deletes.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ImageStore for RecordingImages {
        async fn upload(&self, encoded_image: &str) -> Result<String, ImageError> {
            if let Some(delay) = self.upload_delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail_uploads {
                return Err(ImageError::Upload("host unavailable".into()));
            }
            let mut uploads = self.uploads.lock().unwrap();
            uploads.push(encoded_image.to_string());
            Ok(format!("https://img.test/social-media/{}.png", uploads.len()))
        }

        async fn delete(&self, url: &str) -> Result<(), ImageError> {
            self.deletes.lock().unwrap().push(url.to_string());
            Ok(())
        }
    }
}
