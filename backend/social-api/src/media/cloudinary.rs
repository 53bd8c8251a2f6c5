/// Cloudinary-backed [`ImageStore`]
///
/// Uses the signed upload API: every request carries `api_key`, `timestamp`
/// and a SHA-1 signature over the alphabetically sorted parameters followed
/// by the API secret.
use async_trait::async_trait;
use chrono::Utc;
use crypto_core::hash::sha1_hex;
use serde::Deserialize;
use std::time::Duration;

use super::{ImageError, ImageStore};
use crate::config::{CloudinaryConfig, ImageConfig};

const API_BASE: &str = "https://api.cloudinary.com/v1_1";

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

pub struct CloudinaryImageStore {
    http: reqwest::Client,
    credentials: CloudinaryConfig,
    folder: String,
    api_base: String,
}

impl CloudinaryImageStore {
    pub fn new(credentials: CloudinaryConfig, images: &ImageConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(images.request_timeout_ms))
            .build()?;

        Ok(Self {
            http,
            credentials,
            folder: images.folder.clone(),
            api_base: API_BASE.to_string(),
        })
    }

    /// Point the client at a different API root (local stubs)
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    fn sign(&self, params: &[(&str, &str)]) -> String {
        let mut sorted = params.to_vec();
        sorted.sort_by(|a, b| a.0.cmp(b.0));
        let joined = sorted
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");
        sha1_hex(format!("{}{}", joined, self.credentials.api_secret).as_bytes())
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}/{}", self.api_base, self.credentials.cloud_name, path)
    }
}

/// `https://res.cloudinary.com/demo/image/upload/v1/social-media/abc123.jpg`
/// → `social-media/abc123`
pub(crate) fn public_id_from_url(url: &str, folder: &str) -> Option<String> {
    let last = url.trim_end_matches('/').rsplit('/').next()?;
    let stem = last.split('.').next()?;
    if stem.is_empty() {
        return None;
    }
    Some(format!("{}/{}", folder, stem))
}

#[async_trait]
impl ImageStore for CloudinaryImageStore {
    async fn upload(&self, encoded_image: &str) -> Result<String, ImageError> {
        let timestamp = Utc::now().timestamp().to_string();
        let signature = self.sign(&[
            ("folder", self.folder.as_str()),
            ("timestamp", timestamp.as_str()),
        ]);

        let response = self
            .http
            .post(self.endpoint("auto/upload"))
            .form(&[
                ("file", encoded_image),
                ("folder", self.folder.as_str()),
                ("timestamp", timestamp.as_str()),
                ("api_key", self.credentials.api_key.as_str()),
                ("signature", signature.as_str()),
            ])
            .send()
            .await
            .map_err(|e| ImageError::Upload(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ImageError::Upload(format!("HTTP {}: {}", status, body)));
        }

        let uploaded: UploadResponse = response
            .json()
            .await
            .map_err(|e| ImageError::Upload(format!("unexpected response: {}", e)))?;

        tracing::info!(url = %uploaded.secure_url, "image uploaded");
        Ok(uploaded.secure_url)
    }

    async fn delete(&self, url: &str) -> Result<(), ImageError> {
        let public_id = public_id_from_url(url, &self.folder)
            .ok_or_else(|| ImageError::Delete(format!("cannot derive public id from {}", url)))?;
        let timestamp = Utc::now().timestamp().to_string();
        let signature = self.sign(&[
            ("public_id", public_id.as_str()),
            ("timestamp", timestamp.as_str()),
        ]);

        let response = self
            .http
            .post(self.endpoint("image/destroy"))
            .form(&[
                ("public_id", public_id.as_str()),
                ("timestamp", timestamp.as_str()),
                ("api_key", self.credentials.api_key.as_str()),
                ("signature", signature.as_str()),
            ])
            .send()
            .await
            .map_err(|e| ImageError::Delete(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ImageError::Delete(format!("HTTP {}", status)));
        }

        let destroyed: DestroyResponse = response
            .json()
            .await
            .map_err(|e| ImageError::Delete(format!("unexpected response: {}", e)))?;

        match destroyed.result.as_str() {
            // "not found" means it is already gone
            "ok" | "not found" => Ok(()),
            other => Err(ImageError::Delete(other.to_string())),
        }
    }
}
