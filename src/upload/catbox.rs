//! catbox.moe uploader.

use async_trait::async_trait;

use super::{default_http_client, UploadError, Uploader};

/// Default upload endpoint for catbox.moe.
pub const CATBOX_ENDPOINT: &str = "https://catbox.moe/user/api.php";

/// Uploader for catbox.moe.
///
/// The API takes a `reqtype=fileupload` form field alongside the file and
/// answers with the bare URL as plain text.
pub struct Catbox {
    endpoint: String,
    http_client: reqwest::Client,
}

impl Catbox {
    pub fn new() -> Result<Self, UploadError> {
        Self::with_endpoint(CATBOX_ENDPOINT.to_string())
    }

    /// Create an uploader pointed at a custom endpoint (for mock servers).
    pub fn with_endpoint(endpoint: String) -> Result<Self, UploadError> {
        Ok(Self {
            endpoint,
            http_client: default_http_client()?,
        })
    }
}

#[async_trait]
impl Uploader for Catbox {
    fn name(&self) -> &str {
        "catbox.moe"
    }

    async fn upload(&self, file_name: &str, bytes: Vec<u8>) -> Result<String, UploadError> {
        let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name.to_string());
        let form = reqwest::multipart::Form::new()
            .text("reqtype", "fileupload")
            .part("fileToUpload", part);

        let response = self
            .http_client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(UploadError::ServiceError {
                service: self.name().to_string(),
                message: format!("status {}", response.status()),
            });
        }

        let url = response.text().await?.trim().to_string();
        if url.is_empty() {
            return Err(UploadError::ServiceError {
                service: self.name().to_string(),
                message: "response body was empty".to_string(),
            });
        }

        Ok(url)
    }
}
