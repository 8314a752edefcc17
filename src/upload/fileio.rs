//! file.io uploader.

use async_trait::async_trait;
use serde::Deserialize;

use super::{default_http_client, UploadError, Uploader};

/// Default upload endpoint for file.io.
pub const FILE_IO_ENDPOINT: &str = "https://file.io";

/// Response from the file.io upload API.
#[derive(Debug, Deserialize)]
struct FileIoResponse {
    #[serde(default)]
    success: bool,
    link: Option<String>,
}

/// Uploader for file.io.
pub struct FileIo {
    endpoint: String,
    http_client: reqwest::Client,
}

impl FileIo {
    pub fn new() -> Result<Self, UploadError> {
        Self::with_endpoint(FILE_IO_ENDPOINT.to_string())
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
impl Uploader for FileIo {
    fn name(&self) -> &str {
        "file.io"
    }

    async fn upload(&self, file_name: &str, bytes: Vec<u8>) -> Result<String, UploadError> {
        let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name.to_string());
        let form = reqwest::multipart::Form::new().part("file", part);

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

        let body: FileIoResponse = response.json().await?;
        if !body.success {
            return Err(UploadError::ServiceError {
                service: self.name().to_string(),
                message: "upload was not successful".to_string(),
            });
        }

        body.link.ok_or_else(|| UploadError::ServiceError {
            service: self.name().to_string(),
            message: "response contained no link".to_string(),
        })
    }
}
