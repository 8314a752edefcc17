//! tmpfiles.org uploader.

use async_trait::async_trait;
use serde::Deserialize;

use super::{default_http_client, UploadError, Uploader};

/// Default upload endpoint for tmpfiles.org.
pub const TMPFILES_ENDPOINT: &str = "https://tmpfiles.org/api/v1/upload";

/// Response from the tmpfiles.org upload API.
#[derive(Debug, Deserialize)]
struct TmpFilesResponse {
    status: String,
    data: Option<TmpFilesData>,
}

#[derive(Debug, Deserialize)]
struct TmpFilesData {
    url: String,
}

/// Uploader for tmpfiles.org.
///
/// The API returns a landing-page URL; [`direct_download_url`] rewrites it
/// to the `/dl/` variant so downstream services can fetch the raw file.
pub struct TmpFiles {
    endpoint: String,
    http_client: reqwest::Client,
}

impl TmpFiles {
    pub fn new() -> Result<Self, UploadError> {
        Self::with_endpoint(TMPFILES_ENDPOINT.to_string())
    }

    /// Create an uploader pointed at a custom endpoint (for mock servers).
    pub fn with_endpoint(endpoint: String) -> Result<Self, UploadError> {
        Ok(Self {
            endpoint,
            http_client: default_http_client()?,
        })
    }
}

/// Rewrite a tmpfiles.org landing URL into its direct-download form.
///
/// `https://tmpfiles.org/12345/f.png` becomes
/// `https://tmpfiles.org/dl/12345/f.png`.
pub fn direct_download_url(url: &str) -> String {
    url.replacen("tmpfiles.org/", "tmpfiles.org/dl/", 1)
}

#[async_trait]
impl Uploader for TmpFiles {
    fn name(&self) -> &str {
        "tmpfiles.org"
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

        let body: TmpFilesResponse = response.json().await?;
        if body.status != "success" {
            return Err(UploadError::ServiceError {
                service: self.name().to_string(),
                message: format!("upload status was '{}'", body.status),
            });
        }

        let url = body
            .data
            .map(|d| d.url)
            .ok_or_else(|| UploadError::ServiceError {
                service: self.name().to_string(),
                message: "response contained no URL".to_string(),
            })?;

        Ok(direct_download_url(&url))
    }
}
