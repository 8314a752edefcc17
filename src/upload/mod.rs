//! Public file-host upload with a fallback chain.
//!
//! Each hosting service implements the [`Uploader`] trait; the
//! [`UploadChain`] tries them in order until one returns a usable public
//! URL. Per-service failures advance the chain rather than abort it.

mod catbox;
mod chain;
mod fileio;
mod tmpfiles;

use std::time::Duration;

use async_trait::async_trait;

pub use catbox::Catbox;
pub use chain::{Upload, UploadChain};
pub use fileio::FileIo;
pub use tmpfiles::TmpFiles;

/// Default timeout for upload requests (60 seconds; uploads carry a body).
pub(crate) const UPLOAD_TIMEOUT: Duration = Duration::from_secs(60);

/// Default connection timeout (10 seconds).
pub(crate) const UPLOAD_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

pub(crate) fn default_http_client() -> Result<reqwest::Client, UploadError> {
    Ok(reqwest::Client::builder()
        .timeout(UPLOAD_TIMEOUT)
        .connect_timeout(UPLOAD_CONNECT_TIMEOUT)
        .build()?)
}

/// A file hosting service that accepts an upload and returns a public URL.
#[async_trait]
pub trait Uploader: Send + Sync {
    /// Human-readable service name, used in logs and results.
    fn name(&self) -> &str;

    /// Upload the given bytes under `file_name` and return the public URL.
    async fn upload(&self, file_name: &str, bytes: Vec<u8>) -> Result<String, UploadError>;
}

/// Errors that can occur during uploads.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("{service} rejected the upload: {message}")]
    ServiceError { service: String, message: String },

    #[error("All {attempted} upload services failed")]
    AllServicesFailed { attempted: usize },
}
