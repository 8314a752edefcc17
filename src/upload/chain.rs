//! Ordered fallback chain over [`Uploader`] implementations.

use super::{Catbox, FileIo, TmpFiles, UploadError, Uploader};

/// A successful upload: which service accepted it and the public URL.
#[derive(Debug, Clone, PartialEq)]
pub struct Upload {
    pub service: String,
    pub url: String,
}

/// Tries each uploader in order; the first non-empty URL wins.
///
/// Per-service failures (network errors, non-200 responses, malformed
/// payloads) are logged and the chain advances. Services after the first
/// success are never contacted.
pub struct UploadChain {
    uploaders: Vec<Box<dyn Uploader>>,
}

impl UploadChain {
    pub fn new(uploaders: Vec<Box<dyn Uploader>>) -> Self {
        Self { uploaders }
    }

    /// The default chain: tmpfiles.org, then catbox.moe, then file.io.
    pub fn with_default_services() -> Result<Self, UploadError> {
        Ok(Self::new(vec![
            Box::new(TmpFiles::new()?),
            Box::new(Catbox::new()?),
            Box::new(FileIo::new()?),
        ]))
    }

    pub fn len(&self) -> usize {
        self.uploaders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.uploaders.is_empty()
    }

    /// Upload `bytes` under `file_name`, falling through the chain.
    ///
    /// # Errors
    ///
    /// Returns `UploadError::AllServicesFailed` if no service accepted the
    /// upload.
    pub async fn upload(&self, file_name: &str, bytes: &[u8]) -> Result<Upload, UploadError> {
        for uploader in &self.uploaders {
            log::info!("Trying {}...", uploader.name());

            match uploader.upload(file_name, bytes.to_vec()).await {
                Ok(url) if !url.trim().is_empty() => {
                    log::info!("Uploaded to {}: {}", uploader.name(), url);
                    return Ok(Upload {
                        service: uploader.name().to_string(),
                        url,
                    });
                }
                Ok(_) => {
                    log::warn!("{} returned an empty URL, trying next service", uploader.name());
                }
                Err(e) => {
                    log::warn!("{} failed: {}, trying next service", uploader.name(), e);
                }
            }
        }

        Err(UploadError::AllServicesFailed {
            attempted: self.uploaders.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct FixedUploader {
        name: &'static str,
        result: Result<String, ()>,
    }

    #[async_trait]
    impl Uploader for FixedUploader {
        fn name(&self) -> &str {
            self.name
        }

        async fn upload(&self, _file_name: &str, _bytes: Vec<u8>) -> Result<String, UploadError> {
            match &self.result {
                Ok(url) => Ok(url.clone()),
                Err(()) => Err(UploadError::ServiceError {
                    service: self.name.to_string(),
                    message: "down".to_string(),
                }),
            }
        }
    }

    #[tokio::test]
    async fn test_first_success_wins() {
        let chain = UploadChain::new(vec![
            Box::new(FixedUploader {
                name: "a",
                result: Ok("https://a.example/f.png".to_string()),
            }),
            Box::new(FixedUploader {
                name: "b",
                result: Ok("https://b.example/f.png".to_string()),
            }),
        ]);

        let upload = chain.upload("f.png", b"data").await.unwrap();
        assert_eq!(upload.service, "a");
        assert_eq!(upload.url, "https://a.example/f.png");
    }

    #[tokio::test]
    async fn test_failure_advances_to_next_service() {
        let chain = UploadChain::new(vec![
            Box::new(FixedUploader {
                name: "a",
                result: Err(()),
            }),
            Box::new(FixedUploader {
                name: "b",
                result: Ok("https://b.example/f.png".to_string()),
            }),
        ]);

        let upload = chain.upload("f.png", b"data").await.unwrap();
        assert_eq!(upload.service, "b");
    }

    #[tokio::test]
    async fn test_empty_url_counts_as_failure() {
        let chain = UploadChain::new(vec![
            Box::new(FixedUploader {
                name: "a",
                result: Ok("  ".to_string()),
            }),
            Box::new(FixedUploader {
                name: "b",
                result: Ok("https://b.example/f.png".to_string()),
            }),
        ]);

        let upload = chain.upload("f.png", b"data").await.unwrap();
        assert_eq!(upload.service, "b");
    }

    #[tokio::test]
    async fn test_all_failed_reports_attempt_count() {
        let chain = UploadChain::new(vec![
            Box::new(FixedUploader {
                name: "a",
                result: Err(()),
            }),
            Box::new(FixedUploader {
                name: "b",
                result: Err(()),
            }),
            Box::new(FixedUploader {
                name: "c",
                result: Err(()),
            }),
        ]);

        let err = chain.upload("f.png", b"data").await.unwrap_err();
        assert!(matches!(err, UploadError::AllServicesFailed { attempted: 3 }));
    }

    #[tokio::test]
    async fn test_empty_chain_fails() {
        let chain = UploadChain::new(vec![]);
        let err = chain.upload("f.png", b"data").await.unwrap_err();
        assert!(matches!(err, UploadError::AllServicesFailed { attempted: 0 }));
    }
}
