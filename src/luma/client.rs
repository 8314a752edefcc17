//! LumaClient - handles communication with the Luma Dream Machine API.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;

use super::retry::{
    backoff_delay, is_transient, parse_retry_after, SUBMIT_BACKOFF_BASE, SUBMIT_BACKOFF_MAX,
    SUBMIT_RETRIES,
};

/// The environment variable name for the Luma API key.
pub const LUMA_API_KEY_ENV: &str = "LUMA_API_KEY";

/// Default base URL for the Dream Machine API.
pub const LUMA_API_BASE_URL: &str = "https://api.lumalabs.ai/dream-machine/v1";

/// Default model for image-to-video generation.
pub const DEFAULT_VIDEO_MODEL: &str = "ray-flash-2";

/// Default polling interval for status checks (3 seconds).
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Default cap on status polls before giving up (100 polls at 3s = 5 minutes).
pub const DEFAULT_MAX_POLL_ATTEMPTS: u32 = 100;

/// Default timeout for HTTP requests (30 seconds).
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default connection timeout (10 seconds).
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP status code for rate limiting.
const HTTP_STATUS_TOO_MANY_REQUESTS: u16 = 429;

/// Request body for creating a generation.
#[derive(Debug, Serialize)]
struct CreateGenerationRequest {
    model: String,
    prompt: String,
    keyframes: Keyframes,
}

/// Keyframe map; `frame0` anchors the first frame of the clip.
#[derive(Debug, Serialize)]
struct Keyframes {
    frame0: Keyframe,
}

#[derive(Debug, Serialize)]
struct Keyframe {
    #[serde(rename = "type")]
    kind: String,
    url: String,
}

/// A generation record as returned by the API.
#[derive(Debug, Deserialize)]
pub struct Generation {
    pub id: String,
    #[serde(default)]
    state: String,
    #[serde(default)]
    failure_reason: Option<String>,
    #[serde(default)]
    assets: Option<Assets>,
}

#[derive(Debug, Deserialize)]
struct Assets {
    video: Option<String>,
}

/// State of a video generation, folded to the states the pipeline acts on.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationState {
    /// Queued or still rendering.
    Pending,
    /// Finished; the video is ready to download.
    Completed { video_url: String },
    /// Terminally failed on the remote side.
    Failed { reason: String },
}

impl Generation {
    /// Fold the remote state string into a [`GenerationState`].
    ///
    /// # Errors
    ///
    /// Returns `LumaError::ApiError` for an unrecognized state, or a
    /// completed generation with no video asset.
    pub fn generation_state(&self) -> Result<GenerationState, LumaError> {
        match self.state.as_str() {
            "queued" | "dreaming" | "pending" => Ok(GenerationState::Pending),
            "completed" => {
                let video_url = self
                    .assets
                    .as_ref()
                    .and_then(|a| a.video.clone())
                    .ok_or_else(|| {
                        LumaError::ApiError(
                            "Generation completed but no video URL in response".to_string(),
                        )
                    })?;
                Ok(GenerationState::Completed { video_url })
            }
            "failed" => Ok(GenerationState::Failed {
                reason: self
                    .failure_reason
                    .clone()
                    .unwrap_or_else(|| "Unknown failure".to_string()),
            }),
            unknown => Err(LumaError::ApiError(format!(
                "Unknown generation state: {}",
                unknown
            ))),
        }
    }
}

/// Client for the Luma Dream Machine API.
pub struct LumaClient {
    api_key: String,
    base_url: String,
    model: String,
    http_client: reqwest::Client,
}

impl LumaClient {
    /// Create a new LumaClient by reading the API key from the environment.
    ///
    /// # Errors
    ///
    /// Returns `LumaError::MissingApiKey` if the `LUMA_API_KEY` environment
    /// variable is not set.
    pub fn new() -> Result<Self, LumaError> {
        let api_key = std::env::var(LUMA_API_KEY_ENV).map_err(|_| LumaError::MissingApiKey)?;
        Self::with_api_key(api_key)
    }

    /// Create a new LumaClient with an explicit API key.
    pub fn with_api_key(api_key: String) -> Result<Self, LumaError> {
        Self::build(api_key, LUMA_API_BASE_URL.to_string(), DEFAULT_VIDEO_MODEL.to_string())
    }

    /// Create a new LumaClient with a custom base URL.
    ///
    /// Useful for testing against a mock server.
    pub fn with_base_url(api_key: String, base_url: String) -> Result<Self, LumaError> {
        Self::build(api_key, base_url, DEFAULT_VIDEO_MODEL.to_string())
    }

    /// Create a new LumaClient with a custom model.
    pub fn with_model(api_key: String, model: String) -> Result<Self, LumaError> {
        Self::build(api_key, LUMA_API_BASE_URL.to_string(), model)
    }

    fn build(api_key: String, base_url: String, model: String) -> Result<Self, LumaError> {
        if api_key.is_empty() {
            return Err(LumaError::MissingApiKey);
        }

        let http_client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()?;

        Ok(Self {
            api_key,
            base_url,
            model,
            http_client,
        })
    }

    /// Set the model, replacing the default.
    pub fn set_model(&mut self, model: String) {
        self.model = model;
    }

    /// Get the API key.
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get the model.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Submit an image-to-video generation.
    ///
    /// The image URL becomes keyframe `frame0`; the prompt describes the
    /// motion. Returns the generation record carrying the id to poll.
    ///
    /// # Errors
    ///
    /// Returns `LumaError::EmptyPrompt` if the prompt is blank,
    /// `LumaError::RateLimit` on a 429 response, `LumaError::ApiError` for
    /// other non-success responses, or `LumaError::HttpError` if the request
    /// fails.
    pub async fn create_generation(
        &self,
        prompt: &str,
        image_url: &str,
    ) -> Result<Generation, LumaError> {
        if prompt.trim().is_empty() {
            return Err(LumaError::EmptyPrompt);
        }

        let url = format!("{}/generations", self.base_url);

        let request_body = CreateGenerationRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            keyframes: Keyframes {
                frame0: Keyframe {
                    kind: "image".to_string(),
                    url: image_url.to_string(),
                },
            },
        };

        let response = self
            .http_client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request_body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();

            if status.as_u16() == HTTP_STATUS_TOO_MANY_REQUESTS {
                let retry_after_secs = parse_retry_after(&response);
                let error_text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Rate limit exceeded".to_string());
                log::warn!(
                    "Rate limited by Luma API. Retry-After: {:?} seconds",
                    retry_after_secs
                );
                return Err(LumaError::RateLimit {
                    message: error_text,
                    retry_after_secs,
                });
            }

            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(LumaError::ApiError(format!(
                "Generation request failed with status {}: {}",
                status, error_text
            )));
        }

        let generation: Generation = response.json().await?;
        log::info!("Generation submitted, id: {}", generation.id);
        Ok(generation)
    }

    /// Submit a generation, retrying transient network errors and rate
    /// limits with exponential backoff.
    pub async fn create_generation_with_retry(
        &self,
        prompt: &str,
        image_url: &str,
    ) -> Result<Generation, LumaError> {
        let mut attempt = 0u32;

        loop {
            let error = match self.create_generation(prompt, image_url).await {
                Ok(generation) => return Ok(generation),
                Err(e) => e,
            };

            // Server-suggested delay for rate limits, None for transient
            // network errors; anything else is permanent.
            let retry_after: Option<Option<Duration>> = match &error {
                LumaError::RateLimit { retry_after_secs, .. } => Some(
                    retry_after_secs
                        .map(Duration::from_secs)
                        .map(|d| d.min(SUBMIT_BACKOFF_MAX)),
                ),
                LumaError::HttpError(http_err) if is_transient(http_err) => Some(None),
                _ => None,
            };
            let Some(retry_after) = retry_after else {
                return Err(error);
            };

            if attempt >= SUBMIT_RETRIES {
                log::error!("Submission failed after {} attempts: {}", attempt + 1, error);
                return Err(error);
            }

            let delay = retry_after
                .unwrap_or_else(|| backoff_delay(attempt, SUBMIT_BACKOFF_BASE, SUBMIT_BACKOFF_MAX));
            log::warn!(
                "Submission attempt {}/{} failed: {}. Retrying in {:?}...",
                attempt + 1,
                SUBMIT_RETRIES + 1,
                error,
                delay
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    /// Fetch the current state of a generation.
    pub async fn get_generation(&self, id: &str) -> Result<Generation, LumaError> {
        let url = format!("{}/generations/{}", self.base_url, id);

        let response = self
            .http_client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(LumaError::ApiError(format!(
                "Status check failed with status {}: {}",
                status, error_text
            )));
        }

        Ok(response.json().await?)
    }

    /// Poll a generation until it reaches a terminal state.
    ///
    /// Issues one status fetch per attempt, sleeping `interval` between
    /// attempts, and stops when the generation completes, fails, the attempt
    /// budget is spent, or `cancel` is set.
    ///
    /// # Errors
    ///
    /// Returns `LumaError::GenerationFailed` carrying the remote failure
    /// reason, `LumaError::Timeout` when attempts are exhausted, or
    /// `LumaError::Cancelled` when the cancel flag is observed.
    pub async fn poll_until_complete(
        &self,
        id: &str,
        interval: Duration,
        max_attempts: u32,
        cancel: &AtomicBool,
    ) -> Result<String, LumaError> {
        for attempt in 0..max_attempts {
            if cancel.load(Ordering::SeqCst) {
                log::info!("Polling cancelled after {} attempts", attempt);
                return Err(LumaError::Cancelled);
            }

            let generation = self.get_generation(id).await?;
            match generation.generation_state()? {
                GenerationState::Pending => {
                    log::debug!("Generation {} still pending (attempt {})", id, attempt + 1);
                }
                GenerationState::Completed { video_url } => {
                    log::info!("Generation {} complete", id);
                    return Ok(video_url);
                }
                GenerationState::Failed { reason } => {
                    log::error!("Generation {} failed: {}", id, reason);
                    return Err(LumaError::GenerationFailed { reason });
                }
            }

            // Skip the final sleep once the budget is spent.
            if attempt + 1 < max_attempts {
                tokio::time::sleep(interval).await;
            }
        }

        Err(LumaError::Timeout {
            attempts: max_attempts,
        })
    }

    /// Download a video file from a URL to disk.
    ///
    /// Streams the body to disk chunk by chunk so large clips never sit
    /// fully in memory.
    pub async fn download_video(&self, url: &str, dest: &Path) -> Result<PathBuf, LumaError> {
        if let Some(parent) = dest.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let response = self.http_client.get(url).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(LumaError::ApiError(format!(
                "Video download failed with status {}: {}",
                status, error_text
            )));
        }

        let mut file = tokio::fs::File::create(dest).await?;
        let mut stream = response.bytes_stream();

        use futures_util::StreamExt;
        while let Some(chunk_result) = stream.next().await {
            let chunk = chunk_result?;
            file.write_all(&chunk).await?;
        }

        file.flush().await?;

        Ok(dest.to_path_buf())
    }
}

/// Errors that can occur during Luma operations.
#[derive(Debug, thiserror::Error)]
pub enum LumaError {
    #[error("API key not configured")]
    MissingApiKey,

    #[error("Empty prompt")]
    EmptyPrompt,

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Generation failed: {reason}")]
    GenerationFailed { reason: String },

    #[error("Rate limited: {message}")]
    RateLimit {
        message: String,
        retry_after_secs: Option<u64>,
    },

    #[error("Generation did not finish within {attempts} polls")]
    Timeout { attempts: u32 },

    #[error("Cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
