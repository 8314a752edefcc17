//! GeminiClient - text-to-image generation via the Gemini API.
//!
//! Sends a `generateContent` request with a text prompt and extracts the
//! first inline image payload from the response candidates.

use std::time::Duration;

use base64::Engine;
use serde::{Deserialize, Serialize};

/// The environment variable name for the Gemini API key.
pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Default base URL for the Gemini API.
pub const GEMINI_API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default model for image generation.
pub const DEFAULT_IMAGE_MODEL: &str = "gemini-2.5-flash-image-preview";

/// Default timeout for HTTP requests (60 seconds; image responses are large).
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Default connection timeout (10 seconds).
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Request body for `generateContent`.
#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize)]
struct Content {
    role: String,
    parts: Vec<RequestPart>,
}

#[derive(Debug, Serialize)]
struct RequestPart {
    text: String,
}

/// Response from `generateContent`.
#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

/// A single response part. Text and inline binary parts can be mixed
/// within one candidate; only inline parts carry image data.
#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
    #[serde(rename = "inlineData")]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
struct InlineData {
    #[serde(rename = "mimeType")]
    mime_type: String,
    /// Base64-encoded binary payload.
    data: String,
}

/// A generated image: decoded bytes plus the media type reported by the API.
#[derive(Debug, Clone)]
pub struct GeneratedImage {
    pub data: Vec<u8>,
    pub mime_type: String,
}

impl GeneratedImage {
    /// File extension matching the reported media type.
    pub fn extension(&self) -> &str {
        match self.mime_type.as_str() {
            "image/jpeg" => "jpg",
            "image/webp" => "webp",
            _ => "png",
        }
    }
}

/// Client for the Gemini image generation API.
pub struct GeminiClient {
    api_key: String,
    base_url: String,
    model: String,
    http_client: reqwest::Client,
}

impl GeminiClient {
    /// Create a new GeminiClient by reading the API key from the environment.
    ///
    /// # Errors
    ///
    /// Returns `GeminiError::MissingApiKey` if the `GEMINI_API_KEY`
    /// environment variable is not set.
    pub fn new() -> Result<Self, GeminiError> {
        let api_key = std::env::var(GEMINI_API_KEY_ENV).map_err(|_| GeminiError::MissingApiKey)?;
        Self::with_api_key(api_key)
    }

    /// Create a new GeminiClient with an explicit API key.
    pub fn with_api_key(api_key: String) -> Result<Self, GeminiError> {
        Self::build(api_key, GEMINI_API_BASE_URL.to_string(), DEFAULT_IMAGE_MODEL.to_string())
    }

    /// Create a new GeminiClient with a custom base URL.
    ///
    /// Useful for testing against a mock server.
    pub fn with_base_url(api_key: String, base_url: String) -> Result<Self, GeminiError> {
        Self::build(api_key, base_url, DEFAULT_IMAGE_MODEL.to_string())
    }

    /// Create a new GeminiClient with a custom model.
    pub fn with_model(api_key: String, model: String) -> Result<Self, GeminiError> {
        Self::build(api_key, GEMINI_API_BASE_URL.to_string(), model)
    }

    fn build(api_key: String, base_url: String, model: String) -> Result<Self, GeminiError> {
        if api_key.is_empty() {
            return Err(GeminiError::MissingApiKey);
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

    /// Generate an image from a text prompt.
    ///
    /// Sends a `generateContent` request and scans the first candidate's
    /// parts for an inline binary payload.
    ///
    /// # Errors
    ///
    /// Returns `GeminiError::EmptyPrompt` if the prompt is blank,
    /// `GeminiError::NoImage` if the response contains no candidates or no
    /// inline image part, `GeminiError::ApiError` for non-success responses,
    /// or `GeminiError::HttpError` if the request fails.
    pub async fn generate_image(&self, prompt: &str) -> Result<GeneratedImage, GeminiError> {
        if prompt.trim().is_empty() {
            return Err(GeminiError::EmptyPrompt);
        }

        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );

        let request_body = GenerateContentRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![RequestPart {
                    text: prompt.to_string(),
                }],
            }],
        };

        log::info!("Requesting image generation from model {}", self.model);

        let response = self
            .http_client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&request_body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(GeminiError::ApiError(format!(
                "Image request failed with status {}: {}",
                status, error_text
            )));
        }

        let content_response: GenerateContentResponse = response.json().await?;

        let candidate = content_response
            .candidates
            .into_iter()
            .next()
            .ok_or(GeminiError::NoImage)?;

        let parts = candidate
            .content
            .map(|c| c.parts)
            .unwrap_or_default();

        // The model may interleave commentary text with the image part.
        let inline = parts
            .into_iter()
            .find_map(|part| {
                if let Some(text) = &part.text {
                    log::debug!("Skipping text part: {}", text);
                }
                part.inline_data
            })
            .ok_or(GeminiError::NoImage)?;

        let data = base64::engine::general_purpose::STANDARD
            .decode(inline.data.as_bytes())
            .map_err(GeminiError::DecodeError)?;

        log::info!(
            "Image generated ({} bytes, {})",
            data.len(),
            inline.mime_type
        );

        Ok(GeneratedImage {
            data,
            mime_type: inline.mime_type,
        })
    }
}

/// Errors that can occur during Gemini operations.
#[derive(Debug, thiserror::Error)]
pub enum GeminiError {
    #[error("API key not configured")]
    MissingApiKey,

    #[error("Empty prompt")]
    EmptyPrompt,

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Response contained no image data")]
    NoImage,

    #[error("Failed to decode image payload: {0}")]
    DecodeError(base64::DecodeError),
}
