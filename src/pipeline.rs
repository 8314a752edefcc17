//! End-to-end prompt-to-video pipeline.
//!
//! Wires the image generator, the upload fallback chain, the optional
//! local fallback server, and the video generator into one sequential
//! run. Each stage's failure semantics follow the same rule: recover
//! inside a stage where a fallback exists, abort the run otherwise.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::gemini::{GeminiClient, GeminiError};
use crate::luma::{LumaClient, LumaError, DEFAULT_MAX_POLL_ATTEMPTS, DEFAULT_POLL_INTERVAL};
use crate::serve::{ServeError, StaticServer, DEFAULT_SERVE_PORT};
use crate::upload::{Upload, UploadChain, UploadError};

/// Default text prompt for the still image.
pub const DEFAULT_IMAGE_PROMPT: &str = "A simple cartoon drawing of a cute orange cat sitting on \
    grass. Clean, minimal illustration with soft pastel colors. Child-friendly artwork.";

/// Default motion prompt for the video generation.
pub const DEFAULT_VIDEO_PROMPT: &str = "A cute cat gently swaying in a soft breeze";

/// Default file name for the saved image.
pub const DEFAULT_IMAGE_OUTPUT: &str = "generated_image.png";

/// Tunable pipeline parameters, resolved from CLI flags and config file.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub image_prompt: String,
    pub video_prompt: String,
    /// File name for the saved image inside `output_dir`.
    pub image_output: String,
    pub output_dir: PathBuf,
    pub poll_interval: Duration,
    pub max_poll_attempts: u32,
    /// Serve `output_dir` locally when all public uploads fail.
    pub serve_fallback: bool,
    pub serve_port: u16,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            image_prompt: DEFAULT_IMAGE_PROMPT.to_string(),
            video_prompt: DEFAULT_VIDEO_PROMPT.to_string(),
            image_output: DEFAULT_IMAGE_OUTPUT.to_string(),
            output_dir: PathBuf::from("."),
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_poll_attempts: DEFAULT_MAX_POLL_ATTEMPTS,
            serve_fallback: false,
            serve_port: DEFAULT_SERVE_PORT,
        }
    }
}

/// What a completed run produced.
#[derive(Debug)]
pub struct PipelineOutcome {
    pub image_path: PathBuf,
    /// None when the image was served from the local fallback server.
    pub upload: Option<Upload>,
    pub video_path: PathBuf,
}

/// The prompt-to-video pipeline.
pub struct Pipeline {
    gemini: GeminiClient,
    uploads: UploadChain,
    luma: LumaClient,
    options: PipelineOptions,
}

impl Pipeline {
    pub fn new(
        gemini: GeminiClient,
        uploads: UploadChain,
        luma: LumaClient,
        options: PipelineOptions,
    ) -> Self {
        Self {
            gemini,
            uploads,
            luma,
            options,
        }
    }

    /// Run the full pipeline: image, upload, video, download.
    ///
    /// Checks `cancel` at every polling step; a set flag surfaces as
    /// `LumaError::Cancelled`.
    ///
    /// # Errors
    ///
    /// Propagates the first fatal stage error: a missing image aborts
    /// before any upload, a fully failed upload chain aborts before any
    /// video call (unless the local fallback server is enabled), and a
    /// failed generation carries the remote failure reason.
    pub async fn run(&self, cancel: &AtomicBool) -> Result<PipelineOutcome, PipelineError> {
        // Stage 1: image generation. No image means nothing to animate.
        let image = self.gemini.generate_image(&self.options.image_prompt).await?;

        tokio::fs::create_dir_all(&self.options.output_dir).await?;
        let image_path = self.options.output_dir.join(&self.options.image_output);
        tokio::fs::write(&image_path, &image.data).await?;
        log::info!("Image saved to {}", image_path.display());

        // Stage 2: publish the image at a URL the video API can fetch.
        let mut fallback_server = None;
        let (upload, image_url) = match self
            .uploads
            .upload(&self.options.image_output, &image.data)
            .await
        {
            Ok(upload) => {
                let url = upload.url.clone();
                (Some(upload), url)
            }
            Err(e @ UploadError::AllServicesFailed { .. }) if self.options.serve_fallback => {
                log::warn!("{}; falling back to local static server", e);
                let server =
                    StaticServer::bind(&self.options.output_dir, self.options.serve_port).await?;
                let url = server.url_for(&self.options.image_output);
                fallback_server = Some(server);
                (None, url)
            }
            Err(e) => return Err(e.into()),
        };
        log::info!("Keyframe image URL: {}", image_url);

        // Stage 3: video generation against the published image.
        let result = self.animate(&image_url, cancel).await;

        if let Some(server) = fallback_server {
            server.shutdown().await;
        }

        let video_path = result?;
        Ok(PipelineOutcome {
            image_path,
            upload,
            video_path,
        })
    }

    /// Submit, poll, and download a generation for an already-public image.
    pub async fn animate(
        &self,
        image_url: &str,
        cancel: &AtomicBool,
    ) -> Result<PathBuf, PipelineError> {
        let generation = self
            .luma
            .create_generation_with_retry(&self.options.video_prompt, image_url)
            .await?;

        let video_url = self
            .luma
            .poll_until_complete(
                &generation.id,
                self.options.poll_interval,
                self.options.max_poll_attempts,
                cancel,
            )
            .await?;

        let dest = self
            .options
            .output_dir
            .join(format!("{}.mp4", generation.id));
        let path = self.luma.download_video(&video_url, &dest).await?;
        log::info!("Video downloaded to {}", path.display());
        Ok(path)
    }
}

/// Errors that can abort a pipeline run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Image generation failed: {0}")]
    Image(#[from] GeminiError),

    #[error("Upload failed: {0}")]
    Upload(#[from] UploadError),

    #[error("Video generation failed: {0}")]
    Video(#[from] LumaError),

    #[error("Local server failed: {0}")]
    Serve(#[from] ServeError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Create a cancellation flag and wire it to Ctrl+C.
///
/// Registration can fail (handlers can only be installed once per
/// process); the flag is still usable, it just never fires.
pub fn setup_cancel_flag() -> Arc<AtomicBool> {
    let flag = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&flag);
    if let Err(e) = ctrlc::set_handler(move || {
        handler_flag.store(true, Ordering::SeqCst);
    }) {
        log::warn!("Could not install Ctrl+C handler: {}", e);
    }
    flag
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options_match_script_behaviour() {
        let options = PipelineOptions::default();
        assert_eq!(options.image_output, "generated_image.png");
        assert_eq!(options.poll_interval, Duration::from_secs(3));
        assert_eq!(options.output_dir, PathBuf::from("."));
        assert!(!options.serve_fallback);
    }

    #[test]
    fn test_cancel_flag_starts_unset() {
        let flag = setup_cancel_flag();
        assert!(!flag.load(Ordering::SeqCst));
    }
}
