//! Luma Dream Machine integration.
//!
//! Submits image-to-video generations, polls them to a terminal state,
//! and downloads the finished clip.

mod client;
mod retry;

pub use client::{
    Generation, GenerationState, LumaClient, LumaError, DEFAULT_MAX_POLL_ATTEMPTS,
    DEFAULT_POLL_INTERVAL, DEFAULT_VIDEO_MODEL, LUMA_API_BASE_URL, LUMA_API_KEY_ENV,
};
pub use retry::{backoff_delay, is_transient, SUBMIT_BACKOFF_BASE, SUBMIT_BACKOFF_MAX, SUBMIT_RETRIES};
