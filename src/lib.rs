//! animatic library crate.
//!
//! This module exposes the internal components for integration testing.

pub mod config;
pub mod gemini;
pub mod luma;
pub mod pipeline;
pub mod serve;
pub mod upload;
