//! Configuration file handling for animatic.
//!
//! Loads configuration from `~/.config/animatic/config.toml` or a custom
//! path. Every value is optional; CLI flags override the file, and
//! built-in defaults cover the rest.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Configuration file structure for animatic.
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub image: ImageConfig,
    #[serde(default)]
    pub video: VideoConfig,
    #[serde(default)]
    pub serve: ServeConfig,
}

#[derive(Debug, Deserialize, Default)]
pub struct ImageConfig {
    pub model: Option<String>,
    pub prompt: Option<String>,
    /// File name for the saved image, relative to the output directory.
    pub output: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct VideoConfig {
    pub model: Option<String>,
    pub prompt: Option<String>,
    pub poll_interval_secs: Option<u64>,
    pub max_poll_attempts: Option<u32>,
    pub output_dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
pub struct ServeConfig {
    #[serde(default)]
    pub enabled: bool,
    pub port: Option<u16>,
}

impl Config {
    /// Load configuration from a file path.
    /// Returns default config if the file doesn't exist.
    /// Returns an error if the file exists but cannot be parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path.map(PathBuf::from).unwrap_or_else(default_path);

        if path.exists() {
            let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::IoError {
                path: path.clone(),
                source,
            })?;
            let config: Config =
                toml::from_str(&content).map_err(|source| ConfigError::ParseError {
                    path: path.clone(),
                    source,
                })?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Get the default config file path.
pub fn default_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".config")
        })
        .join("animatic")
        .join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.toml");
        let config = Config::load(Some(&path)).unwrap();
        assert!(config.image.model.is_none());
        assert!(!config.serve.enabled);
    }

    #[test]
    fn test_full_file_parses() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[image]
model = "gemini-2.5-flash-image-preview"
prompt = "a cat"
output = "cat.png"

[video]
model = "ray-flash-2"
prompt = "swaying"
poll_interval_secs = 5
max_poll_attempts = 40
output_dir = "clips"

[serve]
enabled = true
port = 9000
"#,
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.image.prompt.as_deref(), Some("a cat"));
        assert_eq!(config.image.output.as_deref(), Some("cat.png"));
        assert_eq!(config.video.poll_interval_secs, Some(5));
        assert_eq!(config.video.max_poll_attempts, Some(40));
        assert_eq!(config.video.output_dir, Some(PathBuf::from("clips")));
        assert!(config.serve.enabled);
        assert_eq!(config.serve.port, Some(9000));
    }

    #[test]
    fn test_partial_file_leaves_rest_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[video]\npoll_interval_secs = 10\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.video.poll_interval_secs, Some(10));
        assert!(config.video.model.is_none());
        assert!(config.image.prompt.is_none());
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[image\nbroken").unwrap();

        let result = Config::load(Some(&path));
        assert!(matches!(result, Err(ConfigError::ParseError { .. })));
    }
}
