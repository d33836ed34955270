use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::eval::DEFAULT_TOLERANCE;
use crate::hub;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// GCS bucket holding the generated images
    #[serde(default)]
    pub bucket: Option<String>,

    /// Object prefix within the bucket
    #[serde(default)]
    pub prefix: String,

    /// Local directory to sample from instead of GCS
    #[serde(default)]
    pub images_dir: Option<PathBuf>,

    #[serde(default = "default_max_images")]
    pub max_images: usize,

    /// Absolute closeness tolerance between backend means
    #[serde(default = "default_tolerance")]
    pub tolerance: f32,

    /// RNG seed; omit for a fresh sample each run
    #[serde(default)]
    pub seed: Option<u64>,

    #[serde(default = "default_models_dir")]
    pub models_dir: PathBuf,

    /// Directory for log files; logs go to stderr only when unset
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

fn default_max_images() -> usize {
    30
}

fn default_tolerance() -> f32 {
    DEFAULT_TOLERANCE
}

fn default_models_dir() -> PathBuf {
    hub::default_models_dir()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bucket: None,
            prefix: String::new(),
            images_dir: None,
            max_images: default_max_images(),
            tolerance: default_tolerance(),
            seed: None,
            models_dir: default_models_dir(),
            log_dir: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            // Create default config
            let config = Config::default();
            config.save()?;
            Ok(config)
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path();

        // Ensure parent directory exists
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;

        Ok(())
    }

    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("clipscore")
    }

    fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.max_images, 30);
        assert!((config.tolerance - 1e-3).abs() < f32::EPSILON);
        assert!(config.bucket.is_none());
        assert!(config.seed.is_none());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
bucket = "diffusion-eval"
prefix = "checkpoints/512000"
seed = 17
"#
        )
        .unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.bucket.as_deref(), Some("diffusion-eval"));
        assert_eq!(config.prefix, "checkpoints/512000");
        assert_eq!(config.seed, Some(17));
        assert_eq!(config.max_images, 30);
        assert!(config.images_dir.is_none());
    }

    #[test]
    fn test_roundtrip() {
        let mut config = Config::default();
        config.bucket = Some("bucket-a".to_string());
        config.max_images = 5;

        let serialized = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(parsed.bucket.as_deref(), Some("bucket-a"));
        assert_eq!(parsed.max_images, 5);
    }
}
