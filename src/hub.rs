//! Model artifact cache.
//!
//! Pretrained weights and the tokenizer vocabulary are fetched once over
//! HTTPS and kept under the local data directory. The cache location can be
//! overridden through `models_dir` in the config file.

use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};

/// Default models directory path
pub fn default_models_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from(".local/share"))
        .join("clipscore")
        .join("models")
}

/// Download an artifact if it is not already cached
pub fn ensure_artifact(models_dir: &Path, filename: &str, url: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(models_dir)?;
    let artifact_path = models_dir.join(filename);

    if !artifact_path.exists() {
        tracing::info!(artifact = %filename, "Downloading model artifact...");
        let response = ureq::get(url)
            .call()
            .map_err(|e| anyhow!("Failed to download {}: {}", filename, e))?;

        let mut file = std::fs::File::create(&artifact_path)?;
        std::io::copy(&mut response.into_reader(), &mut file)?;
        tracing::info!(artifact = %filename, path = ?artifact_path, "Artifact downloaded");
    }

    Ok(artifact_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_cached_artifact_is_not_refetched() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("model.onnx");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(b"weights").unwrap();

        // The URL is unreachable, so this only passes if the cache short-circuits
        let resolved =
            ensure_artifact(dir.path(), "model.onnx", "http://127.0.0.1:1/model.onnx").unwrap();
        assert_eq!(resolved, path);
        assert_eq!(std::fs::read(&resolved).unwrap(), b"weights");
    }
}
