//! Local-directory sampling, for offline runs and tests.

use anyhow::{Context, Result};
use rand::Rng;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::{has_image_extension, sample_without_replacement, NamedImage, SourceError};

/// Recursively discover image files under `dir`
fn discover_images(dir: &Path) -> Vec<PathBuf> {
    let mut images: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_file())
        .map(|e| e.path().to_path_buf())
        .filter(|path| path.to_str().is_some_and(has_image_extension))
        .collect();

    // Sort by path for consistent ordering before sampling
    images.sort();
    images
}

/// Sample and decode up to `max_count` images under a local directory.
///
/// Errors when the directory holds no matching files; otherwise returns
/// `min(max_count, available)` images.
pub fn load_random_images_from_dir<R: Rng>(
    dir: &Path,
    max_count: usize,
    rng: &mut R,
) -> Result<Vec<NamedImage>> {
    let candidates = discover_images(dir);
    if candidates.is_empty() {
        return Err(SourceError::NoMatchingImages(dir.display().to_string()).into());
    }

    let selected = sample_without_replacement(candidates, max_count, rng);
    tracing::info!(dir = ?dir, count = selected.len(), "Sampling images from directory");

    let mut images = Vec::with_capacity(selected.len());
    for path in selected {
        let image = image::open(&path)
            .with_context(|| format!("Failed to load {}", path.display()))?;
        images.push(NamedImage {
            name: path.display().to_string(),
            image,
        });
    }

    Ok(images)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::fs::{self, File};
    use tempfile::tempdir;

    fn write_test_png(path: &Path) {
        RgbImage::new(4, 4).save(path).unwrap();
    }

    #[test]
    fn test_returns_all_when_fewer_than_requested() {
        let dir = tempdir().unwrap();
        write_test_png(&dir.path().join("a.png"));
        write_test_png(&dir.path().join("b.png"));
        File::create(dir.path().join("notes.txt")).unwrap();

        fs::create_dir(dir.path().join("nested")).unwrap();
        write_test_png(&dir.path().join("nested/c.png"));

        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let images = load_random_images_from_dir(dir.path(), 5, &mut rng).unwrap();
        assert_eq!(images.len(), 3);
    }

    #[test]
    fn test_caps_at_max_count() {
        let dir = tempdir().unwrap();
        for i in 0..6 {
            write_test_png(&dir.path().join(format!("{}.png", i)));
        }

        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let images = load_random_images_from_dir(dir.path(), 2, &mut rng).unwrap();
        assert_eq!(images.len(), 2);
    }

    #[test]
    fn test_empty_directory_is_an_error() {
        let dir = tempdir().unwrap();
        File::create(dir.path().join("readme.md")).unwrap();

        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let err = load_random_images_from_dir(dir.path(), 5, &mut rng).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SourceError>(),
            Some(SourceError::NoMatchingImages(_))
        ));
    }

    #[test]
    fn test_seeded_sampling_is_reproducible() {
        let dir = tempdir().unwrap();
        for i in 0..10 {
            write_test_png(&dir.path().join(format!("{}.png", i)));
        }

        let mut rng_a = ChaCha8Rng::seed_from_u64(9);
        let mut rng_b = ChaCha8Rng::seed_from_u64(9);
        let names_a: Vec<String> = load_random_images_from_dir(dir.path(), 4, &mut rng_a)
            .unwrap()
            .into_iter()
            .map(|img| img.name)
            .collect();
        let names_b: Vec<String> = load_random_images_from_dir(dir.path(), 4, &mut rng_b)
            .unwrap()
            .into_iter()
            .map(|img| img.name)
            .collect();
        assert_eq!(names_a, names_b);
    }
}
