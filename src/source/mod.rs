//! Image sampling sources.
//!
//! Both sources list candidates, filter to raster image extensions, and
//! sample without replacement through a caller-supplied RNG so runs are
//! reproducible under a fixed seed.

mod gcs;
mod local;

pub use gcs::GcsImageSource;
pub use local::load_random_images_from_dir;

use image::DynamicImage;
use rand::seq::SliceRandom;
use rand::Rng;
use thiserror::Error;

/// Extensions accepted as image objects
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// A decoded image together with the object name or path it came from
pub struct NamedImage {
    pub name: String,
    pub image: DynamicImage,
}

/// Errors surfaced while listing or sampling images
#[derive(Debug, Error, PartialEq)]
pub enum SourceError {
    /// The listing succeeded but nothing under it looks like an image.
    #[error("no .jpg/.jpeg/.png images under {0}")]
    NoMatchingImages(String),
}

/// True when the object name carries an accepted image extension
pub(crate) fn has_image_extension(name: &str) -> bool {
    let lower = name.to_lowercase();
    IMAGE_EXTENSIONS
        .iter()
        .any(|ext| lower.ends_with(&format!(".{}", ext)))
}

/// Sample up to `max_count` items uniformly without replacement
pub(crate) fn sample_without_replacement<T, R: Rng>(
    mut items: Vec<T>,
    max_count: usize,
    rng: &mut R,
) -> Vec<T> {
    items.shuffle(rng);
    items.truncate(max_count);
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_has_image_extension() {
        assert!(has_image_extension("folder/0001.jpg"));
        assert!(has_image_extension("folder/0001.JPEG"));
        assert!(has_image_extension("step_512000/sample.PNG"));
        assert!(!has_image_extension("folder/notes.txt"));
        assert!(!has_image_extension("folder/archive.jpg.gz"));
        assert!(!has_image_extension("jpg"));
    }

    #[test]
    fn test_sample_caps_at_available() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let sampled = sample_without_replacement(vec![1, 2, 3], 5, &mut rng);
        assert_eq!(sampled.len(), 3);
    }

    #[test]
    fn test_sample_without_replacement_is_distinct() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut sampled = sample_without_replacement((0..100).collect(), 10, &mut rng);
        assert_eq!(sampled.len(), 10);
        sampled.sort_unstable();
        sampled.dedup();
        assert_eq!(sampled.len(), 10);
    }

    #[test]
    fn test_sampling_is_seed_reproducible() {
        let items: Vec<u32> = (0..50).collect();
        let mut rng_a = ChaCha8Rng::seed_from_u64(42);
        let mut rng_b = ChaCha8Rng::seed_from_u64(42);
        assert_eq!(
            sample_without_replacement(items.clone(), 5, &mut rng_a),
            sample_without_replacement(items, 5, &mut rng_b)
        );
    }
}
