//! Image preprocessing following the published CLIP recipe.

use image::DynamicImage;

/// CLIP input resolution
pub const INPUT_SIZE: u32 = 224;

/// CLIP channel means
pub const MEAN: [f32; 3] = [0.48145466, 0.4578275, 0.40821073];

/// CLIP channel standard deviations
pub const STD: [f32; 3] = [0.26862954, 0.26130258, 0.27577711];

/// Resize, normalize and lay out an image as a single-image NCHW batch
/// (`[1, 3, 224, 224]`, flattened row-major).
pub fn image_to_nchw(img: &DynamicImage) -> Vec<f32> {
    let resized = img.resize_exact(INPUT_SIZE, INPUT_SIZE, image::imageops::FilterType::Triangle);
    let rgb = resized.to_rgb8();

    let plane = (INPUT_SIZE * INPUT_SIZE) as usize;
    let mut data = vec![0.0f32; 3 * plane];

    for y in 0..INPUT_SIZE as usize {
        for x in 0..INPUT_SIZE as usize {
            let pixel = rgb.get_pixel(x as u32, y as u32);
            let idx = y * INPUT_SIZE as usize + x;

            // Normalize: (pixel/255 - mean) / std, one plane per channel
            for c in 0..3 {
                data[c * plane + idx] = ((pixel[c] as f32 / 255.0) - MEAN[c]) / STD[c];
            }
        }
    }

    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn test_output_shape() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(64, 48));
        let data = image_to_nchw(&img);
        assert_eq!(data.len(), 3 * 224 * 224);
    }

    #[test]
    fn test_constant_image_normalization() {
        let mut buf = RgbImage::new(32, 32);
        for pixel in buf.pixels_mut() {
            *pixel = Rgb([255, 0, 128]);
        }
        let data = image_to_nchw(&DynamicImage::ImageRgb8(buf));

        let plane = 224 * 224;
        let expected_r = (1.0 - MEAN[0]) / STD[0];
        let expected_g = (0.0 - MEAN[1]) / STD[1];
        let expected_b = (128.0 / 255.0 - MEAN[2]) / STD[2];

        // A constant image stays constant per channel through resizing
        assert!((data[0] - expected_r).abs() < 1e-4);
        assert!((data[plane / 2] - expected_r).abs() < 1e-4);
        assert!((data[plane] - expected_g).abs() < 1e-4);
        assert!((data[2 * plane + plane - 1] - expected_b).abs() < 1e-4);
    }
}
