//! Preprocessing that reproduces the training-time transform.
//!
//! The trained classifier expects:
//! - Input size: 300×300 pixels, bilinear resize
//! - CLAHE enhancement after the resize (8×8 tiles, clip limit 2.0)
//! - Channel order: RGB, tensor layout NCHW [batch, channels, height, width]
//! - Per-channel standardization with training-set mean/std
//!
//! Every constant here is frozen: it mirrors what the model saw during
//! training, and deviating silently produces wrong predictions with no
//! error signal.

use image::{imageops, RgbImage};
use ndarray::Array4;

use crate::error::PipelineError;

use super::clahe;

/// Number of color channels (RGB).
const CHANNELS: usize = 3;

/// Model input edge length in pixels.
pub const INPUT_SIZE: u32 = 300;

/// Training-set per-channel mean (RGB order).
pub const NORM_MEAN: [f32; 3] = [0.394_502_85, 0.240_689_74, 0.125_514_89];

/// Training-set per-channel standard deviation (RGB order).
pub const NORM_STD: [f32; 3] = [0.305_232_88, 0.195_803_49, 0.109_171_92];

/// Preprocess a decoded fundus image for inference.
///
/// Consumes the image so the source buffer is released as soon as the
/// tensor exists. Returns an NCHW tensor of shape `[1, 3, 300, 300]`;
/// values are standardized and therefore unbounded (not [0, 1]).
pub fn normalize(image: RgbImage) -> Result<Array4<f32>, PipelineError> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(PipelineError::Preprocess {
            message: format!("image has empty dimensions {width}x{height}"),
        });
    }

    // Bilinear resize, then enhance — same order as training.
    let resized = imageops::resize(&image, INPUT_SIZE, INPUT_SIZE, imageops::FilterType::Triangle);
    drop(image);
    let enhanced = clahe::enhance(&resized);
    drop(resized);

    let size = INPUT_SIZE as usize;
    let mut tensor = Array4::<f32>::zeros((1, CHANNELS, size, size));

    // Write through the raw slice: NCHW offset = c * size * size + y * size + x.
    let raw = enhanced.as_raw();
    let tensor_data = tensor.as_slice_mut().unwrap();
    for (i, pixel) in raw.chunks_exact(3).enumerate() {
        let y = i / size;
        let x = i % size;
        for (c, &val) in pixel.iter().enumerate() {
            let idx = c * size * size + y * size + x;
            tensor_data[idx] = (val as f32 / 255.0 - NORM_MEAN[c]) / NORM_STD[c];
        }
    }

    Ok(tensor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_normalize_shape() {
        let img = RgbImage::new(640, 480);
        let tensor = normalize(img).unwrap();
        assert_eq!(tensor.shape(), &[1, 3, 300, 300]);
    }

    #[test]
    fn test_normalize_is_deterministic() {
        let img = RgbImage::from_fn(320, 240, |x, y| {
            Rgb([(x % 251) as u8, (y % 233) as u8, ((x + y) % 241) as u8])
        });
        let a = normalize(img.clone()).unwrap();
        let b = normalize(img).unwrap();
        // Bit-identical, not merely close.
        assert_eq!(
            a.as_slice().unwrap(),
            b.as_slice().unwrap()
        );
    }

    #[test]
    fn test_normalize_applies_standardization() {
        // Raw pixels live in [0, 1] after scaling; standardized values
        // must leave that range (negative for dark pixels).
        let img = RgbImage::from_pixel(300, 300, Rgb([0, 0, 0]));
        let tensor = normalize(img).unwrap();
        let min = tensor.iter().cloned().fold(f32::INFINITY, f32::min);
        assert!(min < -0.5, "black input should standardize well below zero");
    }

    #[test]
    fn test_uniform_gray_canvas() {
        // Uniform 128-gray: CLAHE finds no contrast, so each channel stays
        // constant and de-standardizing recovers a level near 128/255.
        let img = RgbImage::from_pixel(300, 300, Rgb([128, 128, 128]));
        let tensor = normalize(img).unwrap();

        for c in 0..3 {
            let channel = tensor.index_axis(ndarray::Axis(1), c);
            let first = channel[[0, 0, 0]];
            for &v in channel.iter() {
                assert!((v - first).abs() < 1e-6, "channel {c} not uniform");
            }
            let raw = first * NORM_STD[c] + NORM_MEAN[c];
            assert!(
                (raw - 128.0 / 255.0).abs() < 0.06,
                "channel {c} de-standardizes to {raw}, expected ~{}",
                128.0 / 255.0
            );
        }
    }

    #[test]
    fn test_tensor_matches_enhanced_pixels_exactly() {
        // The tensor must be exactly (enhanced/255 - mean) / std, with the
        // enhancement applied to the resized image.
        let img = RgbImage::from_fn(300, 300, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, ((x * y) % 256) as u8])
        });
        let enhanced = clahe::enhance(&imageops::resize(
            &img,
            INPUT_SIZE,
            INPUT_SIZE,
            imageops::FilterType::Triangle,
        ));
        let tensor = normalize(img).unwrap();

        for &(x, y) in &[(0u32, 0u32), (150, 150), (299, 299), (37, 250)] {
            let px = enhanced.get_pixel(x, y);
            for c in 0..3 {
                let expected = (px.0[c] as f32 / 255.0 - NORM_MEAN[c]) / NORM_STD[c];
                let got = tensor[[0, c, y as usize, x as usize]];
                assert!((got - expected).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn test_one_pixel_image_survives() {
        // Degenerate source: a 1×1 image still resizes to 300×300 and
        // passes through the full enhancement without panicking.
        let img = RgbImage::from_pixel(1, 1, Rgb([40, 90, 200]));
        let tensor = normalize(img).unwrap();
        assert_eq!(tensor.shape(), &[1, 3, 300, 300]);
    }

    #[test]
    fn test_empty_image_rejected() {
        let img = RgbImage::new(0, 0);
        let err = normalize(img).unwrap_err();
        assert!(matches!(err, PipelineError::Preprocess { .. }));
    }
}
