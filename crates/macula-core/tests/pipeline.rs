//! End-to-end preprocessing tests: encoded bytes in, model tensor out.

use std::io::Cursor;

use image::{ImageFormat, Rgb, RgbImage};
use macula_core::config::LimitsConfig;
use macula_core::pipeline::{preprocess, ImageDecoder};
use macula_core::PipelineError;

fn encode_png(img: &RgbImage) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png).unwrap();
    buf.into_inner()
}

fn synthetic_fundus(width: u32, height: u32) -> RgbImage {
    // Bright disc on a dark background, loosely fundus-shaped.
    let (cx, cy) = (width as f32 / 2.0, height as f32 / 2.0);
    let radius = cx.min(cy);
    RgbImage::from_fn(width, height, |x, y| {
        let dx = x as f32 - cx;
        let dy = y as f32 - cy;
        if (dx * dx + dy * dy).sqrt() < radius {
            let shade = (200.0 - (dx.abs() + dy.abs()) * 0.2) as u8;
            Rgb([shade, shade / 2, shade / 4])
        } else {
            Rgb([5, 3, 2])
        }
    })
}

#[tokio::test]
async fn decoded_upload_normalizes_to_model_shape() {
    let decoder = ImageDecoder::new(LimitsConfig::default());
    let bytes = encode_png(&synthetic_fundus(512, 384));

    let decoded = decoder.decode_upload(bytes, "fundus.png").await.unwrap();
    let tensor = preprocess::normalize(decoded.image).unwrap();

    assert_eq!(tensor.shape(), &[1, 3, 300, 300]);

    // Standardization moved the statistics away from raw [0, 1] pixels.
    let mean: f32 = tensor.iter().sum::<f32>() / tensor.len() as f32;
    let min = tensor.iter().cloned().fold(f32::INFINITY, f32::min);
    assert!(min < 0.0, "standardized tensor should contain negative values");
    assert!(mean.abs() < 5.0, "mean should be in a standardized range, got {mean}");
}

#[tokio::test]
async fn full_preprocessing_is_deterministic() {
    let decoder = ImageDecoder::new(LimitsConfig::default());
    let bytes = encode_png(&synthetic_fundus(640, 640));

    let a = decoder.decode_upload(bytes.clone(), "a.png").await.unwrap();
    let b = decoder.decode_upload(bytes, "b.png").await.unwrap();

    let ta = preprocess::normalize(a.image).unwrap();
    let tb = preprocess::normalize(b.image).unwrap();

    // Bit-identical across runs: no hidden randomness anywhere in the path.
    assert_eq!(ta.as_slice().unwrap(), tb.as_slice().unwrap());
}

#[tokio::test]
async fn one_pixel_upload_survives_the_whole_path() {
    let decoder = ImageDecoder::new(LimitsConfig::default());
    let bytes = encode_png(&RgbImage::from_pixel(1, 1, Rgb([77, 77, 77])));

    let decoded = decoder.decode_upload(bytes, "dot.png").await.unwrap();
    let tensor = preprocess::normalize(decoded.image).unwrap();
    assert_eq!(tensor.shape(), &[1, 3, 300, 300]);
}

#[tokio::test]
async fn corrupted_upload_is_an_error_not_a_zero_tensor() {
    let decoder = ImageDecoder::new(LimitsConfig::default());
    let mut bytes = encode_png(&synthetic_fundus(64, 64));
    for b in bytes.iter_mut().skip(24) {
        *b = 0xAA;
    }

    let err = decoder.decode_upload(bytes, "corrupt.png").await.unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Decode { .. } | PipelineError::UnsupportedFormat { .. }
    ));
}

#[tokio::test]
async fn grayscale_and_alpha_uploads_are_coerced_to_rgb() {
    let decoder = ImageDecoder::new(LimitsConfig::default());

    let gray = image::GrayImage::from_pixel(32, 32, image::Luma([99]));
    let mut buf = Cursor::new(Vec::new());
    gray.write_to(&mut buf, ImageFormat::Png).unwrap();

    let decoded = decoder.decode_upload(buf.into_inner(), "gray.png").await.unwrap();
    assert_eq!(decoded.image.get_pixel(0, 0), &Rgb([99, 99, 99]));
    assert!(preprocess::normalize(decoded.image).is_ok());
}
