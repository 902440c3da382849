//! Upload decoding with format detection, validation, and timeout support.
//!
//! Uploads are decoded entirely in memory; nothing is written to disk.
//! The decoder guarantees the 3-channel RGB contract the preprocessing
//! stage relies on.

use std::time::Duration;

use image::{ImageFormat, RgbImage};
use tokio::time::timeout;

use crate::config::LimitsConfig;
use crate::error::PipelineError;

/// Image decoder with configurable limits and timeout.
pub struct ImageDecoder {
    limits: LimitsConfig,
}

/// Result of decoding an upload.
#[derive(Debug)]
pub struct DecodedImage {
    /// The decoded image, converted to 8-bit RGB
    pub image: RgbImage,
    /// Detected image format
    pub format: ImageFormat,
    /// Source width in pixels
    pub width: u32,
    /// Source height in pixels
    pub height: u32,
    /// Upload size in bytes
    pub file_size: u64,
}

impl ImageDecoder {
    /// Create a new decoder with the given limits.
    pub fn new(limits: LimitsConfig) -> Self {
        Self { limits }
    }

    /// Decode an uploaded byte buffer with validation and timeout.
    ///
    /// `name` is the upload filename, used only for error context.
    pub async fn decode_upload(
        &self,
        bytes: Vec<u8>,
        name: &str,
    ) -> Result<DecodedImage, PipelineError> {
        let size_mb = bytes.len() as u64 / (1024 * 1024);
        if size_mb >= self.limits.max_file_size_mb {
            return Err(PipelineError::FileTooLarge {
                name: name.to_string(),
                size_mb,
                max_mb: self.limits.max_file_size_mb,
            });
        }

        let name_owned = name.to_string();
        let timeout_duration = Duration::from_millis(self.limits.decode_timeout_ms);

        let decode_result = timeout(timeout_duration, async {
            tokio::task::spawn_blocking(move || Self::decode_bytes_sync(bytes, &name_owned)).await
        })
        .await;

        match decode_result {
            Ok(Ok(Ok(decoded))) => {
                if decoded.width > self.limits.max_image_dimension
                    || decoded.height > self.limits.max_image_dimension
                {
                    return Err(PipelineError::ImageTooLarge {
                        name: name.to_string(),
                        width: decoded.width,
                        height: decoded.height,
                        max_dim: self.limits.max_image_dimension,
                    });
                }
                Ok(decoded)
            }
            Ok(Ok(Err(e))) => Err(e),
            Ok(Err(e)) => Err(PipelineError::Decode {
                name: name.to_string(),
                message: format!("Task join error: {}", e),
            }),
            Err(_) => Err(PipelineError::Timeout {
                name: name.to_string(),
                stage: "decode".to_string(),
                timeout_ms: self.limits.decode_timeout_ms,
            }),
        }
    }

    /// Synchronous decode (runs in spawn_blocking).
    fn decode_bytes_sync(bytes: Vec<u8>, name: &str) -> Result<DecodedImage, PipelineError> {
        use std::io::Cursor;

        let file_size = bytes.len() as u64;
        let reader = image::ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| PipelineError::Decode {
                name: name.to_string(),
                message: format!("Cannot detect image format: {}", e),
            })?;
        let format = reader.format().ok_or_else(|| PipelineError::UnsupportedFormat {
            name: name.to_string(),
            format: "unknown".to_string(),
        })?;
        let image = reader.decode().map_err(|e| PipelineError::Decode {
            name: name.to_string(),
            message: e.to_string(),
        })?;

        // Collapse alpha / expand grayscale: downstream stages require RGB.
        let rgb = image.to_rgb8();
        let (width, height) = rgb.dimensions();
        Ok(DecodedImage {
            image: rgb,
            format,
            width,
            height,
            file_size,
        })
    }
}
