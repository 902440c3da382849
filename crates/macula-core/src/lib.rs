//! Macula Core — AMD fundus stage classification pipeline.
//!
//! Macula takes a fundus photograph and classifies it into one of three
//! age-related macular degeneration stages (Early, Intermediate, Late)
//! using a pretrained ResNet50 exported to ONNX.
//!
//! # Architecture
//!
//! A pure request pipeline with no persistence:
//!
//! ```text
//! Upload → Decode → Resize + CLAHE + Standardize → Forward pass → Softmax → Prediction
//! ```
//!
//! The preprocessing stage reproduces the training-time transform exactly
//! (bilinear 300×300 resize, CLAHE with 8×8 tiles and clip limit 2.0,
//! frozen per-channel mean/std). That transform is the correctness
//! contract of the whole service: a mismatch produces silently wrong
//! predictions.
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use macula_core::{Config, StageClassifier, StagePipeline};
//!
//! let config = Config::load()?;
//! let classifier = Arc::new(StageClassifier::load(&config)?);
//! let pipeline = StagePipeline::new(&config, Some(classifier));
//!
//! let prediction = pipeline.classify_upload(bytes, "fundus.jpg").await?;
//! println!("{} ({:.2})", prediction.prediction, prediction.confidence);
//! ```

// Module declarations
pub mod config;
pub mod error;
pub mod format;
pub mod inference;
pub mod math;
pub mod pipeline;
pub mod types;

// Re-exports for convenient access
pub use config::{Config, Device};
pub use error::{ConfigError, MaculaError, PipelineError, PipelineResult, Result};
pub use format::format_prediction;
pub use inference::StageClassifier;
pub use pipeline::StagePipeline;
pub use types::{ModelInfo, StagePrediction, STAGE_LABELS};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
