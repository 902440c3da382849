//! Stage classification via the exported ResNet50 network.
//!
//! The classifier is loaded once at startup and shared read-only by all
//! requests. A failed load never yields a partially-initialized engine —
//! the service holds `None` instead and every request fails explicitly.
//!
//! # Usage
//!
//! ```rust,ignore
//! use macula_core::inference::StageClassifier;
//!
//! let config = macula_core::Config::default();
//! let classifier = StageClassifier::load(&config)?;
//! let probs = classifier.classify(&tensor)?;
//! // probs is a Vec<f32> with 3 elements summing to 1
//! ```

pub(crate) mod session;

use std::path::PathBuf;

use ndarray::Array4;

use crate::config::{Config, Device};
use crate::error::PipelineError;
use crate::math::softmax;

use self::session::OnnxSession;

/// The stage classification engine: one loaded model, one device,
/// decided at construction and never reassigned.
#[derive(Debug)]
pub struct StageClassifier {
    session: OnnxSession,
    device: Device,
}

impl StageClassifier {
    /// Load the classifier from `{model_dir}/{model.file}`.
    ///
    /// Device selection happens here, once; requests never re-query it.
    pub fn load(config: &Config) -> Result<Self, PipelineError> {
        let model_path = config.model_path();

        if !model_path.exists() {
            return Err(PipelineError::Inference {
                message: format!(
                    "Model not found at {:?}. Place the exported ONNX artifact there \
                     or point model.file elsewhere in the config.",
                    model_path
                ),
            });
        }

        tracing::info!("Loading stage classifier from {:?}", model_path);
        let session = OnnxSession::load(&model_path, config.model.device)?;
        tracing::info!("Stage classifier loaded (device: {})", config.model.device);

        Ok(Self {
            session,
            device: config.model.device,
        })
    }

    /// The device this engine was constructed with.
    pub fn device(&self) -> Device {
        self.device
    }

    /// Classify a preprocessed tensor into per-class probabilities.
    ///
    /// Runs a single forward pass and applies softmax over the 3 logits.
    /// The returned vector is index-aligned with
    /// [`crate::types::STAGE_LABELS`] and sums to 1.
    pub fn classify(&self, tensor: &Array4<f32>) -> Result<Vec<f32>, PipelineError> {
        let logits = self.session.logits(tensor)?;
        Ok(softmax(&logits))
    }

    /// Check whether the model artifact exists on disk.
    pub fn model_exists(config: &Config) -> bool {
        config.model_path().exists()
    }

    /// The expected model artifact path.
    pub fn model_path(config: &Config) -> PathBuf {
        config.model_path()
    }
}
