//! Pipeline orchestration — wires decode, preprocessing, inference and
//! formatting into one request-scoped flow.

use std::sync::Arc;

use crate::config::Config;
use crate::error::PipelineError;
use crate::format::format_prediction;
use crate::inference::StageClassifier;
use crate::types::StagePrediction;

use super::decode::ImageDecoder;
use super::preprocess;

/// The classification pipeline shared by all requests.
///
/// Holds the classifier behind an `Option`: when the startup load failed
/// the service keeps answering, but every classification fails with an
/// explicit error before any forward pass is attempted — never with a
/// guessed class.
pub struct StagePipeline {
    decoder: ImageDecoder,
    classifier: Option<Arc<StageClassifier>>,
}

impl StagePipeline {
    /// Build the pipeline from configuration and an optional classifier.
    pub fn new(config: &Config, classifier: Option<Arc<StageClassifier>>) -> Self {
        Self {
            decoder: ImageDecoder::new(config.limits.clone()),
            classifier,
        }
    }

    /// Whether a model is loaded and classification can succeed.
    pub fn model_loaded(&self) -> bool {
        self.classifier.is_some()
    }

    /// Classify one uploaded image, start to finish.
    ///
    /// The whole call computes synchronously from the caller's point of
    /// view; CPU-bound stages run on the blocking pool. The decoded image
    /// is consumed by the preprocessing stage, so its buffer is released
    /// as soon as the tensor exists.
    pub async fn classify_upload(
        &self,
        bytes: Vec<u8>,
        name: &str,
    ) -> Result<StagePrediction, PipelineError> {
        let classifier = self
            .classifier
            .as_ref()
            .ok_or(PipelineError::ModelUnavailable)?
            .clone();

        let start = std::time::Instant::now();
        tracing::debug!("Classifying upload: {}", name);

        let decoded = self.decoder.decode_upload(bytes, name).await?;
        tracing::trace!(
            "  Decode: {:?} ({}x{}, {:?}, {} bytes)",
            start.elapsed(),
            decoded.width,
            decoded.height,
            decoded.format,
            decoded.file_size
        );

        let name_owned = name.to_string();
        let prediction = tokio::task::spawn_blocking(move || {
            let preprocess_start = std::time::Instant::now();
            let tensor = preprocess::normalize(decoded.image)?;
            tracing::trace!("  Preprocess: {:?}", preprocess_start.elapsed());

            let infer_start = std::time::Instant::now();
            let probs = classifier.classify(&tensor)?;
            tracing::trace!("  Inference: {:?}", infer_start.elapsed());

            format_prediction(&probs)
        })
        .await
        .map_err(|e| PipelineError::Preprocess {
            message: format!("Task join error for {}: {}", name_owned, e),
        })??;

        tracing::debug!(
            "Classified {} as {} ({:.3}) in {:?}",
            name,
            prediction.prediction,
            prediction.confidence,
            start.elapsed()
        );
        Ok(prediction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_null_model_fails_before_any_work() {
        // No decode, no forward pass: the missing handle is reported
        // immediately.
        let pipeline = StagePipeline::new(&Config::default(), None);
        let err = pipeline
            .classify_upload(vec![0u8; 8], "eye.png")
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::ModelUnavailable));
        assert!(!pipeline.model_loaded());
    }
}
