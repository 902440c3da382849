//! Assemble the response record from class probabilities.
//!
//! Pure post-processing: pick the winning class, map it to its label and
//! attach the full probability breakdown. The input is validated before
//! any label is chosen — a malformed vector must fail loudly rather than
//! produce a plausible-looking prediction.

use std::collections::BTreeMap;

use crate::error::PipelineError;
use crate::math::argmax;
use crate::types::{StagePrediction, NUM_CLASSES, STAGE_LABELS};

/// How far the probability sum may drift from 1.0 before the vector is
/// rejected as malformed. Softmax output lands well inside this.
const PROB_SUM_TOLERANCE: f32 = 1e-3;

/// Build a [`StagePrediction`] from a probability vector.
///
/// The predicted class is the argmax (ties to the lowest index), its label
/// comes from the fixed index mapping, and the confidence is the selected
/// probability itself — not renormalized or otherwise calibrated.
pub fn format_prediction(probs: &[f32]) -> Result<StagePrediction, PipelineError> {
    if probs.len() != NUM_CLASSES {
        return Err(PipelineError::Format {
            message: format!("expected {} probabilities, got {}", NUM_CLASSES, probs.len()),
        });
    }

    let sum: f32 = probs.iter().sum();
    if !sum.is_finite() || (sum - 1.0).abs() > PROB_SUM_TOLERANCE {
        return Err(PipelineError::Format {
            message: format!("probabilities sum to {sum}, expected ~1.0"),
        });
    }

    let predicted = argmax(probs);
    let label = STAGE_LABELS[predicted];

    let probabilities: BTreeMap<String, f32> = STAGE_LABELS
        .iter()
        .zip(probs.iter())
        .map(|(label, &p)| (label.to_string(), p))
        .collect();

    Ok(StagePrediction {
        prediction: label.to_string(),
        amd_stage: label.to_string(),
        confidence: probs[predicted],
        probabilities,
    })
}
