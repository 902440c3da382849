//! Core data types for the Macula classification pipeline.
//!
//! These types are the wire contract of the service: the per-request
//! prediction record and the model metadata surface.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Fixed label set, index-aligned to the model's output logits.
///
/// Index order is part of the trained model's contract and must never be
/// reordered: `{0: Early, 1: Intermediate, 2: Late}`.
pub const STAGE_LABELS: [&str; 3] = ["Early", "Intermediate", "Late"];

/// Number of output classes.
pub const NUM_CLASSES: usize = STAGE_LABELS.len();

/// Architecture identifier exposed in model metadata.
pub const ARCHITECTURE: &str = "ResNet50";

/// Preprocessing identifier exposed in model metadata.
pub const PREPROCESSING_ID: &str = "CLAHE + Custom Normalization";

/// The result of classifying a single fundus image.
///
/// `amd_stage` duplicates `prediction`; existing callers of the service
/// read one or the other, so both are kept on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagePrediction {
    /// Predicted stage label ("Early", "Intermediate" or "Late")
    pub prediction: String,

    /// Duplicate of `prediction`, kept for caller compatibility
    pub amd_stage: String,

    /// Probability of the predicted class, in [0, 1]
    pub confidence: f32,

    /// Probability for every stage label. A `BTreeMap` keeps the three
    /// labels in stable (alphabetical == stage) order on the wire.
    pub probabilities: BTreeMap<String, f32>,
}

/// Metadata about the loaded model, served at `/api/model-info`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Whether the model loaded successfully at startup
    pub model_loaded: bool,

    /// The fixed label set, in class-index order
    pub classes: Vec<String>,

    /// Architecture identifier
    pub model: String,

    /// Expected input size, e.g. "300x300"
    pub input_size: String,

    /// Preprocessing identifier
    pub preprocessing: String,

    /// Service version
    pub version: String,
}

impl ModelInfo {
    /// Build the metadata record for the current build.
    pub fn new(model_loaded: bool) -> Self {
        let size = crate::pipeline::preprocess::INPUT_SIZE;
        Self {
            model_loaded,
            classes: STAGE_LABELS.iter().map(|s| s.to_string()).collect(),
            model: ARCHITECTURE.to_string(),
            input_size: format!("{}x{}", size, size),
            preprocessing: PREPROCESSING_ID.to_string(),
            version: crate::VERSION.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_order_is_fixed() {
        assert_eq!(STAGE_LABELS, ["Early", "Intermediate", "Late"]);
        assert_eq!(NUM_CLASSES, 3);
    }

    #[test]
    fn test_model_info_wire_fields() {
        let info = ModelInfo::new(true);
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["model_loaded"], true);
        assert_eq!(json["model"], "ResNet50");
        assert_eq!(json["input_size"], "300x300");
        assert_eq!(json["preprocessing"], "CLAHE + Custom Normalization");
        assert_eq!(json["classes"][0], "Early");
        assert_eq!(json["classes"][2], "Late");
    }

    #[test]
    fn test_stage_prediction_wire_fields() {
        let mut probabilities = BTreeMap::new();
        probabilities.insert("Early".to_string(), 0.7_f32);
        probabilities.insert("Intermediate".to_string(), 0.2_f32);
        probabilities.insert("Late".to_string(), 0.1_f32);
        let pred = StagePrediction {
            prediction: "Early".to_string(),
            amd_stage: "Early".to_string(),
            confidence: 0.7,
            probabilities,
        };

        let json = serde_json::to_string(&pred).unwrap();
        assert!(json.contains("\"prediction\":\"Early\""));
        assert!(json.contains("\"amd_stage\":\"Early\""));
        assert!(json.contains("\"probabilities\""));

        let parsed: StagePrediction = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.prediction, parsed.amd_stage);
        assert_eq!(parsed.probabilities.len(), 3);
    }
}
