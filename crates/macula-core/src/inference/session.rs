//! ONNX Runtime session management for the staging network.
//!
//! Loads the exported ResNet50 classifier and runs single-image forward
//! passes. ONNX Runtime is inference-only — no gradient machinery exists —
//! and the loaded parameters are never mutated.

use std::path::Path;
use std::sync::Mutex;

use ndarray::Array4;
use ort::session::Session;
use ort::value::Value;

use crate::config::Device;
use crate::error::PipelineError;
use crate::types::NUM_CLASSES;

/// Wraps an ONNX Runtime session for stage classification.
///
/// Uses a `Mutex` because `Session::run` requires `&mut self`; this also
/// serializes concurrent forward passes on the shared parameters, which is
/// the concurrency contract the pipeline promises.
#[derive(Debug)]
pub struct OnnxSession {
    session: Mutex<Session>,
    /// Name of the input tensor (detected from model metadata).
    input_name: String,
}

impl OnnxSession {
    /// Load the classifier from an ONNX file on the requested device.
    pub fn load(model_path: &Path, device: Device) -> Result<Self, PipelineError> {
        let builder = Session::builder().map_err(|e| PipelineError::Inference {
            message: format!("Failed to create ONNX session builder: {e}"),
        })?;

        let mut builder = Self::register_device(builder, device)?;

        let session = builder
            .commit_from_file(model_path)
            .map_err(|e| PipelineError::Inference {
                message: format!("Failed to load ONNX model from {:?}: {e}", model_path),
            })?;

        // Detect the input tensor name from model metadata.
        let input_name = session
            .inputs()
            .first()
            .map(|i| i.name().to_string())
            .unwrap_or_else(|| "input".to_string());

        tracing::debug!(
            "Loaded classifier from {:?} on {} (input: {:?}, outputs: {:?})",
            model_path,
            device,
            input_name,
            session
                .outputs()
                .iter()
                .map(|o| o.name())
                .collect::<Vec<_>>()
        );

        Ok(Self {
            session: Mutex::new(session),
            input_name,
        })
    }

    #[cfg(feature = "cuda")]
    fn register_device(
        builder: ort::session::builder::SessionBuilder,
        device: Device,
    ) -> Result<ort::session::builder::SessionBuilder, PipelineError> {
        use ort::execution_providers::CUDAExecutionProvider;

        match device {
            Device::Cpu => Ok(builder),
            Device::Auto | Device::Cuda => builder
                .with_execution_providers([CUDAExecutionProvider::default().build()])
                .map_err(|e| PipelineError::Inference {
                    message: format!("Failed to register CUDA execution provider: {e}"),
                }),
        }
    }

    #[cfg(not(feature = "cuda"))]
    fn register_device(
        builder: ort::session::builder::SessionBuilder,
        device: Device,
    ) -> Result<ort::session::builder::SessionBuilder, PipelineError> {
        match device {
            // Auto falls back to CPU when CUDA support is not compiled in.
            Device::Auto | Device::Cpu => Ok(builder),
            Device::Cuda => Err(PipelineError::Inference {
                message: "CUDA device requested but this build has no CUDA support; \
                          rebuild with `--features cuda`"
                    .to_string(),
            }),
        }
    }

    /// Run one forward pass and return the raw logits.
    ///
    /// Input shape: \[1, 3, 300, 300\] (NCHW, standardized).
    /// Output: exactly [`NUM_CLASSES`] logits in class-index order;
    /// anything else is an architecture mismatch.
    pub fn logits(&self, preprocessed: &Array4<f32>) -> Result<Vec<f32>, PipelineError> {
        // Convert ndarray to (shape, flat_data) for ort.
        let shape: Vec<i64> = preprocessed.shape().iter().map(|&d| d as i64).collect();
        let flat_data: Vec<f32> = preprocessed.iter().copied().collect();

        let input_value =
            Value::from_array((shape, flat_data)).map_err(|e| PipelineError::Inference {
                message: format!("Failed to create input tensor: {e}"),
            })?;

        let inputs = ort::inputs![self.input_name.as_str() => input_value];

        let mut session = self.session.lock().map_err(|e| PipelineError::Inference {
            message: format!("Session lock poisoned: {e}"),
        })?;

        let outputs = session.run(inputs).map_err(|e| PipelineError::Inference {
            message: format!("ONNX forward pass failed: {e}"),
        })?;

        // The classifier head has a single output: the 3-way logits.
        let (_, logits_value) = outputs
            .iter()
            .next()
            .ok_or_else(|| PipelineError::Inference {
                message: "Model produced no outputs".to_string(),
            })?;

        let (shape, data) =
            logits_value
                .try_extract_tensor::<f32>()
                .map_err(|e| PipelineError::Inference {
                    message: format!("Failed to extract logits tensor: {e}"),
                })?;

        // Accept [3] or [1, 3]; reject anything else.
        let logits = match shape.len() {
            1 => data.to_vec(),
            2 => {
                let dim = shape[1] as usize;
                data[..dim.min(data.len())].to_vec()
            }
            _ => {
                return Err(PipelineError::Inference {
                    message: format!("Unexpected logits shape: {:?}", shape),
                });
            }
        };

        if logits.len() != NUM_CLASSES {
            return Err(PipelineError::Inference {
                message: format!(
                    "Model produced {} logits, expected {} — wrong architecture?",
                    logits.len(),
                    NUM_CLASSES
                ),
            });
        }

        Ok(logits)
    }
}
