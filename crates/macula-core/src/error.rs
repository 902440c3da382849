//! Error types for the Macula classification pipeline.
//!
//! Errors are organized by stage so callers can distinguish a bad upload
//! from a preprocessing failure or a model problem programmatically. Every
//! variant carries the originating cause in its message; pipeline errors
//! are terminal for the current request — there is no retry and no
//! fallback to a default class.

use thiserror::Error;

/// Top-level error type for Macula operations.
#[derive(Error, Debug)]
pub enum MaculaError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Pipeline processing errors
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Classification pipeline errors, organized by stage.
///
/// `name` identifies the input (upload filename or local path) for log
/// context; uploads never touch disk so there is no path to report.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Image decoding failed (malformed or unsupported bytes)
    #[error("Decode error for {name}: {message}")]
    Decode { name: String, message: String },

    /// Unsupported image format
    #[error("Unsupported format for {name}: {format}")]
    UnsupportedFormat { name: String, format: String },

    /// Upload exceeds the configured size limit
    #[error("File too large: {name} ({size_mb}MB > {max_mb}MB)")]
    FileTooLarge {
        name: String,
        size_mb: u64,
        max_mb: u64,
    },

    /// Image dimensions exceed the configured limit
    #[error("Image too large: {name} ({width}x{height} > {max_dim})")]
    ImageTooLarge {
        name: String,
        width: u32,
        height: u32,
        max_dim: u32,
    },

    /// Decode did not finish within the configured timeout
    #[error("Timeout in {stage} stage for {name} after {timeout_ms}ms")]
    Timeout {
        name: String,
        stage: String,
        timeout_ms: u64,
    },

    /// Preprocessing (resize / enhance / tensor conversion) failed
    #[error("Preprocessing failed: {message}")]
    Preprocess { message: String },

    /// No model is loaded — startup load failed, so every request must
    /// fail explicitly rather than guess a class.
    #[error("Model is not loaded; classification is unavailable")]
    ModelUnavailable,

    /// Model load or forward pass failed
    #[error("Inference failed: {message}")]
    Inference { message: String },

    /// The probability vector coming out of inference is malformed.
    /// Unreachable when softmax ran correctly, but checked so a broken
    /// model surfaces as an error instead of a misleading label.
    #[error("Malformed probabilities: {message}")]
    Format { message: String },
}

/// Convenience type alias for Macula results.
pub type Result<T> = std::result::Result<T, MaculaError>;

/// Convenience type alias for pipeline-specific results.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
