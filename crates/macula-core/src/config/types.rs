//! Sub-configuration structs with service defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Directory where model artifacts are stored
    pub model_dir: PathBuf,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("~/.macula/models"),
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address
    pub host: String,

    /// Bind port
    pub port: u16,

    /// File extensions accepted for upload
    pub allowed_extensions: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            allowed_extensions: vec![
                "png".to_string(),
                "jpg".to_string(),
                "jpeg".to_string(),
            ],
        }
    }
}

/// Model artifact and device settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Artifact filename inside the model directory
    pub file: String,

    /// Compute device, resolved once at load time
    pub device: Device,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            file: "amd_resnet50.onnx".to_string(),
            device: Device::Auto,
        }
    }
}

/// Compute device for inference.
///
/// Resolved exactly once when the model is loaded; never re-queried per
/// request. `Auto` prefers CUDA when the `cuda` feature is compiled in,
/// falling back to CPU.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    /// CUDA if available, otherwise CPU
    #[default]
    Auto,

    /// CPU only
    Cpu,

    /// CUDA only (requires the `cuda` feature)
    Cuda,
}

impl std::fmt::Display for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Cpu => write!(f, "cpu"),
            Self::Cuda => write!(f, "cuda"),
        }
    }
}

impl std::str::FromStr for Device {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "cpu" => Ok(Self::Cpu),
            "cuda" | "gpu" => Ok(Self::Cuda),
            other => Err(format!("unknown device '{other}' (expected auto, cpu, cuda)")),
        }
    }
}

/// Resource limits to protect against problematic uploads.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum upload size in megabytes
    pub max_file_size_mb: u64,

    /// Maximum image dimension (width or height)
    pub max_image_dimension: u32,

    /// Decode timeout in milliseconds
    pub decode_timeout_ms: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_file_size_mb: 16,
            max_image_dimension: 10000,
            decode_timeout_ms: 5000,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_device_round_trips_through_str() {
        for device in [Device::Auto, Device::Cpu, Device::Cuda] {
            assert_eq!(Device::from_str(&device.to_string()).unwrap(), device);
        }
    }

    #[test]
    fn test_device_rejects_unknown() {
        assert!(Device::from_str("tpu").is_err());
    }

    #[test]
    fn test_device_serde_lowercase() {
        let json = serde_json::to_string(&Device::Cuda).unwrap();
        assert_eq!(json, "\"cuda\"");
    }

    #[test]
    fn test_default_extensions_match_service_contract() {
        let server = ServerConfig::default();
        assert_eq!(server.allowed_extensions, ["png", "jpg", "jpeg"]);
    }
}
