//! Error types and handling for GrayBatch

use std::path::PathBuf;
use serde::Serialize;
use thiserror::Error;

use crate::processing::formats::supported_extensions;

/// Result type alias for GrayBatch operations
pub type Result<T> = std::result::Result<T, GrayBatchError>;

/// Main error type for GrayBatch operations
#[derive(Debug, Error)]
pub enum GrayBatchError {
    /// Input file could not be opened or read
    #[error("cannot open {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Input bytes are not a decodable image
    #[error("cannot decode {}: {message}", .path.display())]
    Decode { path: PathBuf, message: String },

    /// Output file could not be created
    #[error("cannot create {}: {message}", .path.display())]
    Create { path: PathBuf, message: String },

    /// Input extension has no encoder
    #[error("unsupported image format")]
    UnsupportedFormat { extension: Option<String> },

    /// Encoder failed while writing the output
    #[error("cannot encode {}: {message}", .path.display())]
    Encode { path: PathBuf, message: String },

    /// Batch was cancelled before this file finished
    #[error("batch cancelled")]
    Cancelled,

    /// Processing this file panicked
    #[error("processing panicked: {message}")]
    Panicked { message: String },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    SerdeError(String),

    /// I/O errors outside per-file processing
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Per-file failure classification carried by a failed outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Open,
    Decode,
    Create,
    UnsupportedFormat,
    Encode,
    Cancelled,
    Panicked,
}

impl GrayBatchError {
    /// Create a new open error
    pub fn open(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Open {
            path: path.into(),
            source,
        }
    }

    /// Create a new decode error
    pub fn decode<S: ToString>(path: impl Into<PathBuf>, cause: S) -> Self {
        Self::Decode {
            path: path.into(),
            message: cause.to_string(),
        }
    }

    /// Create a new create error
    pub fn create<S: ToString>(path: impl Into<PathBuf>, cause: S) -> Self {
        Self::Create {
            path: path.into(),
            message: cause.to_string(),
        }
    }

    /// Create a new unsupported format error
    pub fn unsupported_format(extension: Option<String>) -> Self {
        Self::UnsupportedFormat { extension }
    }

    /// Create a new encode error
    pub fn encode<S: ToString>(path: impl Into<PathBuf>, cause: S) -> Self {
        Self::Encode {
            path: path.into(),
            message: cause.to_string(),
        }
    }

    /// Create a new panic error
    pub fn panicked<S: Into<String>>(message: S) -> Self {
        Self::Panicked {
            message: message.into(),
        }
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Failure kind for per-file errors, `None` for setup-level errors
    pub fn kind(&self) -> Option<FailureKind> {
        match self {
            Self::Open { .. } => Some(FailureKind::Open),
            Self::Decode { .. } => Some(FailureKind::Decode),
            Self::Create { .. } => Some(FailureKind::Create),
            Self::UnsupportedFormat { .. } => Some(FailureKind::UnsupportedFormat),
            Self::Encode { .. } => Some(FailureKind::Encode),
            Self::Cancelled => Some(FailureKind::Cancelled),
            Self::Panicked { .. } => Some(FailureKind::Panicked),
            Self::ConfigError { .. } | Self::SerdeError(_) | Self::IoError(_) => None,
        }
    }

    /// Check if this error belongs to a single file (the batch continues)
    pub fn is_per_file(&self) -> bool {
        self.kind().is_some()
    }

    /// Get the associated file path if available
    pub fn file_path(&self) -> Option<&PathBuf> {
        match self {
            Self::Open { path, .. }
            | Self::Decode { path, .. }
            | Self::Create { path, .. }
            | Self::Encode { path, .. } => Some(path),
            _ => None,
        }
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::UnsupportedFormat { extension: Some(ext) } => {
                format!("Unsupported image format: .{}. Supported formats: {}",
                        ext, supported_extensions())
            }
            Self::UnsupportedFormat { extension: None } => {
                format!("Unsupported image format: file has no extension. Supported formats: {}",
                        supported_extensions())
            }
            Self::Create { .. } => {
                format!("{}. The output directory must exist before the run.", self)
            }
            other => other.to_string(),
        }
    }
}

// Convert serde errors to our error type
impl From<toml::de::Error> for GrayBatchError {
    fn from(err: toml::de::Error) -> Self {
        Self::SerdeError(format!("TOML parsing error: {}", err))
    }
}

impl From<serde_yaml::Error> for GrayBatchError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::SerdeError(format!("YAML parsing error: {}", err))
    }
}

impl From<serde_json::Error> for GrayBatchError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerdeError(format!("JSON error: {}", err))
    }
}
