//! Configuration management for GrayBatch

use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use crate::error::{Result, GrayBatchError};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Batch inputs and worker settings
    pub batch: BatchConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Batch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Input image paths, processed as one batch
    pub inputs: Vec<PathBuf>,

    /// Existing directory that receives the grayscale files
    pub output_dir: PathBuf,

    /// Number of worker threads (None = auto-detect)
    pub workers: Option<usize>,

    /// Launch one worker per input instead of a bounded pool
    pub unbounded: bool,

    /// Capacity of the outcome channel between workers and the reporter
    pub channel_capacity: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            inputs: vec![
                PathBuf::from("file1.jpg"),
                PathBuf::from("file2.jpg"),
                PathBuf::from("file3.jpg"),
            ],
            output_dir: PathBuf::from("output/"),
            workers: None, // Auto-detect
            unbounded: false,
            channel_capacity: 64,
        }
    }
}

impl BatchConfig {
    /// Concurrency policy described by this configuration
    pub fn concurrency(&self) -> Concurrency {
        if self.unbounded {
            Concurrency::Unbounded
        } else {
            self.workers
                .map(Concurrency::Bounded)
                .unwrap_or_default()
        }
    }
}

/// How many workers a batch may run at once
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Concurrency {
    /// At most this many files in flight
    Bounded(usize),
    /// One worker per input file
    Unbounded,
}

impl Default for Concurrency {
    fn default() -> Self {
        // Use number of logical CPUs, but cap at 16 to bound open files and memory
        Self::Bounded(num_cpus::get().min(16))
    }
}

impl Concurrency {
    /// Worker count for a batch of `task_count` files
    pub fn worker_count(self, task_count: usize) -> usize {
        match self {
            Self::Bounded(limit) => limit.max(1).min(task_count),
            Self::Unbounded => task_count,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Enable JSON logging
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

/// Output encodings selected from the input extension
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// Lossless
    Png,
    /// Lossy, encoder default quality
    Jpeg,
}

impl ImageFormat {
    /// Every output encoding, in dispatch order
    pub const ALL: [ImageFormat; 2] = [Self::Png, Self::Jpeg];

    /// Encoding whose extension matches `extension` (ASCII case-insensitive)
    pub fn from_extension(extension: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|format| format.extension().eq_ignore_ascii_case(extension))
    }

    /// Get file extension for this format
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
        }
    }

    /// Whether the encoding discards information
    pub fn is_lossy(self) -> bool {
        matches!(self, Self::Jpeg)
    }
}

impl Config {
    /// Load configuration from file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .map_err(|e| GrayBatchError::config(
                format!("Failed to read config file {:?}: {}", path.as_ref(), e)
            ))?;

        let extension = path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("");

        match extension.to_lowercase().as_str() {
            "toml" => toml::from_str(&content).map_err(Into::into),
            "yaml" | "yml" => serde_yaml::from_str(&content).map_err(Into::into),
            _ => Err(GrayBatchError::config(
                "Unsupported config file format. Use .toml or .yaml"
            )),
        }
    }

    /// Save configuration to file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let extension = path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("");

        let content = match extension.to_lowercase().as_str() {
            "toml" => toml::to_string_pretty(self)
                .map_err(|e| GrayBatchError::config(format!("TOML serialization failed: {}", e)))?,
            "yaml" | "yml" => serde_yaml::to_string(self)
                .map_err(|e| GrayBatchError::config(format!("YAML serialization failed: {}", e)))?,
            _ => return Err(GrayBatchError::config(
                "Unsupported config file format. Use .toml or .yaml"
            )),
        };

        std::fs::write(&path, content)
            .map_err(|e| GrayBatchError::config(
                format!("Failed to write config file {:?}: {}", path.as_ref(), e)
            ))?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if let Some(workers) = self.batch.workers {
            if workers == 0 {
                return Err(GrayBatchError::config(
                    "Worker count must be greater than 0"
                ));
            }
        }

        if self.batch.channel_capacity == 0 {
            return Err(GrayBatchError::config(
                "Channel capacity must be greater than 0"
            ));
        }

        if self.batch.output_dir.as_os_str().is_empty() {
            return Err(GrayBatchError::config("Output directory must not be empty"));
        }

        if let Some(empty) = self.batch.inputs.iter().position(|p| p.as_os_str().is_empty()) {
            return Err(GrayBatchError::config(
                format!("Input #{} is an empty path", empty + 1)
            ));
        }

        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
            other => Err(GrayBatchError::config(
                format!("Unknown log level '{}'", other)
            )),
        }
    }

    /// Merge command-line overrides into this configuration (overrides win)
    pub fn merge(mut self, overrides: BatchOverrides) -> Self {
        if !overrides.inputs.is_empty() {
            self.batch.inputs = overrides.inputs;
        }
        if let Some(output_dir) = overrides.output_dir {
            self.batch.output_dir = output_dir;
        }
        if overrides.workers.is_some() {
            self.batch.workers = overrides.workers;
        }
        if overrides.unbounded {
            self.batch.unbounded = true;
        }

        self
    }
}

/// Values supplied on the command line that replace file settings
#[derive(Debug, Clone, Default)]
pub struct BatchOverrides {
    pub inputs: Vec<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub workers: Option<usize>,
    pub unbounded: bool,
}
