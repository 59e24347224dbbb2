//! Per-file grayscale conversion

use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::config::ImageFormat;
use crate::error::{Result, GrayBatchError, FailureKind};
use crate::parallel::CancellationToken;

pub mod codec;
pub mod formats;
pub mod grayscale;

pub use codec::*;
pub use formats::*;
pub use grayscale::*;

/// One input file paired with the shared output directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    /// Position of the input in the submitted batch
    pub index: usize,
    pub input_path: PathBuf,
    pub output_dir: PathBuf,
}

impl Task {
    pub fn new(index: usize, input_path: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            index,
            input_path: input_path.into(),
            output_dir: output_dir.into(),
        }
    }

    /// Build one task per input, in submission order
    pub fn batch<I, P>(inputs: I, output_dir: &Path) -> Vec<Task>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        inputs
            .into_iter()
            .enumerate()
            .map(|(index, input)| Task::new(index, input, output_dir))
            .collect()
    }
}

/// Terminal status of one task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    Success,
    Failure,
}

/// Result record emitted exactly once per task
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Outcome {
    pub input_path: PathBuf,
    pub status: OutcomeStatus,
    /// Input path on success, human-readable cause on failure
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<FailureKind>,
}

impl Outcome {
    pub fn success(input_path: impl Into<PathBuf>, output_path: impl Into<PathBuf>) -> Self {
        let input_path = input_path.into();
        Self {
            detail: input_path.display().to_string(),
            input_path,
            status: OutcomeStatus::Success,
            output_path: Some(output_path.into()),
            kind: None,
        }
    }

    pub fn failure(input_path: impl Into<PathBuf>, error: &GrayBatchError) -> Self {
        Self {
            input_path: input_path.into(),
            status: OutcomeStatus::Failure,
            detail: error.to_string(),
            output_path: None,
            kind: error.kind(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == OutcomeStatus::Success
    }
}

/// Details of a successfully written file
#[derive(Debug, Clone)]
pub struct ProcessedFile {
    pub output_path: PathBuf,
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
}

/// Output location for an input: `output_dir` joined with the input's file name
pub fn output_path_for(input_path: &Path, output_dir: &Path) -> Result<PathBuf> {
    let file_name = input_path.file_name().ok_or_else(|| {
        GrayBatchError::create(input_path, "input path has no file name")
    })?;
    Ok(output_dir.join(file_name))
}

/// Converts single files: open, decode, grayscale, create, encode
pub struct FileProcessor<C = ImageCodec> {
    codec: C,
}

impl FileProcessor<ImageCodec> {
    /// Create a processor using the `image` crate codec
    pub fn new() -> Self {
        Self::with_codec(ImageCodec::new())
    }
}

impl Default for FileProcessor<ImageCodec> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Codec> FileProcessor<C> {
    /// Create a processor around a custom codec
    pub fn with_codec(codec: C) -> Self {
        Self { codec }
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    /// Process a task to completion and report its outcome
    pub fn process(&self, task: &Task) -> Outcome {
        self.process_cancellable(task, &CancellationToken::new())
    }

    /// Process a task, stopping at the next step boundary once `cancel` fires
    pub fn process_cancellable(&self, task: &Task, cancel: &CancellationToken) -> Outcome {
        let start_time = Instant::now();
        match self.convert(task, cancel) {
            Ok(processed) => {
                debug!(
                    "Processed {:?} -> {:?} ({}x{}, {:?}) in {:.3}s",
                    task.input_path, processed.output_path,
                    processed.width, processed.height, processed.format,
                    start_time.elapsed().as_secs_f64()
                );
                Outcome::success(&task.input_path, processed.output_path)
            }
            Err(error) if error.is_per_file() => {
                let path = error.file_path().unwrap_or(&task.input_path);
                debug!("Failed to process {:?}: {}", path, error.user_message());
                Outcome::failure(&task.input_path, &error)
            }
            Err(error) => {
                error!("Unexpected error processing {:?}: {}", task.input_path, error);
                Outcome::failure(&task.input_path, &error)
            }
        }
    }

    fn convert(&self, task: &Task, cancel: &CancellationToken) -> Result<ProcessedFile> {
        let input_path = task.input_path.as_path();
        cancel.check()?;

        let bytes = {
            let mut input = File::open(input_path)
                .map_err(|e| GrayBatchError::open(input_path, e))?;
            let mut bytes = Vec::new();
            input.read_to_end(&mut bytes)
                .map_err(|e| GrayBatchError::decode(input_path, e))?;
            bytes
        };

        let decoded = self.codec.decode(&bytes)
            .map_err(|e| GrayBatchError::decode(input_path, e))?;
        drop(bytes);
        cancel.check()?;

        let gray = grayscale(&decoded.image).into_buffer();
        drop(decoded.image);

        let output_path = output_path_for(input_path, &task.output_dir)?;
        cancel.check()?;
        let output = File::create(&output_path)
            .map_err(|e| GrayBatchError::create(&output_path, e))?;

        let format = detect_format_from_path(input_path)?;
        if from_decoded_tag(decoded.format) != Some(format) {
            warn!(
                "{:?} decoded as {:?} but will be encoded as {:?} based on its extension",
                input_path, decoded.format, format
            );
        }

        let mut writer = BufWriter::new(output);
        self.codec.encode(&gray, format, &mut writer)
            .map_err(|e| GrayBatchError::encode(&output_path, e))?;
        writer.flush()
            .map_err(|e| GrayBatchError::encode(&output_path, e))?;

        Ok(ProcessedFile {
            output_path,
            format,
            width: gray.width(),
            height: gray.height(),
        })
    }
}
