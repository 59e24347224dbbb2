//! GrayBatch - Concurrent Batch Grayscale Converter
//!
//! Converts a batch of PNG and JPEG files to 8-bit grayscale. Each file is
//! handled by one task on a bounded worker pool; every task reports exactly
//! one [`Outcome`], and a failure in one file never affects another.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use graybatch::{BatchCoordinator, ReportFormat, ResultReporter};
//! use std::path::Path;
//!
//! # async fn run() -> graybatch::Result<()> {
//! let coordinator = BatchCoordinator::new();
//! let stream = coordinator.run(["a.png", "b.jpg"], Path::new("out"));
//!
//! let mut reporter = ResultReporter::new(std::io::stdout(), ReportFormat::Text);
//! let summary = reporter.drain(stream).await?;
//! println!("{} of {} converted", summary.succeeded, summary.total);
//! # Ok(())
//! # }
//! ```

#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod parallel;
pub mod processing;
pub mod report;

// Re-export commonly used types
pub use config::{BatchConfig, Concurrency, Config, ImageFormat};
pub use error::{FailureKind, GrayBatchError, Result};
pub use parallel::{BatchCoordinator, CancellationToken, OutcomeStream};
pub use processing::{grayscale, Codec, FileProcessor, ImageCodec, Outcome, OutcomeStatus, Task};
pub use report::{BatchSummary, ReportFormat, ResultReporter};

use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize GrayBatch with default settings
///
/// Sets up logging to stderr (honouring `RUST_LOG`) and checks system
/// resources. Safe to call more than once; later calls keep the first
/// subscriber.
pub fn init() -> Result<()> {
    if tracing::subscriber::set_global_default(
        tracing_subscriber::FmtSubscriber::builder()
            .with_env_filter(EnvFilter::from_default_env())
            .with_writer(std::io::stderr)
            .finish()
    ).is_ok() {
        info!("GrayBatch v{} initialized", VERSION);
    }

    validate_system_requirements();

    Ok(())
}

/// Initialize with custom configuration
pub fn init_with_config(config: &config::Config) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    let installed = if config.logging.json_format {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init()
    };

    if installed.is_ok() {
        info!("GrayBatch v{} initialized with custom config", VERSION);
    }

    validate_system_requirements();

    Ok(())
}

fn validate_system_requirements() {
    use sysinfo::{System, SystemExt};

    let mut system = System::new();
    system.refresh_memory();

    // Check available memory
    let available_memory = system.available_memory();
    const MIN_MEMORY_MB: u64 = 256;

    if available_memory < MIN_MEMORY_MB * 1024 * 1024 {
        warn!(
            "Low available memory: {}MB (recommended: >{}MB)",
            available_memory / (1024 * 1024),
            MIN_MEMORY_MB
        );
    }

    info!("Detected {} logical CPUs", num_cpus::get());
    info!("Encoders: PNG {}, JPEG {}",
          image::ImageFormat::Png.can_write(),
          image::ImageFormat::Jpeg.can_write());
}
