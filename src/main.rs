//! GrayBatch CLI - Concurrent Batch Grayscale Converter
//!
//! Converts the given PNG/JPEG files to grayscale into an existing output
//! directory, printing one line per file followed by a completion marker.

use std::path::{Path, PathBuf};
use std::process;

use anyhow::Context;
use clap::{Parser, Subcommand};
use console::style;
use tracing::{info, warn};

use graybatch::config::BatchOverrides;
use graybatch::{
    init_with_config, BatchCoordinator, Config, GrayBatchError, ImageFormat, ReportFormat,
    ResultReporter,
};

/// Exit status when `--fail-on-error` is set and a file failed
const EXIT_PARTIAL_FAILURE: i32 = 2;

/// GrayBatch - Concurrent Batch Grayscale Converter
#[derive(Parser)]
#[command(
    name = "graybatch",
    version,
    about = "Convert a batch of PNG/JPEG images to grayscale concurrently",
    long_about = "GrayBatch converts each input image to 8-bit grayscale and writes it under the \
                  same file name into an existing output directory. Files are processed in \
                  parallel on a bounded worker pool; each file reports success or failure \
                  independently."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Input image files (.png or .jpg)
    #[arg(value_name = "INPUT")]
    inputs: Vec<PathBuf>,

    /// Output directory (must already exist)
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Number of worker threads (default: auto-detect)
    #[arg(short, long, value_name = "COUNT", value_parser = clap::value_parser!(usize))]
    workers: Option<usize>,

    /// Start one worker per input instead of a bounded pool
    #[arg(long, conflicts_with = "workers")]
    unbounded: bool,

    /// Configuration file path (.toml or .yaml)
    #[arg(short, long, value_name = "FILE", env = "GRAYBATCH_CONFIG")]
    config: Option<PathBuf>,

    /// Output results as JSON lines
    #[arg(long)]
    json: bool,

    /// Exit with status 2 if any file failed
    #[arg(long)]
    fail_on_error: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Quiet mode (errors only)
    #[arg(short = 'Q', long, conflicts_with = "verbose")]
    quiet: bool,
}

/// Available subcommands
#[derive(Subcommand)]
enum Commands {
    /// Validate configuration file
    Config {
        /// Configuration file to validate
        file: PathBuf,
    },
    /// Generate example configuration file
    ExampleConfig {
        /// Output file path
        #[arg(short, long, default_value = "graybatch.toml")]
        output: PathBuf,
        /// Use YAML format instead of TOML
        #[arg(long)]
        yaml: bool,
    },
    /// Show system information and capabilities
    Info,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Some(command) = cli.command {
        if let Err(e) = handle_subcommand(command) {
            eprintln!("{}: {}", style("Error").red().bold(), render_error(&e));
            process::exit(1);
        }
        return;
    }

    match run(cli).await {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("{}: {}", style("Error").red().bold(), render_error(&e));
            process::exit(1);
        }
    }
}

/// Run one batch and return the process exit code
async fn run(cli: Cli) -> anyhow::Result<i32> {
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => Config::default(),
    };

    if cli.quiet {
        config.logging.level = "error".to_string();
    } else if cli.verbose {
        config.logging.level = "debug".to_string();
    }

    let config = config.merge(BatchOverrides {
        inputs: cli.inputs,
        output_dir: cli.output,
        workers: cli.workers,
        unbounded: cli.unbounded,
    });
    config.validate().context("Invalid configuration")?;

    init_with_config(&config)?;

    let batch = &config.batch;
    if !batch.output_dir.is_dir() {
        warn!("Output directory {:?} does not exist; every file will fail", batch.output_dir);
    }

    info!("Output: {:?}", batch.output_dir);
    info!("Concurrency: {:?}", batch.concurrency());

    let coordinator = BatchCoordinator::from_config(batch);
    install_interrupt_handler(&coordinator);

    let stream = coordinator.run(batch.inputs.iter().cloned(), &batch.output_dir);
    let format = if cli.json { ReportFormat::Json } else { ReportFormat::Text };
    let mut reporter = ResultReporter::new(std::io::stdout(), format);
    let summary = reporter.drain(stream).await?;

    if summary.has_failures() && cli.fail_on_error {
        return Ok(EXIT_PARTIAL_FAILURE);
    }
    Ok(0)
}

/// Context chain, with the library's friendlier wording for its own errors
fn render_error(e: &anyhow::Error) -> String {
    let outermost = e.chain().next().and_then(|err| err.downcast_ref::<GrayBatchError>());
    match (outermost, e.downcast_ref::<GrayBatchError>()) {
        (Some(inner), _) => inner.user_message(),
        (None, Some(inner)) => format!("{}: {}", e, inner.user_message()),
        (None, None) => format!("{:#}", e),
    }
}

/// Cancel the batch on Ctrl-C; files not yet started report as cancelled
fn install_interrupt_handler(coordinator: &BatchCoordinator) {
    let token = coordinator.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling remaining files");
            token.cancel();
        }
    });
}

/// Handle subcommands
fn handle_subcommand(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Config { file } => validate_config_file(&file),
        Commands::ExampleConfig { output, yaml } => generate_example_config(&output, yaml),
        Commands::Info => {
            show_system_info();
            Ok(())
        }
    }
}

/// Validate configuration file
fn validate_config_file(file_path: &Path) -> anyhow::Result<()> {
    let config = Config::from_file(file_path)?;
    config.validate()?;

    println!("{}: Configuration file is valid", style("Success").green().bold());
    println!("Inputs: {}", config.batch.inputs.len());
    println!("Output directory: {}", config.batch.output_dir.display());

    Ok(())
}

/// Generate example configuration file
fn generate_example_config(output_path: &Path, use_yaml: bool) -> anyhow::Result<()> {
    let output_path = if use_yaml {
        output_path.with_extension("yaml")
    } else {
        output_path.to_path_buf()
    };

    Config::default().to_file(&output_path)?;

    let format = if use_yaml { "YAML" } else { "TOML" };
    println!("{}: Generated example {} configuration: {}",
             style("Success").green().bold(),
             format,
             output_path.display());

    Ok(())
}

/// Show system information
fn show_system_info() {
    use sysinfo::{CpuExt, System, SystemExt};

    println!("{}", style("GrayBatch System Information").bold());
    println!();
    println!("{}: {}", style("Version").bold(), graybatch::VERSION);
    println!();

    let mut system = System::new_all();
    system.refresh_all();

    println!("{}", style("System:").bold());
    if let Some(name) = system.name() {
        println!("  OS: {}", name);
    }
    if let Some(version) = system.os_version() {
        println!("  Version: {}", version);
    }
    println!("  CPUs: {}", system.cpus().len());
    if let Some(cpu) = system.cpus().first() {
        println!("  CPU: {} ({:.2} GHz)", cpu.brand(), cpu.frequency() as f64 / 1000.0);
    }
    println!("  Memory: {:.2} GB total, {:.2} GB available",
             system.total_memory() as f64 / 1024.0 / 1024.0 / 1024.0,
             system.available_memory() as f64 / 1024.0 / 1024.0 / 1024.0);
    println!("  Default workers: {:?}", graybatch::Concurrency::default());
    println!();

    println!("{}", style("Formats:").bold());
    println!("  Input: anything the decoder recognizes (PNG, JPEG, GIF, WebP, TIFF)");
    for format in ImageFormat::ALL {
        let quality = if format.is_lossy() { "lossy, default quality" } else { "lossless" };
        println!("  Output: .{} ({})", format.extension(), quality);
    }
}
