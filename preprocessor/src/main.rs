//! preprocessor - audio feature extraction CLI
//!
//! Converts every WAV recording in a dataset directory into an MFCC or
//! mel-spectrogram matrix saved as `<stem>_<kind>.npy`.
//!
//! ```text
//! preprocessor <FEATURE_KIND> <DATASET_PATH> <OUTPUT_PATH> [OPTIONS]
//! preprocessor inspect <FEATURE_FILE>
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use preprocessor::{load_feature, FeatureKind, Pipeline, RunReport};
use preprocessor_common::config::{resolve_toml_config, ConfigSource, ParamOverrides};
use preprocessor_common::logging::init_logging;
use preprocessor_common::PipelineConfig;
use tracing::{error, info, warn};

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "preprocessor")]
#[command(about = "Extract MFCC or mel-spectrogram features from a directory of WAV files")]
#[command(version)]
#[command(args_conflicts_with_subcommands = true, subcommand_negates_reqs = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    run: RunArgs,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the shape and value range of a saved feature file
    Inspect {
        #[arg(value_name = "FEATURE_FILE")]
        file: PathBuf,
    },
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Feature to extract: mfccs or melspectrograms
    #[arg(value_name = "FEATURE_KIND", required = true)]
    feature_kind: Option<FeatureKind>,

    /// Directory containing the WAV recordings
    #[arg(value_name = "DATASET_PATH", required = true)]
    dataset_path: Option<PathBuf>,

    /// Existing directory receiving the .npy files
    #[arg(value_name = "OUTPUT_PATH", required = true)]
    output_path: Option<PathBuf>,

    /// TOML configuration file
    #[arg(long, value_name = "FILE", env = "PREPROCESSOR_CONFIG")]
    config: Option<PathBuf>,

    /// Target sample rate in Hz
    #[arg(long, env = "PREPROCESSOR_SAMPLE_RATE")]
    sample_rate: Option<u32>,

    /// Mel bands of the mel-spectrogram
    #[arg(long, env = "PREPROCESSOR_MEL_BANDS")]
    mel_bands: Option<usize>,

    /// Cepstral coefficients kept per frame
    #[arg(long, env = "PREPROCESSOR_N_MFCC")]
    n_mfcc: Option<usize>,

    /// FFT window size in samples
    #[arg(long, env = "PREPROCESSOR_N_FFT")]
    n_fft: Option<usize>,

    /// Frame advance in samples
    #[arg(long, env = "PREPROCESSOR_HOP_LENGTH")]
    hop_length: Option<usize>,

    /// Process one recording at a time instead of loading the whole dataset
    #[arg(long)]
    streaming: bool,

    /// Log filter (e.g. info, debug); RUST_LOG takes precedence
    #[arg(long, env = "PREPROCESSOR_LOG_LEVEL")]
    log_level: Option<String>,
}

impl RunArgs {
    fn overrides(&self) -> ParamOverrides {
        ParamOverrides {
            sample_rate: self.sample_rate,
            mel_bands: self.mel_bands,
            n_mfcc: self.n_mfcc,
            n_fft: self.n_fft,
            hop_length: self.hop_length,
        }
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    match cli.command {
        Some(Command::Inspect { file }) => {
            init_logging("warn")?;
            inspect(&file)
        }
        None => run(cli.run),
    }
}

fn run(args: RunArgs) -> Result<ExitCode> {
    let (Some(kind), Some(dataset_path), Some(output_path)) = (
        args.feature_kind,
        args.dataset_path.clone(),
        args.output_path.clone(),
    ) else {
        anyhow::bail!("FEATURE_KIND, DATASET_PATH and OUTPUT_PATH are required");
    };

    let resolved = resolve_toml_config(args.config.as_deref())?;
    let level = args
        .log_level
        .clone()
        .unwrap_or_else(|| resolved.toml.logging.level.clone());
    init_logging(&level)?;

    info!(
        "Starting preprocessor {} ({}, built {}, {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    match &resolved.source {
        ConfigSource::File(path) => info!("Configuration loaded from {}", path.display()),
        ConfigSource::Defaults(Some(path)) => {
            info!("No config file at {}, using defaults", path.display())
        }
        ConfigSource::Defaults(None) => {
            warn!("Could not determine config directory, using defaults")
        }
    }

    let missing = missing_directories(&[&dataset_path, &output_path]);
    if !missing.is_empty() {
        for path in missing {
            error!("Directory not found: {}", path.display());
        }
        return Ok(ExitCode::FAILURE);
    }

    let params = resolved.toml.extraction.with_overrides(&args.overrides());
    let config = PipelineConfig::new(dataset_path, output_path, params)
        .context("Invalid extraction parameters")?;

    let mut pipeline = Pipeline::new(config);
    let report = if args.streaming {
        pipeline.run_streaming(kind)
    } else {
        pipeline.run(kind)
    }
    .context("Feature extraction failed")?;

    Ok(summarize(&report))
}

fn missing_directories<'a>(paths: &[&'a PathBuf]) -> Vec<&'a PathBuf> {
    paths.iter().copied().filter(|p| !p.is_dir()).collect()
}

fn summarize(report: &RunReport) -> ExitCode {
    for skipped in &report.skipped {
        warn!(path = %skipped.path.display(), "Skipped: {}", skipped.reason);
    }
    for failure in &report.failed {
        error!(path = %failure.path.display(), "Write failed: {}", failure.error);
    }

    info!(
        "Finished {}: {} processed, {} written, {} skipped, {} failed",
        report.kind,
        report.processed,
        report.written.len(),
        report.skipped.len(),
        report.failed.len()
    );

    if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn inspect(path: &Path) -> Result<ExitCode> {
    let data = load_feature(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let (bands, frames) = data.dim();

    println!("{}", path.display());
    println!("  shape: ({}, {})", bands, frames);

    if data.is_empty() {
        println!("  empty");
        return Ok(ExitCode::SUCCESS);
    }

    let min = data.iter().copied().fold(f32::INFINITY, f32::min);
    let max = data.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let mean = data.iter().map(|&v| v as f64).sum::<f64>() / data.len() as f64;
    println!("  min: {:.6}  max: {:.6}  mean: {:.6}", min, max, mean);

    Ok(ExitCode::SUCCESS)
}
