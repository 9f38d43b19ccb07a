//! xcode-png-optim: converts opaque PNG assets of an Xcode project into
//! optimized JPEGs and points the project at them.

use anyhow::Result;
use clap::{Parser, ValueEnum};
use owo_colors::OwoColorize;
use pngoptim_assets::{
    ConversionOptions, Converter, Outcome, Project, RunOptions, RunSummary, Runner,
};
use pngoptim_cli::output::{
    format_count, format_duration, format_savings, format_size, format_size_delta, report_error,
    Status,
};
use pngoptim_cli::progress::{self, ProgressBar};
use pngoptim_core::config::{Config, ConfigSchema, OptimizerConfig, OptimizerKind};
use pngoptim_core::error::exit_codes;
use pngoptim_image::{ImageCodec, JpegOptim, Optimizer, Passthrough};
use pngoptim_telemetry::TelemetryConfig;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

#[derive(Parser)]
#[command(name = "xcode-png-optim")]
#[command(about = "Scans an Xcode target for PNGs and converts all to optimized JPEGs")]
#[command(version)]
struct Cli {
    /// Project directory (the one containing the .xcodeproj)
    project: PathBuf,

    /// JPEG quality, 1-100
    #[arg(short, long, value_name = "N")]
    quality: Option<u8>,

    /// Leave PNGs smaller than this alone
    #[arg(long, value_name = "BYTES")]
    min_size: Option<u64>,

    /// Manifest to read instead of discovering them (repeatable)
    #[arg(short, long = "manifest", value_name = "PATH")]
    manifests: Vec<PathBuf>,

    /// Worker threads (0 = one per core)
    #[arg(short, long, value_name = "N")]
    jobs: Option<usize>,

    /// Reject JPEGs larger than this fraction of the PNG
    #[arg(long, value_name = "RATIO")]
    max_ratio: Option<f64>,

    /// Lossless optimizer run on each JPEG
    #[arg(long, value_enum, value_name = "NAME")]
    optimizer: Option<OptimizerKind>,

    /// Configuration file (default: .xcode-png-optim.toml in the project)
    #[arg(short, long, value_name = "FILE", env = "XCODE_PNG_OPTIM_CONFIG")]
    config: Option<PathBuf>,

    /// Report what would be converted without touching any file
    #[arg(long)]
    dry_run: bool,

    /// Trust the PNG header for transparency instead of checking pixels
    #[arg(long)]
    header_alpha_only: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    session_id: &'a str,
    project: &'a Path,
    config: Option<&'a Path>,
    optimizer: &'a str,
    #[serde(flatten)]
    summary: &'a RunSummary,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                exit_code(exit_codes::CONFIG_ERROR)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    if let Err(e) = pngoptim_telemetry::init_with_config(TelemetryConfig::for_verbosity(cli.verbose)) {
        Status::warning(&format!("Logging disabled: {}", e));
    }

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => match err.downcast_ref::<pngoptim_core::Error>() {
            Some(e) => {
                report_error(e);
                exit_code(e.exit_code())
            }
            None => {
                Status::error(&format!("{:#}", err));
                exit_code(exit_codes::FAILURE)
            }
        },
    }
}

fn exit_code(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}

fn run(cli: &Cli) -> Result<()> {
    let project = Project::open(&cli.project, &cli.manifests)?;
    let config = Config::load(project.root(), cli.config.as_deref())?;
    let schema = apply_overrides(config.schema.clone(), cli)?;
    tracing::debug!(config = ?config.path, ?schema, "configuration resolved");

    let text = cli.format == OutputFormat::Text;
    let optimizer = build_optimizer(&schema.optimizer, text);
    let converter = Converter::new(
        Arc::new(ImageCodec),
        optimizer,
        ConversionOptions::from(&schema.conversion),
    );
    let options = RunOptions {
        dry_run: cli.dry_run,
        ..RunOptions::from(&schema.policy)
    };

    let scanning = if text {
        progress::spinner("Scanning assets")
    } else {
        progress::hidden()
    };
    let converting: OnceLock<ProgressBar> = OnceLock::new();
    let summary = Runner::new(&project, &converter, options).run_with(
        |total| {
            scanning.finish_and_clear();
            let pb = if text {
                progress::conversion_progress(total as u64)
            } else {
                progress::hidden()
            };
            let _ = converting.set(pb);
        },
        |_| {
            if let Some(pb) = converting.get() {
                pb.inc(1);
            }
        },
    );
    scanning.finish_and_clear();
    if let Some(pb) = converting.get() {
        match &summary {
            Ok(summary) => progress::finish_success(
                pb,
                &format!("{} converted", format_count(summary.converted, "image", "images")),
            ),
            Err(_) => progress::finish_error(pb, "run aborted"),
        }
    }
    let summary = summary?;

    match cli.format {
        OutputFormat::Json => {
            let report = JsonReport {
                session_id: pngoptim_telemetry::session_id(),
                project: project.root(),
                config: config.path.as_deref(),
                optimizer: converter.optimizer_name(),
                summary: &summary,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Text => print_summary(&summary),
    }
    Ok(())
}

/// Layer command-line flags over the loaded configuration.
fn apply_overrides(mut schema: ConfigSchema, cli: &Cli) -> pngoptim_core::Result<ConfigSchema> {
    if let Some(quality) = cli.quality {
        schema.conversion.quality = quality;
    }
    if let Some(ratio) = cli.max_ratio {
        schema.conversion.max_output_ratio = ratio;
    }
    if let Some(jobs) = cli.jobs {
        schema.conversion.jobs = jobs;
    }
    if let Some(min_size) = cli.min_size {
        schema.policy.min_size_bytes = min_size;
    }
    if cli.header_alpha_only {
        schema.policy.inspect_alpha_pixels = false;
    }
    if let Some(kind) = cli.optimizer {
        schema.optimizer.kind = kind;
    }
    schema.validate()?;
    Ok(schema)
}

fn build_optimizer(config: &OptimizerConfig, text: bool) -> Arc<dyn Optimizer> {
    match config.kind {
        OptimizerKind::None => Arc::new(Passthrough),
        OptimizerKind::Jpegoptim => match JpegOptim::locate(&config.program, config.args.clone()) {
            Ok(optimizer) => {
                tracing::debug!(program = %optimizer.program().display(), "using jpegoptim");
                Arc::new(optimizer)
            }
            Err(e) => {
                tracing::warn!(error = %e, "optimizer unavailable, JPEGs will not be optimized");
                if text {
                    Status::warning(&format!(
                        "{} not found; JPEGs will be written without lossless optimization",
                        config.program
                    ));
                }
                Arc::new(Passthrough)
            }
        },
    }
}

fn print_summary(summary: &RunSummary) {
    if summary.dry_run {
        Status::info(&format!(
            "Dry run: {} would be converted",
            format_count(summary.would_convert, "image", "images")
        ));
    } else if summary.converted > 0 {
        Status::success(&format!(
            "Converted {}, saved {} ({})",
            format_count(summary.converted, "image", "images"),
            format_size_delta(summary.bytes_saved()),
            format_savings(summary.bytes_before, summary.bytes_after)
        ));
    } else {
        Status::info("Nothing to convert");
    }

    Status::header("Summary");
    if summary.dry_run {
        Status::detail("Would convert", &summary.would_convert.to_string());
    } else {
        Status::detail("Converted", &summary.converted.to_string());
    }
    Status::detail("Skipped", &summary.skipped_total().to_string());
    for (reason, count) in &summary.skipped {
        Status::detail(&format!("  {}", reason), &count.to_string());
    }
    Status::detail("Failed", &summary.failed.to_string());
    if !summary.dry_run {
        Status::detail(
            "Bytes saved",
            &format!(
                "{} ({} -> {})",
                format_size_delta(summary.bytes_saved()),
                format_size(summary.bytes_before),
                format_size(summary.bytes_after)
            ),
        );
        Status::detail("Manifests updated", &summary.rewrite.manifests_saved.to_string());
    }
    Status::detail("Duration", &format_duration(Duration::from_millis(summary.duration_ms)));

    if summary.failed > 0 {
        Status::subheader("Failures");
        for result in summary.failures() {
            if let Outcome::Failed(error) = &result.outcome {
                println!("  {} {}: {}", "✗".red(), result.source.display(), error);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pngoptim_core::ErrorCode;

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["xcode-png-optim", "."];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_flags_override_config() {
        let schema = apply_overrides(
            ConfigSchema::default(),
            &cli(&["--quality", "70", "--min-size", "4096", "--optimizer", "none", "--header-alpha-only"]),
        )
        .unwrap();
        assert_eq!(schema.conversion.quality, 70);
        assert_eq!(schema.policy.min_size_bytes, 4096);
        assert_eq!(schema.optimizer.kind, OptimizerKind::None);
        assert!(!schema.policy.inspect_alpha_pixels);
    }

    #[test]
    fn test_out_of_range_flag_is_config_error() {
        let err = apply_overrides(ConfigSchema::default(), &cli(&["--quality", "0"])).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidConfigValue);
        assert_eq!(err.exit_code(), exit_codes::CONFIG_ERROR);

        let err = apply_overrides(ConfigSchema::default(), &cli(&["--max-ratio", "1.5"])).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidConfigValue);
    }

    #[test]
    fn test_unknown_optimizer_is_rejected_by_parser() {
        let err = Cli::try_parse_from(["xcode-png-optim", ".", "--optimizer", "mozjpeg"])
            .err()
            .unwrap();
        assert!(err.use_stderr());
        assert_eq!(err.kind(), clap::error::ErrorKind::InvalidValue);
    }

    #[test]
    fn test_missing_optimizer_falls_back() {
        let config = OptimizerConfig {
            kind: OptimizerKind::Jpegoptim,
            program: "definitely-not-installed-jpegoptim".to_string(),
            args: Vec::new(),
        };
        assert_eq!(build_optimizer(&config, false).name(), "none");
    }
}
