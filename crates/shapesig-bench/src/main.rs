//! shapesig-bench: CLI tool for descriptor parameter experimentation and diagnostics.
//!
//! Runs shape extraction on a given image file with configurable
//! parameters, printing per-stage diagnostics. Useful for:
//!
//! - Comparing encoders (`coarse`, `fine`, `resampled`)
//! - Tuning the background threshold and histogram resolution
//! - Measuring per-stage durations to identify bottlenecks
//! - Checking how many harmonics a smoothed outline needs
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin shapesig-bench -- [OPTIONS] <IMAGE_PATH>
//! ```
//!
//! Logging goes to stderr and is controlled with `RUST_LOG`.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::{Parser, ValueEnum};
use shapesig_export::{ContourLayer, SvgMetadata};
use shapesig_pipeline::diagnostics::{Clock, ExtractionDiagnostics, extract_with_diagnostics};
use shapesig_pipeline::{
    Dimensions, EncoderKind, GrayImage, ShapeConfig, SpectralContext, ThresholdedImage,
};
use tracing_subscriber::EnvFilter;

/// Shape descriptor experimentation and diagnostics for shapesig.
///
/// Traces the foreground region of an image, encodes it with the chosen
/// Fourier descriptor and prints per-stage timing and count diagnostics.
#[derive(Parser)]
#[command(name = "shapesig-bench", version)]
struct Cli {
    /// Path to the input image (PNG, JPEG, BMP, WebP).
    image_path: PathBuf,

    /// Background threshold: pixels brighter than this are foreground.
    #[arg(long, default_value_t = ShapeConfig::DEFAULT_THRESHOLD)]
    threshold: u8,

    /// Descriptor encoder.
    #[arg(long, value_enum, default_value_t = Encoder::Coarse)]
    encoder: Encoder,

    /// Bucket count for the resampled encoder.
    #[arg(long, default_value_t = 32, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    buckets: usize,

    /// Distance histogram bucket count (0 disables the histogram).
    #[arg(long, default_value_t = ShapeConfig::DEFAULT_HISTOGRAM_BUCKETS)]
    histogram_buckets: usize,

    /// Also reconstruct a smoothed outline keeping this many harmonics per side.
    #[arg(long)]
    smoothing_harmonics: Option<usize>,

    /// Extract every connected region instead of a single one.
    #[arg(long)]
    all_regions: bool,

    /// Minimum region size in pixels (with `--all-regions`).
    #[arg(long, default_value_t = ShapeConfig::DEFAULT_MIN_REGION_PIXELS)]
    min_region_pixels: usize,

    /// Write SVG output to file.
    #[arg(long)]
    svg: Option<PathBuf>,

    /// Number of runs for averaging.
    #[arg(long, default_value_t = 1, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    runs: usize,

    /// Output reports and diagnostics as JSON instead of human-readable text.
    #[arg(long)]
    json: bool,

    /// Full extraction config as a JSON string.
    ///
    /// When provided, all other extraction parameter flags are ignored.
    /// The JSON must be a valid `ShapeConfig` serialization.
    #[arg(long)]
    config_json: Option<String>,
}

/// Descriptor encoder selection.
#[derive(Clone, Copy, ValueEnum)]
enum Encoder {
    /// Fifteen harmonic magnitudes plus five radial bucket means.
    Coarse,
    /// Sixteen region means over a fixed spectral partition.
    Fine,
    /// Resample to `--buckets` points, then a dense DFT.
    Resampled,
}

/// Build a [`ShapeConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and all
/// individual parameter flags are ignored. Otherwise, a config is
/// assembled from the individual flags.
fn config_from_cli(cli: &Cli) -> Result<ShapeConfig, String> {
    let config = if let Some(ref json) = cli.config_json {
        serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"))?
    } else {
        ShapeConfig {
            threshold: cli.threshold,
            encoder: match cli.encoder {
                Encoder::Coarse => EncoderKind::Coarse,
                Encoder::Fine => EncoderKind::Fine,
                Encoder::Resampled => EncoderKind::Resampled {
                    buckets: cli.buckets,
                },
            },
            histogram_buckets: cli.histogram_buckets,
            smoothing_harmonics: cli.smoothing_harmonics,
            min_region_pixels: cli.min_region_pixels,
        }
    };
    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match config_from_cli(&cli) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let image = match image::open(&cli.image_path) {
        Ok(img) => img.to_luma8(),
        Err(e) => {
            eprintln!("Error decoding {}: {e}", cli.image_path.display());
            return ExitCode::FAILURE;
        }
    };
    let dimensions = Dimensions {
        width: image.width(),
        height: image.height(),
    };

    tracing::info!(
        path = %cli.image_path.display(),
        width = dimensions.width,
        height = dimensions.height,
        runs = cli.runs,
        encoder = config.encoder.name(),
        "loaded image"
    );
    eprintln!("Config: {config:#?}");
    eprintln!();

    let ctx = SpectralContext::new();

    if cli.all_regions {
        return run_all_regions(&cli, &image, &config, &ctx, dimensions);
    }

    let mut all_diagnostics = Vec::with_capacity(cli.runs);

    for run in 0..cli.runs {
        if cli.runs > 1 {
            eprintln!("--- Run {}/{} ---", run + 1, cli.runs);
        }

        let source = ThresholdedImage::new(&image, config.threshold);
        match extract_with_diagnostics(&source, &config, &ctx, &StdClock) {
            Ok((report, diagnostics)) => {
                if cli.json {
                    let value = serde_json::json!({
                        "report": report,
                        "diagnostics": diagnostics,
                    });
                    match serde_json::to_string_pretty(&value) {
                        Ok(json) => println!("{json}"),
                        Err(e) => {
                            eprintln!("Error serializing report: {e}");
                            return ExitCode::FAILURE;
                        }
                    }
                } else {
                    println!("{}", diagnostics.report());
                    println!();
                    println!("Features: {:?}", report.features.feature_vector());
                    if let Some(ref histogram) = report.histogram {
                        println!("Histogram: {:?}", histogram.counts);
                    }
                }

                // Write SVG on the first run only.
                if run == 0
                    && let Some(ref svg_path) = cli.svg
                {
                    let svg = shapesig_export::report_to_svg(
                        &report,
                        dimensions,
                        &svg_metadata(&cli.image_path, &config_json(&config)),
                    );
                    write_svg(svg_path, &svg);
                }

                all_diagnostics.push(diagnostics);
            }
            Err(e) => {
                eprintln!("Extraction error ({}): {e}", e.kind());
                return ExitCode::FAILURE;
            }
        }

        if cli.runs > 1 {
            eprintln!();
        }
    }

    // Print summary when multiple runs.
    if cli.runs > 1 {
        print_multi_run_summary(&all_diagnostics);
    }

    ExitCode::SUCCESS
}

/// Extract every region, `cli.runs` times, and report the last run.
fn run_all_regions(
    cli: &Cli,
    image: &GrayImage,
    config: &ShapeConfig,
    ctx: &SpectralContext,
    dimensions: Dimensions,
) -> ExitCode {
    let mut durations = Vec::with_capacity(cli.runs);
    let mut outcomes = Vec::new();
    for _ in 0..cli.runs {
        let start = StdClock.now();
        outcomes = match shapesig_pipeline::extract_regions(image, config, ctx) {
            Ok(o) => o,
            Err(e) => {
                eprintln!("Extraction error ({}): {e}", e.kind());
                return ExitCode::FAILURE;
            }
        };
        durations.push(StdClock.elapsed(&start));
    }

    if cli.json {
        match serde_json::to_string_pretty(&outcomes) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("Error serializing outcomes: {e}");
                return ExitCode::FAILURE;
            }
        }
    } else {
        println!("{:<8} {:>10} {:>10}  {}", "Label", "Pixels", "Points", "Result");
        println!("{}", "-".repeat(60));
        for outcome in &outcomes {
            match outcome.result {
                Ok(ref report) => println!(
                    "{:<8} {:>10} {:>10}  {} features",
                    outcome.label,
                    outcome.pixels,
                    report.boundary.len(),
                    report.features.feature_vector().len(),
                ),
                Err(ref e) => println!(
                    "{:<8} {:>10} {:>10}  skipped: {e}",
                    outcome.label, outcome.pixels, "-",
                ),
            }
        }
    }

    if let Some(ref svg_path) = cli.svg {
        let ids: Vec<String> = outcomes
            .iter()
            .map(|o| format!("region-{}", o.label))
            .collect();
        let mut layers = Vec::new();
        for (outcome, id) in outcomes.iter().zip(&ids) {
            if let Ok(ref report) = outcome.result {
                layers.push(ContourLayer::boundary(&report.boundary).with_id(id));
                if let Some(ref smoothed) = report.smoothed {
                    layers.push(ContourLayer::smoothed(&smoothed.points));
                }
            }
        }
        let svg = shapesig_export::to_svg(
            &layers,
            dimensions,
            &svg_metadata(&cli.image_path, &config_json(config)),
        );
        write_svg(svg_path, &svg);
    }

    if cli.runs > 1 {
        print_duration_summary(&durations);
    }
    ExitCode::SUCCESS
}

fn config_json(config: &ShapeConfig) -> String {
    serde_json::to_string(config).unwrap_or_default()
}

fn svg_metadata<'a>(image_path: &'a Path, config_json: &'a str) -> SvgMetadata<'a> {
    SvgMetadata {
        title: Some(
            image_path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("shapesig"),
        ),
        description: Some("Traced boundaries and Fourier reconstructions"),
        config_json: Some(config_json).filter(|json| !json.is_empty()),
    }
}

fn write_svg(path: &Path, svg: &str) {
    match std::fs::write(path, svg) {
        Ok(()) => {
            eprintln!("SVG written to {} ({} bytes)", path.display(), svg.len());
        }
        Err(e) => {
            eprintln!("Error writing SVG to {}: {e}", path.display());
        }
    }
}

/// [`Clock`] implementation backed by [`std::time::Instant`].
struct StdClock;

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn elapsed(&self, since: &Instant) -> Duration {
        since.elapsed()
    }
}

/// Function pointer type for extracting a stage duration from diagnostics.
type StageExtractor = fn(&ExtractionDiagnostics) -> Option<Duration>;

/// Print min/mean/max of a set of run durations.
#[allow(clippy::cast_precision_loss)]
fn print_duration_summary(durations: &[Duration]) {
    println!();
    println!("Summary ({} runs)\n{}", durations.len(), "=".repeat(60));

    if durations.is_empty() {
        println!("Warning: no runs to summarize");
        return;
    }

    let millis: Vec<f64> = durations.iter().map(|d| d.as_secs_f64() * 1000.0).collect();
    let min = millis.iter().copied().reduce(f64::min).unwrap_or(0.0);
    let max = millis.iter().copied().reduce(f64::max).unwrap_or(0.0);
    let mean = millis.iter().sum::<f64>() / millis.len() as f64;

    println!("Total duration: min={min:.3}ms  mean={mean:.3}ms  max={max:.3}ms");
}

/// Print aggregated statistics across multiple runs.
#[allow(clippy::cast_precision_loss)]
fn print_multi_run_summary(all_diagnostics: &[ExtractionDiagnostics]) {
    let totals: Vec<Duration> = all_diagnostics.iter().map(|d| d.total_duration).collect();
    print_duration_summary(&totals);
    if all_diagnostics.is_empty() {
        return;
    }

    // Per-stage means.
    println!();
    println!("{:<24} {:>12}", "Stage", "Mean (ms)");
    println!("{}", "-".repeat(40));

    let stage_extractors: &[(&str, StageExtractor)] = &[
        ("Trace", |d| Some(d.trace.duration)),
        ("Encode", |d| Some(d.encode.duration)),
        ("Histogram", |d| d.histogram.as_ref().map(|s| s.duration)),
        ("Smoothing", |d| d.smoothing.as_ref().map(|s| s.duration)),
    ];

    for (name, extractor) in stage_extractors {
        let stage_durations: Vec<f64> = all_diagnostics
            .iter()
            .filter_map(extractor)
            .map(|dur| dur.as_secs_f64() * 1000.0)
            .collect();

        if stage_durations.is_empty() {
            continue;
        }

        let stage_mean = stage_durations.iter().sum::<f64>() / stage_durations.len() as f64;
        println!("{name:<24} {stage_mean:>10.3}ms");
    }

    let cache = all_diagnostics
        .last()
        .map(|d| d.summary.matrix_cache)
        .unwrap_or_default();
    println!();
    println!(
        "Matrix cache after {} runs: {} hits, {} builds",
        all_diagnostics.len(),
        cache.hits,
        cache.builds,
    );
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn flags_build_a_resampled_config() {
        let cli = Cli::parse_from([
            "shapesig-bench",
            "in.png",
            "--encoder",
            "resampled",
            "--buckets",
            "12",
            "--threshold",
            "40",
        ]);
        let config = config_from_cli(&cli).unwrap_or_default();
        assert_eq!(config.encoder, EncoderKind::Resampled { buckets: 12 });
        assert_eq!(config.threshold, 40);
    }

    #[test]
    fn config_json_overrides_flags() {
        let cli = Cli::parse_from([
            "shapesig-bench",
            "in.png",
            "--threshold",
            "40",
            "--config-json",
            r#"{"threshold":7,"encoder":"fine"}"#,
        ]);
        let config = config_from_cli(&cli).unwrap_or_default();
        assert_eq!(config.threshold, 7);
        assert_eq!(config.encoder, EncoderKind::Fine);
    }

    #[test]
    fn invalid_config_json_is_rejected() {
        let cli = Cli::parse_from([
            "shapesig-bench",
            "in.png",
            "--config-json",
            r#"{"encoder":{"resampled":{"buckets":0}}}"#,
        ]);
        assert!(config_from_cli(&cli).is_err());
    }
}
