//! Extraction diagnostics: timing and counts for each stage.
//!
//! Every call to [`extract_with_diagnostics`] collects diagnostics
//! alongside the [`ShapeReport`]. They are meant for tuning thresholds
//! and encoder parameters.
//!
//! The core has no clock of its own. Callers inject a [`Clock`], so the
//! same code runs wherever `std::time::Instant` is unavailable or a test
//! wants deterministic timings.
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::descriptor::DescriptorEncoder;
use crate::dft_matrix::CacheStats;
use crate::raster::PixelSource;
use crate::spectrum::SpectralContext;
use crate::trace::{BoundaryTracer, runaway_limit};
use crate::types::{ShapeConfig, ShapeError};
use crate::{ShapeReport, boundary_histogram, smooth_boundary};

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// A monotonic time source.
pub trait Clock {
    /// Opaque timestamp.
    type Instant;

    /// The current time.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// Diagnostics collected from a single extraction.
///
/// Stages that are disabled by the configuration have `Option` fields
/// that are `None`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionDiagnostics {
    /// Stage 1: boundary tracing.
    pub trace: StageDiagnostics,
    /// Stage 2: transform and descriptor encoding.
    pub encode: StageDiagnostics,
    /// Stage 3: distance histogram (only when `histogram_buckets > 0`).
    pub histogram: Option<StageDiagnostics>,
    /// Stage 4: low-pass reconstruction (only when smoothing is set).
    pub smoothing: Option<StageDiagnostics>,
    /// Total wall-clock duration of the extraction (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Summary counts across all stages.
    pub summary: ExtractionSummary,
}

/// Diagnostics for a single stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific metrics.
    pub metrics: StageMetrics,
}

/// Stage-specific metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Boundary tracing metrics.
    Trace {
        /// Foreground pixels in the source.
        foreground_pixels: usize,
        /// Points in the traced boundary.
        boundary_points: usize,
        /// Runaway budget for this source.
        point_limit: usize,
    },
    /// Descriptor encoding metrics.
    Encode {
        /// Encoder name.
        encoder: String,
        /// Length of the flattened feature vector.
        feature_len: usize,
    },
    /// Distance histogram metrics.
    Histogram {
        /// Bucket count.
        buckets: usize,
        /// Smallest distance from the centroid.
        min_distance: f64,
        /// Largest distance from the centroid.
        max_distance: f64,
    },
    /// Low-pass reconstruction metrics.
    Smoothing {
        /// Harmonics kept per side.
        harmonics: usize,
        /// Reconstructed points outside the traced bounding box.
        outside_hint: usize,
    },
}

/// High-level summary for the entire extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionSummary {
    /// Source width in pixels.
    pub image_width: u32,
    /// Source height in pixels.
    pub image_height: u32,
    /// Points in the traced boundary.
    pub boundary_points: usize,
    /// Dense DFT matrix cache counters after the run.
    pub matrix_cache: CacheStats,
}

/// Time one stage.
fn timed<C: Clock, T>(clock: &C, f: impl FnOnce() -> T) -> (T, Duration) {
    let start = clock.now();
    let value = f();
    (value, clock.elapsed(&start))
}

/// [`extract`](crate::extract), timing each stage with `clock`.
///
/// # Errors
///
/// Same as [`extract`](crate::extract).
pub fn extract_with_diagnostics<S: PixelSource + ?Sized, C: Clock>(
    source: &S,
    config: &ShapeConfig,
    ctx: &SpectralContext,
    clock: &C,
) -> Result<(ShapeReport, ExtractionDiagnostics), ShapeError> {
    config.validate()?;
    let start = clock.now();

    // 1. Boundary.
    let ((boundary, foreground_pixels, point_limit), trace_duration) = timed(clock, || {
        let foreground_pixels = source.foreground_count();
        let point_limit = runaway_limit(foreground_pixels);
        let boundary = BoundaryTracer::new(source).trace_with_limit(point_limit);
        (boundary, foreground_pixels, point_limit)
    });
    let boundary = boundary?;
    let trace = StageDiagnostics {
        duration: trace_duration,
        metrics: StageMetrics::Trace {
            foreground_pixels,
            boundary_points: boundary.len(),
            point_limit,
        },
    };

    // 2. Descriptor.
    let (features, encode_duration) = timed(clock, || config.encoder.encode(&boundary, ctx));
    let features = features?;
    let encode = StageDiagnostics {
        duration: encode_duration,
        metrics: StageMetrics::Encode {
            encoder: config.encoder.name().to_string(),
            feature_len: features.feature_vector().len(),
        },
    };

    // 3. Distance histogram.
    let (histogram, histogram_duration) =
        timed(clock, || boundary_histogram(&boundary, config.histogram_buckets));
    let histogram = histogram?;
    let histogram_diag = histogram.as_ref().map(|h| StageDiagnostics {
        duration: histogram_duration,
        metrics: StageMetrics::Histogram {
            buckets: h.counts.len(),
            min_distance: h.min_distance,
            max_distance: h.max_distance,
        },
    });

    // 4. Smoothing.
    let mut smoothing_diag = None;
    let smoothed = config.smoothing_harmonics.map(|harmonics| {
        let (smoothed, duration) = timed(clock, || smooth_boundary(&boundary, harmonics, ctx));
        smoothing_diag = Some(StageDiagnostics {
            duration,
            metrics: StageMetrics::Smoothing {
                harmonics,
                outside_hint: smoothed.outside_hint,
            },
        });
        smoothed
    });

    let total_duration = clock.elapsed(&start);
    let summary = ExtractionSummary {
        image_width: source.width(),
        image_height: source.height(),
        boundary_points: boundary.len(),
        matrix_cache: ctx.matrix_stats(),
    };

    Ok((
        ShapeReport {
            boundary,
            features,
            histogram,
            smoothed,
        },
        ExtractionDiagnostics {
            trace,
            encode,
            histogram: histogram_diag,
            smoothing: smoothing_diag,
            total_duration,
            summary,
        },
    ))
}

impl ExtractionDiagnostics {
    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Extraction Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Image: {}x{}",
            self.summary.image_width, self.summary.image_height,
        ));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<16} {:>10} {:>10}  {}",
            "Stage", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(80));

        let total_ms = duration_ms(self.total_duration);

        let mut stages: Vec<(&str, &StageDiagnostics)> =
            vec![("Trace", &self.trace), ("Encode", &self.encode)];
        if let Some(ref h) = self.histogram {
            stages.push(("Histogram", h));
        }
        if let Some(ref s) = self.smoothing {
            stages.push(("Smoothing", s));
        }

        for (name, diag) in &stages {
            let ms = duration_ms(diag.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            let details = format_metrics(&diag.metrics);
            lines.push(format!("{name:<16} {ms:>8.3}ms {pct:>9.1}%  {details}"));
        }

        let cache = self.summary.matrix_cache;
        lines.push(String::new());
        lines.push(format!(
            "Boundary points: {}  |  Matrix cache: {} hits, {} builds, {} held",
            self.summary.boundary_points, cache.hits, cache.builds, cache.entries,
        ));

        lines.join("\n")
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Format stage metrics into a compact detail string.
fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::Trace {
            foreground_pixels,
            boundary_points,
            point_limit,
        } => format!("{foreground_pixels} fg px -> {boundary_points} pts (limit {point_limit})"),
        StageMetrics::Encode {
            encoder,
            feature_len,
        } => format!("{encoder}, {feature_len} features"),
        StageMetrics::Histogram {
            buckets,
            min_distance,
            max_distance,
        } => format!("{buckets} buckets over [{min_distance:.2}, {max_distance:.2}]"),
        StageMetrics::Smoothing {
            harmonics,
            outside_hint,
        } => format!("{harmonics} harmonics, {outside_hint} pts outside bounds"),
    }
}
