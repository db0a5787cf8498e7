//! Shared types for the shapesig descriptor pipeline.

use std::collections::TryReserveError;

use geo::{Coord, Rect};
use rustfft::num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::descriptor::EncoderKind;

/// Re-export `GrayImage` so downstream crates can hand raster data to
/// the pipeline without depending on `image` directly.
pub use image::GrayImage;

/// An integer pixel coordinate, row first.
///
/// Rows grow downward and columns grow to the right, matching the
/// raster layout of [`GrayImage`]. Coordinates are signed because
/// reconstructed contours may leave the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridPoint {
    /// Vertical position (pixels from the top edge).
    pub row: i64,
    /// Horizontal position (pixels from the left edge).
    pub col: i64,
}

impl GridPoint {
    /// Create a new grid point.
    #[must_use]
    pub const fn new(row: i64, col: i64) -> Self {
        Self { row, col }
    }

    /// Offset this point by a `(d_row, d_col)` step.
    #[must_use]
    pub const fn offset(self, (d_row, d_col): (i64, i64)) -> Self {
        Self {
            row: self.row + d_row,
            col: self.col + d_col,
        }
    }

    /// Euclidean distance to another point.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn distance(self, other: Self) -> f64 {
        let dr = (self.row - other.row) as f64;
        let dc = (self.col - other.col) as f64;
        dr.hypot(dc)
    }

    /// The point as a complex sample `x + iy`: column on the real axis,
    /// row on the imaginary axis.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn to_complex(self) -> Complex64 {
        Complex64::new(self.col as f64, self.row as f64)
    }

    /// Round a complex sample back to the grid, half-up on each axis.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_complex(sample: Complex64) -> Self {
        Self {
            row: (sample.im + 0.5).floor() as i64,
            col: (sample.re + 0.5).floor() as i64,
        }
    }
}

/// An ordered closed boundary: consecutive points are 8-neighbours and
/// the last point connects back to the first.
///
/// Insertion order is trace order. The first point of a traced sequence
/// is the start pixel chosen by the tracer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointSequence(Vec<GridPoint>);

impl PointSequence {
    /// Create a sequence from points already in boundary order.
    #[must_use]
    pub const fn new(points: Vec<GridPoint>) -> Self {
        Self(points)
    }

    /// Returns `true` if the sequence has no points.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of points in the sequence.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns the first point, if any.
    #[must_use]
    pub fn first(&self) -> Option<&GridPoint> {
        self.0.first()
    }

    /// Returns the last point, if any.
    #[must_use]
    pub fn last(&self) -> Option<&GridPoint> {
        self.0.last()
    }

    /// Returns a slice of all points.
    #[must_use]
    pub fn points(&self) -> &[GridPoint] {
        &self.0
    }

    /// Consumes the sequence and returns the underlying vector of points.
    #[must_use]
    pub fn into_points(self) -> Vec<GridPoint> {
        self.0
    }

    /// Mean row and mean column of all points, or `None` when empty.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn centroid(&self) -> Option<(f64, f64)> {
        if self.0.is_empty() {
            return None;
        }
        let n = self.0.len() as f64;
        let (rows, cols) = self
            .0
            .iter()
            .fold((0.0, 0.0), |(r, c), p| (r + p.row as f64, c + p.col as f64));
        Some((rows / n, cols / n))
    }

    /// The centroid rounded to the nearest pixel.
    #[must_use]
    pub fn centroid_pixel(&self) -> Option<GridPoint> {
        self.centroid()
            .map(|(row, col)| GridPoint::from_complex(Complex64::new(col, row)))
    }

    /// Axis-aligned bounding box in `geo` coordinates (`x` = column,
    /// `y` = row), or `None` when empty.
    #[must_use]
    pub fn bounding_box(&self) -> Option<Rect<i64>> {
        let first = self.0.first()?;
        let (mut min, mut max) = (*first, *first);
        for p in &self.0[1..] {
            min.row = min.row.min(p.row);
            min.col = min.col.min(p.col);
            max.row = max.row.max(p.row);
            max.col = max.col.max(p.col);
        }
        Some(Rect::new(
            Coord {
                x: min.col,
                y: min.row,
            },
            Coord {
                x: max.col,
                y: max.row,
            },
        ))
    }

    /// The same closed boundary with its starting index moved forward by
    /// `shift` points.
    #[must_use]
    pub fn rotated(&self, shift: usize) -> Self {
        let mut points = self.0.clone();
        if !points.is_empty() {
            let len = points.len();
            points.rotate_left(shift % len);
        }
        Self(points)
    }

    /// Every point as a complex sample (see [`GridPoint::to_complex`]).
    #[must_use]
    pub fn to_complex(&self) -> Vec<Complex64> {
        self.0.iter().map(|p| p.to_complex()).collect()
    }

    /// Complex samples translated so their mean is the origin.
    #[must_use]
    pub fn centered_complex(&self) -> Vec<Complex64> {
        center_samples(self.to_complex())
    }
}

impl FromIterator<GridPoint> for PointSequence {
    fn from_iter<I: IntoIterator<Item = GridPoint>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Subtract the mean of `samples` from each sample.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn center_samples(mut samples: Vec<Complex64>) -> Vec<Complex64> {
    if samples.is_empty() {
        return samples;
    }
    let mean = samples.iter().sum::<Complex64>() / samples.len() as f64;
    for s in &mut samples {
        *s -= mean;
    }
    samples
}

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// Configuration for shape extraction.
///
/// All parameters have defaults exposed as `DEFAULT_*` constants so
/// CLI flags and UI controls cannot silently diverge from
/// [`ShapeConfig::default`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShapeConfig {
    /// Background threshold: pixels with intensity strictly above this
    /// value are foreground.
    pub threshold: u8,

    /// Which descriptor encoding to produce.
    pub encoder: EncoderKind,

    /// Bucket count for the auxiliary distance histogram, measured from
    /// the boundary centroid. `0` disables the histogram.
    pub histogram_buckets: usize,

    /// When set, also reconstruct a low-pass contour that keeps this many
    /// harmonics on each side of the spectrum.
    pub smoothing_harmonics: Option<usize>,

    /// Regions with fewer foreground pixels are skipped by
    /// [`extract_regions`](crate::regions::extract_regions).
    pub min_region_pixels: usize,
}

impl ShapeConfig {
    /// Default background threshold.
    pub const DEFAULT_THRESHOLD: u8 = 0;
    /// Default distance histogram bucket count.
    pub const DEFAULT_HISTOGRAM_BUCKETS: usize = 16;
    /// Default minimum region size (an isolated pixel cannot be traced).
    pub const DEFAULT_MIN_REGION_PIXELS: usize = 2;

    /// Check invariants that serde and struct literals cannot enforce.
    ///
    /// # Errors
    ///
    /// Returns [`ShapeError::InvalidConfig`] when the resampled encoder
    /// asks for zero buckets.
    pub fn validate(&self) -> Result<(), ShapeError> {
        if matches!(self.encoder, EncoderKind::Resampled { buckets: 0 }) {
            return Err(ShapeError::InvalidConfig(
                "resampled encoder needs at least one bucket".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ShapeConfig {
    fn default() -> Self {
        Self {
            threshold: Self::DEFAULT_THRESHOLD,
            encoder: EncoderKind::default(),
            histogram_buckets: Self::DEFAULT_HISTOGRAM_BUCKETS,
            smoothing_harmonics: None,
            min_region_pixels: Self::DEFAULT_MIN_REGION_PIXELS,
        }
    }
}

/// Geometry failures while tracing a boundary.
///
/// All of these are recoverable at the caller: skip the region and move
/// on.
#[derive(Debug, thiserror::Error)]
pub enum TraceError {
    /// The source contains no foreground pixel at all.
    #[error("no foreground pixel found")]
    NoForegroundPixel,

    /// The start pixel has fewer than two foreground pixels in its 3x3
    /// neighbourhood (itself included).
    #[error("degenerate start at ({row}, {col}): {neighbors} foreground pixel(s) in 3x3 neighbourhood")]
    DegenerateStart {
        /// Start row.
        row: i64,
        /// Start column.
        col: i64,
        /// Foreground count in the 3x3 neighbourhood.
        neighbors: usize,
    },

    /// The trace exceeded its point budget without closing.
    #[error("boundary trace exceeded {limit} points without closing")]
    RunawayTrace {
        /// The point budget (three times the foreground pixel count).
        limit: usize,
    },

    /// The tracer reached a pixel with no foreground neighbour.
    #[error("boundary trace stranded at ({row}, {col})")]
    DeadEnd {
        /// Row of the stranded pixel.
        row: i64,
        /// Column of the stranded pixel.
        col: i64,
    },

    /// Growing the boundary buffer failed.
    #[error("failed to grow boundary buffer: {0}")]
    Allocation(#[from] TryReserveError),
}

/// Failures while encoding a boundary into a descriptor.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DescriptorError {
    /// Too few boundary points for the requested encoding.
    #[error("descriptor needs at least {required} boundary points, got {found}")]
    InsufficientPoints {
        /// Minimum number of points.
        required: usize,
        /// Number of points supplied.
        found: usize,
    },

    /// The fundamental harmonic has zero magnitude, so magnitudes cannot
    /// be normalized.
    #[error("fundamental harmonic has zero magnitude")]
    ZeroFundamental,

    /// A bucket count of zero was requested.
    #[error("bucket count must be at least 1")]
    ZeroBuckets,

    /// A caller-owned transform matrix does not match the sample count.
    #[error("transform matrix is {expected}x{expected} but {found} samples were supplied")]
    MatrixSize {
        /// Matrix dimension.
        expected: usize,
        /// Number of samples.
        found: usize,
    },
}

/// Errors from the end-to-end extraction of one region.
#[derive(Debug, thiserror::Error)]
pub enum ShapeError {
    /// Boundary tracing failed.
    #[error(transparent)]
    Trace(#[from] TraceError),

    /// Descriptor encoding failed.
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),

    /// Configuration is invalid.
    #[error("invalid shape configuration: {0}")]
    InvalidConfig(String),
}

impl ShapeError {
    /// Short machine-readable name of the failure.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Trace(TraceError::NoForegroundPixel) => "no_foreground_pixel",
            Self::Trace(TraceError::DegenerateStart { .. }) => "degenerate_start",
            Self::Trace(TraceError::RunawayTrace { .. }) => "runaway_trace",
            Self::Trace(TraceError::DeadEnd { .. }) => "dead_end",
            Self::Trace(TraceError::Allocation(_)) => "allocation",
            Self::Descriptor(DescriptorError::InsufficientPoints { .. }) => "insufficient_points",
            Self::Descriptor(DescriptorError::ZeroFundamental) => "zero_fundamental",
            Self::Descriptor(DescriptorError::ZeroBuckets) => "zero_buckets",
            Self::Descriptor(DescriptorError::MatrixSize { .. }) => "matrix_size",
            Self::InvalidConfig(_) => "invalid_config",
        }
    }
}

/// Serde proxy for [`ShapeError`].
///
/// `TryReserveError` does not implement serde, so errors are written as
/// their kind plus `Display` message.
#[derive(Serialize)]
struct ShapeErrorProxy<'a> {
    kind: &'a str,
    message: String,
}

impl Serialize for ShapeError {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        ShapeErrorProxy {
            kind: self.kind(),
            message: self.to_string(),
        }
        .serialize(serializer)
    }
}
