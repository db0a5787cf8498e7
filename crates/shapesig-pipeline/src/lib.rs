//! shapesig-pipeline: Fourier shape descriptors from binary rasters (sans-IO).
//!
//! Turns one foreground region into a feature vector through:
//! boundary tracing -> centering -> forward DFT -> spectral bucketing.
//! Alongside the descriptor it can produce a distance histogram and a
//! low-pass reconstruction of the boundary.
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! pixel grids and returns structured data. Image decoding, SVG output
//! and the command line live in other crates.

pub mod coarse;
pub mod descriptor;
pub mod dft_matrix;
pub mod diagnostics;
pub mod fine;
pub mod histogram;
pub mod raster;
pub mod reconstruct;
pub mod regions;
pub mod resampled;
pub mod spectrum;
pub mod trace;
pub mod types;

use serde::{Deserialize, Serialize};

pub use coarse::{CoarseDescriptor, coarse_descriptor};
pub use descriptor::{DescriptorEncoder, EncoderKind, ShapeFeatures};
pub use dft_matrix::{DftMatrix, DftMatrixCache, TransformDirection};
pub use fine::{FineDescriptor, fine_descriptor};
pub use histogram::{DistanceHistogram, distance_histogram};
pub use raster::{BinaryGrid, PixelSource, RegionMask, ThresholdedImage};
pub use reconstruct::{ContourReconstructor, Reconstruction, inverse_spectrum};
pub use regions::{RegionOutcome, extract_regions};
pub use resampled::{ResampledDescriptor, resampled_descriptor, resampled_descriptor_with};
pub use spectrum::{SpectralContext, forward_spectrum, truncate_spectrum};
pub use trace::{BoundaryTracer, trace_boundary};
pub use types::{
    DescriptorError, Dimensions, GrayImage, GridPoint, PointSequence, ShapeConfig, ShapeError,
    TraceError,
};

/// Everything extracted from one region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeReport {
    /// The traced outer boundary.
    pub boundary: PointSequence,
    /// The configured descriptor.
    pub features: ShapeFeatures,
    /// Distances from the boundary centroid, unless disabled.
    pub histogram: Option<DistanceHistogram>,
    /// Low-pass reconstruction, when smoothing was requested.
    pub smoothed: Option<Reconstruction>,
}

/// Extract the shape report of the single region in `source`.
///
/// # Steps
///
/// 1. Trace the outer boundary
/// 2. Encode it with `config.encoder`
/// 3. Distance histogram from the rounded centroid (unless
///    `config.histogram_buckets == 0`)
/// 4. Optional low-pass reconstruction
///
/// `config.threshold` is not applied here: `source` decides what is
/// foreground. See [`extract_image`] for a grayscale image.
///
/// # Errors
///
/// Returns [`ShapeError::InvalidConfig`] for an invalid configuration,
/// [`ShapeError::Trace`] when no boundary can be traced, and
/// [`ShapeError::Descriptor`] when the boundary is too short for the
/// encoder.
pub fn extract<S: PixelSource + ?Sized>(
    source: &S,
    config: &ShapeConfig,
    ctx: &SpectralContext,
) -> Result<ShapeReport, ShapeError> {
    config.validate()?;

    // 1. Boundary.
    let boundary = trace_boundary(source)?;

    // 2. Descriptor.
    let features = config.encoder.encode(&boundary, ctx)?;

    // 3. Distance histogram.
    let histogram = boundary_histogram(&boundary, config.histogram_buckets)?;

    // 4. Smoothing.
    let smoothed = config
        .smoothing_harmonics
        .map(|harmonics| smooth_boundary(&boundary, harmonics, ctx));

    Ok(ShapeReport {
        boundary,
        features,
        histogram,
        smoothed,
    })
}

/// [`extract`] over a grayscale image, thresholded at `config.threshold`.
///
/// # Errors
///
/// See [`extract`].
pub fn extract_image(
    image: &GrayImage,
    config: &ShapeConfig,
    ctx: &SpectralContext,
) -> Result<ShapeReport, ShapeError> {
    extract(&ThresholdedImage::new(image, config.threshold), config, ctx)
}

/// Histogram of distances from the boundary centroid, or `None` when
/// `buckets == 0`.
pub(crate) fn boundary_histogram(
    boundary: &PointSequence,
    buckets: usize,
) -> Result<Option<DistanceHistogram>, DescriptorError> {
    if buckets == 0 {
        return Ok(None);
    }
    let reference = boundary
        .centroid_pixel()
        .ok_or(DescriptorError::InsufficientPoints {
            required: 1,
            found: 0,
        })?;
    distance_histogram(boundary, reference, buckets).map(Some)
}

pub(crate) fn smooth_boundary(
    boundary: &PointSequence,
    harmonics: usize,
    ctx: &SpectralContext,
) -> Reconstruction {
    ContourReconstructor::new(boundary).smooth(boundary, harmonics, ctx)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use image::Luma;

    use super::*;

    fn square_image() -> GrayImage {
        GrayImage::from_fn(20, 20, |x, y| {
            if (8..=12).contains(&x) && (8..=12).contains(&y) {
                Luma([200])
            } else {
                Luma([30])
            }
        })
    }

    #[test]
    fn extract_square_with_defaults() {
        let ctx = SpectralContext::new();
        let report = extract_image(&square_image(), &ShapeConfig::default(), &ctx).unwrap();
        // Threshold 0 treats the gray background as foreground too.
        assert_eq!(report.boundary.len(), 76);
    }

    #[test]
    fn extract_square_above_background() {
        let ctx = SpectralContext::new();
        let config = ShapeConfig {
            threshold: 100,
            smoothing_harmonics: Some(4),
            ..ShapeConfig::default()
        };
        let report = extract_image(&square_image(), &config, &ctx).unwrap();
        assert_eq!(report.boundary.len(), 16);
        assert!(matches!(report.features, ShapeFeatures::Coarse(_)));
        let histogram = report.histogram.unwrap();
        assert_eq!(histogram.counts.len(), ShapeConfig::DEFAULT_HISTOGRAM_BUCKETS);
        assert_eq!(histogram.total_points, 16);
        assert_eq!(report.smoothed.unwrap().points.len(), 16);
    }

    #[test]
    fn histogram_can_be_disabled() {
        let ctx = SpectralContext::new();
        let config = ShapeConfig {
            threshold: 100,
            histogram_buckets: 0,
            ..ShapeConfig::default()
        };
        let report = extract_image(&square_image(), &config, &ctx).unwrap();
        assert!(report.histogram.is_none());
        assert!(report.smoothed.is_none());
    }

    #[test]
    fn blank_image_is_a_trace_error() {
        let ctx = SpectralContext::new();
        let blank = GrayImage::new(10, 10);
        let err = extract_image(&blank, &ShapeConfig::default(), &ctx).unwrap_err();
        assert!(matches!(err, ShapeError::Trace(TraceError::NoForegroundPixel)));
    }

    #[test]
    fn short_boundary_is_a_descriptor_error() {
        let ctx = SpectralContext::new();
        let grid = BinaryGrid::from_rows(&["....", ".##.", "...."]);
        let err = extract(&grid, &ShapeConfig::default(), &ctx).unwrap_err();
        assert_eq!(err.kind(), "insufficient_points");
    }

    #[test]
    fn invalid_config_is_rejected_before_tracing() {
        let ctx = SpectralContext::new();
        let config = ShapeConfig {
            encoder: EncoderKind::Resampled { buckets: 0 },
            ..ShapeConfig::default()
        };
        let err = extract(&GrayImage::new(4, 4), &config, &ctx).unwrap_err();
        assert!(matches!(err, ShapeError::InvalidConfig(_)));
    }

    #[test]
    fn report_serializes() {
        let ctx = SpectralContext::new();
        let config = ShapeConfig {
            threshold: 100,
            encoder: EncoderKind::Fine,
            ..ShapeConfig::default()
        };
        let report = extract_image(&square_image(), &config, &ctx).unwrap();
        let json = serde_json::to_string(&report).unwrap();
        let back: ShapeReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back.boundary, report.boundary);
        assert_eq!(back.features.kind(), EncoderKind::Fine);
    }
}
