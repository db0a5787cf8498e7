//! Fixed-length descriptor through a dense DFT matrix.
//!
//! The boundary is resampled to exactly `buckets` points by nearest
//! index, centered on the centroid of those samples, and multiplied by
//! the forward `buckets x buckets` DFT matrix. The output is the raw
//! magnitude of every bin, so its length is chosen by the caller and does
//! not depend on how long the boundary is.
//!
//! Matrices come from the [`SpectralContext`] cache, or the caller can
//! own one and pass it to [`resampled_descriptor_with`].

use serde::{Deserialize, Serialize};

use crate::dft_matrix::{DftMatrix, TransformDirection};
use crate::spectrum::{SpectralContext, magnitudes};
use crate::types::{DescriptorError, PointSequence, center_samples};

/// Raw bin magnitudes of a resampled boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResampledDescriptor {
    /// One magnitude per output bin.
    pub magnitudes: Vec<f64>,
}

/// Pick `count` points of a closed boundary at evenly spaced positions.
///
/// Sample `i` is point `round(i * len / count) mod len`, rounding half
/// up. Returns an empty sequence when either side is empty.
#[must_use]
pub fn resample(points: &PointSequence, count: usize) -> PointSequence {
    let len = points.len();
    if len == 0 || count == 0 {
        return PointSequence::default();
    }
    let source = points.points();
    (0..count)
        .map(|i| source[((2 * i * len + count) / (2 * count)) % len])
        .collect()
}

/// Compute the resampled descriptor using a cached forward matrix.
///
/// # Errors
///
/// Returns [`DescriptorError::ZeroBuckets`] when `buckets` is zero and
/// [`DescriptorError::InsufficientPoints`] for an empty boundary.
pub fn resampled_descriptor(
    points: &PointSequence,
    buckets: usize,
    ctx: &SpectralContext,
) -> Result<ResampledDescriptor, DescriptorError> {
    if buckets == 0 {
        return Err(DescriptorError::ZeroBuckets);
    }
    let matrix = ctx.matrix(buckets, TransformDirection::Forward);
    resampled_descriptor_with(points, &matrix)
}

/// Compute the resampled descriptor with a caller-owned forward matrix.
///
/// The output length is `matrix.size()`.
///
/// # Errors
///
/// Returns [`DescriptorError::ZeroBuckets`] for a `0 x 0` matrix and
/// [`DescriptorError::InsufficientPoints`] for an empty boundary.
pub fn resampled_descriptor_with(
    points: &PointSequence,
    matrix: &DftMatrix,
) -> Result<ResampledDescriptor, DescriptorError> {
    if matrix.size() == 0 {
        return Err(DescriptorError::ZeroBuckets);
    }
    if points.is_empty() {
        return Err(DescriptorError::InsufficientPoints {
            required: 1,
            found: 0,
        });
    }

    let samples = center_samples(resample(points, matrix.size()).to_complex());
    let spectrum = matrix.apply(&samples)?;
    Ok(ResampledDescriptor {
        magnitudes: magnitudes(&spectrum),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::raster::BinaryGrid;
    use crate::trace::trace_boundary;
    use crate::types::GridPoint;

    fn square_boundary() -> PointSequence {
        let mut grid = BinaryGrid::new(20, 20);
        grid.fill_rect(8, 8, 12, 12);
        trace_boundary(&grid).unwrap()
    }

    #[test]
    fn resample_picks_nearest_indices() {
        let points: PointSequence = (0..16).map(|i| GridPoint::new(0, i)).collect();
        let picked: Vec<i64> = resample(&points, 6).points().iter().map(|p| p.col).collect();
        assert_eq!(picked, vec![0, 3, 5, 8, 11, 13]);
    }

    #[test]
    fn resample_can_upsample() {
        let points: PointSequence = (0..3).map(|i| GridPoint::new(i, 0)).collect();
        let picked: Vec<i64> = resample(&points, 7).points().iter().map(|p| p.row).collect();
        assert_eq!(picked, vec![0, 0, 1, 1, 2, 2, 0]);
    }

    #[test]
    fn square_with_six_buckets() {
        let ctx = SpectralContext::new();
        let d = resampled_descriptor(&square_boundary(), 6, &ctx).unwrap();
        let expected = [0.0, 12.928_203, 0.0, 0.0, 0.0, 0.928_203];
        assert_eq!(d.magnitudes.len(), 6);
        for (got, want) in d.magnitudes.iter().zip(expected) {
            assert!((got - want).abs() < 1e-5, "{got} != {want}");
        }
    }

    #[test]
    fn output_length_follows_buckets() {
        let ctx = SpectralContext::new();
        for buckets in [1, 4, 32] {
            let d = resampled_descriptor(&square_boundary(), buckets, &ctx).unwrap();
            assert_eq!(d.magnitudes.len(), buckets);
        }
    }

    #[test]
    fn cached_and_owned_matrices_agree() {
        let ctx = SpectralContext::new();
        let owned = DftMatrix::new(9, TransformDirection::Forward);
        let a = resampled_descriptor(&square_boundary(), 9, &ctx).unwrap();
        let b = resampled_descriptor_with(&square_boundary(), &owned).unwrap();
        for (x, y) in a.magnitudes.iter().zip(&b.magnitudes) {
            assert!((x - y).abs() < 1e-9);
        }
    }

    #[test]
    fn repeated_calls_hit_the_cache() {
        let ctx = SpectralContext::new();
        let _ = resampled_descriptor(&square_boundary(), 12, &ctx).unwrap();
        let _ = resampled_descriptor(&square_boundary(), 12, &ctx).unwrap();
        let stats = ctx.matrix_stats();
        assert_eq!(stats.builds, 1);
        assert_eq!(stats.hits, 1);
    }

    #[test]
    fn rejects_degenerate_input() {
        let ctx = SpectralContext::new();
        assert_eq!(
            resampled_descriptor(&square_boundary(), 0, &ctx),
            Err(DescriptorError::ZeroBuckets)
        );
        assert_eq!(
            resampled_descriptor(&PointSequence::default(), 4, &ctx),
            Err(DescriptorError::InsufficientPoints {
                required: 1,
                found: 0
            })
        );
    }
}
