//! Coarse descriptor: low-frequency harmonics plus 5 radial buckets.
//!
//! The boundary is centered on its centroid, transformed, and every
//! magnitude is divided by the magnitude of bin 1. Dividing by the
//! fundamental removes scale, and taking magnitudes removes both the
//! rotation of the shape and the choice of starting point.
//!
//! Two groups of values come out:
//!
//! - **Harmonics**: bins `N-1, N-2, 2, N-3, 3, ..., N-8, 8`. Bin 1 is
//!   always `1.0` after normalization and is left out, giving 15 values.
//! - **Buckets**: every interior bin `1..=N-2` is placed by its distance
//!   from the Nyquist bin `N/2`, as a fraction `d` of `N/2`. The cut
//!   points are `1/2, 3/4, 7/8, 15/16`, so bucket 0 holds the highest
//!   frequencies and bucket 4 the lowest. Unlike the fine encoder there
//!   is no inner exclusion zone.

use serde::{Deserialize, Serialize};

use crate::descriptor::BucketAccumulator;
use crate::spectrum::SpectralContext;
use crate::types::{DescriptorError, PointSequence};

/// Minimum boundary length: one full set of 8 harmonic pairs.
pub const MIN_POINTS: usize = 8;

/// Number of symmetric harmonic pairs sampled.
pub const HARMONIC_PAIRS: usize = 8;

/// Number of emitted harmonics (`2 * HARMONIC_PAIRS - 1`).
pub const HARMONIC_COUNT: usize = 2 * HARMONIC_PAIRS - 1;

/// Number of radial buckets.
pub const BUCKET_COUNT: usize = 5;

/// Upper bounds of buckets 0..=3 as fractions of `N/2`.
const BUCKET_BOUNDS: [f64; BUCKET_COUNT - 1] = [1.0 / 2.0, 3.0 / 4.0, 7.0 / 8.0, 15.0 / 16.0];

/// Fundamentals at or below this magnitude count as zero.
const ZERO_FUNDAMENTAL: f64 = 1e-9;

/// Normalized harmonics and radial buckets of one boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoarseDescriptor {
    /// Normalized magnitudes at bins `N-1, N-2, 2, ..., N-8, 8`.
    pub harmonics: [f64; HARMONIC_COUNT],
    /// Mean normalized magnitude per radial bucket (0 when empty).
    pub buckets: [f64; BUCKET_COUNT],
    /// Number of bins that fell into each bucket.
    pub memberships: [usize; BUCKET_COUNT],
}

/// Compute the coarse descriptor of a closed boundary.
///
/// # Errors
///
/// Returns [`DescriptorError::InsufficientPoints`] for fewer than
/// [`MIN_POINTS`] points, and [`DescriptorError::ZeroFundamental`] when
/// bin 1 has (numerically) zero magnitude, e.g. a boundary that runs
/// around the same loop twice.
pub fn coarse_descriptor(
    points: &PointSequence,
    ctx: &SpectralContext,
) -> Result<CoarseDescriptor, DescriptorError> {
    let n = points.len();
    if n < MIN_POINTS {
        return Err(DescriptorError::InsufficientPoints {
            required: MIN_POINTS,
            found: n,
        });
    }

    let spectrum = ctx.centered_spectrum(points);
    let fundamental = spectrum[1].norm();
    if fundamental <= ZERO_FUNDAMENTAL {
        return Err(DescriptorError::ZeroFundamental);
    }
    let normalized: Vec<f64> = spectrum.iter().map(|c| c.norm() / fundamental).collect();

    let mut harmonics = [0.0; HARMONIC_COUNT];
    let mut slot = 0;
    for k in 1..=HARMONIC_PAIRS {
        harmonics[slot] = normalized[(n - k) % n];
        slot += 1;
        if k > 1 {
            harmonics[slot] = normalized[k % n];
            slot += 1;
        }
    }

    let mut acc = BucketAccumulator::<BUCKET_COUNT>::new();
    for (bin, &magnitude) in normalized.iter().enumerate().take(n - 1).skip(1) {
        acc.add(radial_bucket(bin, n), magnitude);
    }
    let (buckets, memberships) = acc.finish();

    tracing::debug!(points = n, fundamental, ?memberships, "coarse descriptor");
    Ok(CoarseDescriptor {
        harmonics,
        buckets,
        memberships,
    })
}

/// Bucket of `bin` in a spectrum of length `n`.
#[allow(clippy::cast_precision_loss)]
fn radial_bucket(bin: usize, n: usize) -> usize {
    let center = n as f64 / 2.0;
    let d = (bin as f64 - center).abs() / center;
    BUCKET_BOUNDS
        .iter()
        .position(|&bound| d < bound)
        .unwrap_or(BUCKET_COUNT - 1)
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

    fn blob_boundary() -> PointSequence {
        let grid = BinaryGrid::from_rows(&[
            "..........",
            "...###....",
            "..######..",
            ".#######..",
            ".########.",
            "..######..",
            "...##.....",
            "..........",
        ]);
        trace_boundary(&grid).unwrap()
    }

    #[test]
    fn square_memberships_cover_interior_bins() {
        let ctx = SpectralContext::new();
        let d = coarse_descriptor(&square_boundary(), &ctx).unwrap();
        assert_eq!(d.memberships, [7, 4, 2, 1, 0]);
        assert_eq!(d.memberships.iter().sum::<usize>(), 14);
    }

    #[test]
    fn square_values() {
        let ctx = SpectralContext::new();
        let d = coarse_descriptor(&square_boundary(), &ctx).unwrap();
        // A 4-fold symmetric trace only excites bins 1, 5, 9 and 13.
        let expected = [
            0.0, 0.0, 0.0, 0.123_309, 0.0, 0.0, 0.0, 0.0, 0.055_053, 0.0, 0.0, 0.039_566, 0.0,
            0.0, 0.0,
        ];
        for (got, want) in d.harmonics.iter().zip(expected) {
            assert!((got - want).abs() < 1e-5, "{got} != {want}");
        }
        // Bin 1 lands in bucket 3 and normalizes to exactly 1.
        assert!((d.buckets[3] - 1.0).abs() < 1e-12);
        assert!((d.buckets[0] - 0.013_517).abs() < 1e-5);
        assert!((d.buckets[1] - 0.030_827).abs() < 1e-5);
        assert!(d.buckets[2].abs() < 1e-9);
        assert!(d.buckets[4].abs() < f64::EPSILON);
    }

    #[test]
    fn invariant_under_start_rotation() {
        let ctx = SpectralContext::new();
        let points = blob_boundary();
        let base = coarse_descriptor(&points, &ctx).unwrap();
        for shift in [1, 5, points.len() - 1] {
            let rotated = coarse_descriptor(&points.rotated(shift), &ctx).unwrap();
            for (a, b) in base.harmonics.iter().zip(&rotated.harmonics) {
                assert!((a - b).abs() < 1e-9);
            }
            for (a, b) in base.buckets.iter().zip(&rotated.buckets) {
                assert!((a - b).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn invariant_under_translation() {
        let ctx = SpectralContext::new();
        let points = blob_boundary();
        let moved: PointSequence = points
            .points()
            .iter()
            .map(|p| p.offset((40, -13)))
            .collect();
        let a = coarse_descriptor(&points, &ctx).unwrap();
        let b = coarse_descriptor(&moved, &ctx).unwrap();
        for (x, y) in a.harmonics.iter().zip(&b.harmonics) {
            assert!((x - y).abs() < 1e-9);
        }
    }

    #[test]
    fn too_few_points() {
        let ctx = SpectralContext::new();
        let points: PointSequence = (0..7).map(|i| GridPoint::new(0, i)).collect();
        assert_eq!(
            coarse_descriptor(&points, &ctx),
            Err(DescriptorError::InsufficientPoints {
                required: 8,
                found: 7
            })
        );
    }

    #[test]
    fn doubled_loop_has_zero_fundamental() {
        let ctx = SpectralContext::new();
        let lap = [
            GridPoint::new(0, 0),
            GridPoint::new(0, 1),
            GridPoint::new(1, 1),
            GridPoint::new(1, 0),
        ];
        let points: PointSequence = lap.iter().chain(&lap).copied().collect();
        assert_eq!(
            coarse_descriptor(&points, &ctx),
            Err(DescriptorError::ZeroFundamental)
        );
    }

    #[test]
    fn bucket_bounds() {
        // n = 32, center 16: d = |bin - 16| / 16.
        assert_eq!(radial_bucket(16, 32), 0);
        assert_eq!(radial_bucket(9, 32), 0); // d = 7/16
        assert_eq!(radial_bucket(8, 32), 1); // d = 1/2
        assert_eq!(radial_bucket(4, 32), 2); // d = 3/4
        assert_eq!(radial_bucket(2, 32), 3); // d = 7/8
        assert_eq!(radial_bucket(1, 32), 4); // d = 15/16
        assert_eq!(radial_bucket(31, 32), 4);
    }
}
