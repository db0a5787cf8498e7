//! Rebuild a boundary from Fourier coefficients.
//!
//! The inverse transform yields complex samples that are rounded back to
//! the pixel grid. Truncating the spectrum first (see
//! [`truncate_spectrum`]) gives a smoothed outline.
//!
//! Reconstructed points are NOT clipped. They may fall outside the
//! original boundary's bounding box, or outside the image, and must be
//! validated before indexing a raster. [`Reconstruction::outside_hint`]
//! counts how many left the hint box.

use geo::Rect;
use rustfft::num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::dft_matrix::TransformDirection;
use crate::spectrum::{SpectralContext, truncate_spectrum};
use crate::types::{DescriptorError, GridPoint, PointSequence};

/// A reconstructed boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reconstruction {
    /// Rounded inverse-transform samples, in coefficient order.
    pub points: PointSequence,
    /// Points that fall outside the hint bounding box.
    pub outside_hint: usize,
}

/// Inverse-transform path from coefficients back to grid points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContourReconstructor {
    hint: Option<Rect<i64>>,
}

impl ContourReconstructor {
    /// Use the bounding box of `hint` as scale context.
    #[must_use]
    pub fn new(hint: &PointSequence) -> Self {
        Self {
            hint: hint.bounding_box(),
        }
    }

    /// Use an explicit bounding box (`x` = column, `y` = row).
    #[must_use]
    pub const fn with_bounds(hint: Option<Rect<i64>>) -> Self {
        Self { hint }
    }

    /// The hint bounding box, if the hint had any points.
    #[must_use]
    pub const fn hint_bounds(&self) -> Option<Rect<i64>> {
        self.hint
    }

    /// Inverse-transform `coefficients` with an FFT and round to the grid.
    #[must_use]
    pub fn reconstruct(&self, coefficients: &[Complex64], ctx: &SpectralContext) -> Reconstruction {
        self.finish(&ctx.inverse(coefficients))
    }

    /// Inverse-transform through the cached dense inverse matrix.
    ///
    /// Meant for short, fixed-length coefficient sets such as those of a
    /// resampled boundary.
    ///
    /// # Errors
    ///
    /// Propagates [`DescriptorError::MatrixSize`] from the matrix.
    pub fn reconstruct_fixed(
        &self,
        coefficients: &[Complex64],
        ctx: &SpectralContext,
    ) -> Result<Reconstruction, DescriptorError> {
        let matrix = ctx.matrix(coefficients.len(), TransformDirection::Inverse);
        let samples = matrix.apply(coefficients)?;
        Ok(self.finish(&samples))
    }

    /// Low-pass `points`: keep `harmonics` bins on each side of DC and
    /// reconstruct.
    #[must_use]
    pub fn smooth(
        &self,
        points: &PointSequence,
        harmonics: usize,
        ctx: &SpectralContext,
    ) -> Reconstruction {
        let spectrum = ctx.forward_spectrum(points);
        self.reconstruct(&truncate_spectrum(&spectrum, harmonics), ctx)
    }

    /// Whether `point` lies inside the (inclusive) hint box. Always true
    /// without a hint.
    #[must_use]
    pub fn within_hint(&self, point: GridPoint) -> bool {
        self.hint.is_none_or(|rect| {
            let (min, max) = (rect.min(), rect.max());
            (min.x..=max.x).contains(&point.col) && (min.y..=max.y).contains(&point.row)
        })
    }

    fn finish(&self, samples: &[Complex64]) -> Reconstruction {
        let points: PointSequence = samples.iter().map(|&s| GridPoint::from_complex(s)).collect();
        let outside_hint = points
            .points()
            .iter()
            .filter(|&&p| !self.within_hint(p))
            .count();
        if outside_hint > 0 {
            tracing::debug!(
                outside_hint,
                total = points.len(),
                "reconstructed points outside hint bounds"
            );
        }
        Reconstruction {
            points,
            outside_hint,
        }
    }
}

/// Inverse-transform `coefficients` into grid points, using `hint` for
/// scale context. Uses a throwaway [`SpectralContext`].
#[must_use]
pub fn inverse_spectrum(coefficients: &[Complex64], hint: &PointSequence) -> PointSequence {
    ContourReconstructor::new(hint)
        .reconstruct(coefficients, &SpectralContext::new())
        .points
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::raster::BinaryGrid;
    use crate::spectrum::forward_spectrum;
    use crate::trace::trace_boundary;

    fn blob_boundary() -> PointSequence {
        let grid = BinaryGrid::from_rows(&[
            "............",
            "....####....",
            "..#######...",
            ".#########..",
            ".##########.",
            "..########..",
            "...#####....",
            "....##......",
            "............",
        ]);
        trace_boundary(&grid).unwrap()
    }

    #[test]
    fn round_trip_is_exact_on_the_grid() {
        let points = blob_boundary();
        let back = inverse_spectrum(&forward_spectrum(&points), &points);
        assert_eq!(back, points);
    }

    #[test]
    fn fixed_path_matches_fft_path() {
        let ctx = SpectralContext::new();
        let points = blob_boundary();
        let reconstructor = ContourReconstructor::new(&points);
        let coefficients = ctx.forward_spectrum(&points);
        let fft = reconstructor.reconstruct(&coefficients, &ctx);
        let dense = reconstructor.reconstruct_fixed(&coefficients, &ctx).unwrap();
        assert_eq!(fft, dense);
        assert_eq!(dense.outside_hint, 0);
    }

    #[test]
    fn counts_points_outside_hint() {
        let ctx = SpectralContext::new();
        let hint = PointSequence::new(vec![GridPoint::new(0, 0), GridPoint::new(2, 2)]);
        let reconstructor = ContourReconstructor::new(&hint);
        let samples = PointSequence::new(vec![
            GridPoint::new(1, 1),
            GridPoint::new(3, 1),
            GridPoint::new(1, -1),
            GridPoint::new(2, 2),
        ]);
        let out = reconstructor.reconstruct(&ctx.forward_spectrum(&samples), &ctx);
        assert_eq!(out.points, samples);
        assert_eq!(out.outside_hint, 2);
    }

    #[test]
    fn no_hint_means_nothing_is_outside() {
        let reconstructor = ContourReconstructor::new(&PointSequence::default());
        assert!(reconstructor.hint_bounds().is_none());
        assert!(reconstructor.within_hint(GridPoint::new(-100, 100)));
    }

    #[test]
    fn smoothing_keeps_length_and_stays_near() {
        let ctx = SpectralContext::new();
        let points = blob_boundary();
        let reconstructor = ContourReconstructor::new(&points);
        let smoothed = reconstructor.smooth(&points, 2, &ctx);
        assert_eq!(smoothed.points.len(), points.len());
        for (a, b) in points.points().iter().zip(smoothed.points.points()) {
            assert!(a.distance(*b) <= 2.0, "{a:?} vs {b:?}");
        }
    }

    #[test]
    fn full_harmonics_smoothing_is_identity() {
        let ctx = SpectralContext::new();
        let points = blob_boundary();
        let smoothed = ContourReconstructor::new(&points).smooth(&points, points.len(), &ctx);
        assert_eq!(smoothed.points, points);
    }

    #[test]
    fn empty_coefficients_give_empty_boundary() {
        let ctx = SpectralContext::new();
        let reconstructor = ContourReconstructor::with_bounds(None);
        assert!(reconstructor.reconstruct(&[], &ctx).points.is_empty());
        assert!(reconstructor.reconstruct_fixed(&[], &ctx).unwrap().points.is_empty());
    }
}
