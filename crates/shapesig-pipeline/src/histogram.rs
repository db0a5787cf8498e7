//! Histogram of boundary distances from a reference pixel.

use serde::{Deserialize, Serialize};

use crate::types::{DescriptorError, GridPoint, PointSequence};

/// Equal-width histogram of point-to-reference distances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistanceHistogram {
    /// Points per bucket. Buckets split `[min_distance, max_distance]`
    /// into equal widths; the maximum lands in the last bucket.
    pub counts: Vec<usize>,
    /// Smallest distance seen.
    pub min_distance: f64,
    /// Largest distance seen.
    pub max_distance: f64,
    /// Number of boundary points; always the sum of `counts`.
    pub total_points: usize,
}

impl DistanceHistogram {
    /// Each bucket's share of the points.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn normalized(&self) -> Vec<f64> {
        let total = self.total_points.max(1) as f64;
        self.counts.iter().map(|&c| c as f64 / total).collect()
    }
}

/// Bucket the Euclidean distance of every boundary point from
/// `reference`.
///
/// When all distances are equal the bucket width would be zero; every
/// point then goes to the middle bucket, `buckets / 2`.
///
/// # Errors
///
/// Returns [`DescriptorError::ZeroBuckets`] for `buckets == 0` and
/// [`DescriptorError::InsufficientPoints`] for an empty boundary.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn distance_histogram(
    points: &PointSequence,
    reference: GridPoint,
    buckets: usize,
) -> Result<DistanceHistogram, DescriptorError> {
    if buckets == 0 {
        return Err(DescriptorError::ZeroBuckets);
    }
    if points.is_empty() {
        return Err(DescriptorError::InsufficientPoints {
            required: 1,
            found: 0,
        });
    }

    let distances: Vec<f64> = points
        .points()
        .iter()
        .map(|p| p.distance(reference))
        .collect();
    let (min, max) = distances
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &d| {
            (lo.min(d), hi.max(d))
        });

    let mut counts = vec![0; buckets];
    if max > min {
        let width = (max - min) / buckets as f64;
        for d in &distances {
            let bucket = (((d - min) / width).floor() as usize).min(buckets - 1);
            counts[bucket] += 1;
        }
    } else {
        counts[buckets / 2] = distances.len();
    }

    Ok(DistanceHistogram {
        counts,
        min_distance: min,
        max_distance: max,
        total_points: distances.len(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::raster::BinaryGrid;
    use crate::trace::trace_boundary;

    fn square_boundary() -> PointSequence {
        let mut grid = BinaryGrid::new(20, 20);
        grid.fill_rect(8, 8, 12, 12);
        trace_boundary(&grid).unwrap()
    }

    #[test]
    fn counts_sum_to_points_for_any_bucket_count() {
        let points = square_boundary();
        for buckets in [1, 2, 3, 7, 16, 100] {
            let h = distance_histogram(&points, GridPoint::new(10, 10), buckets).unwrap();
            assert_eq!(h.counts.len(), buckets);
            assert_eq!(h.counts.iter().sum::<usize>(), points.len());
            assert_eq!(h.total_points, 16);
        }
    }

    #[test]
    fn square_from_center() {
        // Edge midpoints are 2 away, corners 2*sqrt(2), the rest sqrt(5).
        let h = distance_histogram(&square_boundary(), GridPoint::new(10, 10), 4).unwrap();
        assert!((h.min_distance - 2.0).abs() < 1e-12);
        assert!((h.max_distance - 8.0_f64.sqrt()).abs() < 1e-12);
        assert_eq!(h.counts, vec![4, 8, 0, 4]);
    }

    #[test]
    fn equal_distances_go_to_middle_bucket() {
        let points = PointSequence::new(vec![
            GridPoint::new(0, 1),
            GridPoint::new(1, 0),
            GridPoint::new(2, 1),
            GridPoint::new(1, 2),
        ]);
        let h = distance_histogram(&points, GridPoint::new(1, 1), 5).unwrap();
        assert_eq!(h.counts, vec![0, 0, 4, 0, 0]);
        let h = distance_histogram(&points, GridPoint::new(1, 1), 1).unwrap();
        assert_eq!(h.counts, vec![4]);
    }

    #[test]
    fn reference_need_not_be_on_boundary() {
        let h = distance_histogram(&square_boundary(), GridPoint::new(-30, 50), 8).unwrap();
        assert_eq!(h.counts.iter().sum::<usize>(), 16);
        assert!(h.min_distance > 40.0);
    }

    #[test]
    fn normalized_shares_sum_to_one() {
        let h = distance_histogram(&square_boundary(), GridPoint::new(10, 10), 4).unwrap();
        let total: f64 = h.normalized().iter().sum();
        assert!((total - 1.0).abs() < 1e-12);
    }

    #[test]
    fn rejects_degenerate_input() {
        assert_eq!(
            distance_histogram(&square_boundary(), GridPoint::new(0, 0), 0),
            Err(DescriptorError::ZeroBuckets)
        );
        assert_eq!(
            distance_histogram(&PointSequence::default(), GridPoint::new(0, 0), 4),
            Err(DescriptorError::InsufficientPoints {
                required: 1,
                found: 0
            })
        );
    }
}
