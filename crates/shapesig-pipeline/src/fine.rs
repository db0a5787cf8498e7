//! Fine descriptor: 16 regions of raw spectral magnitude.
//!
//! Interior bins `1..=N-2` of the centered spectrum are assigned to
//! regions as follows:
//!
//! | Bins                      | Regions |
//! |---------------------------|---------|
//! | `1..=4`                   | 0..=3, one bin each |
//! | `N-5..=N-2`               | 4..=7, one bin each |
//! | remaining, below center   | 8..=11, rings by distance |
//! | remaining, above center   | 12..=15, rings by distance |
//!
//! Ring distance is `d = |bin - N/2| / (N/2)`. Bins with `d < 8/16` sit
//! too close to the Nyquist bin and are excluded. The rings are then cut
//! at `10/16`, `12/16` and `13/16`.
//!
//! Magnitudes are not normalized, so the descriptor keeps the scale of
//! the shape.

use serde::{Deserialize, Serialize};

use crate::descriptor::BucketAccumulator;
use crate::spectrum::SpectralContext;
use crate::types::PointSequence;

/// Number of regions.
pub const REGION_COUNT: usize = 16;

/// Single-bin regions at each end of the spectrum.
const EDGE_BINS: usize = 4;

/// Bins closer to the center than this fraction are excluded.
const INNER_EXCLUSION: f64 = 8.0 / 16.0;

/// Upper bounds of rings 0..=2; ring 3 takes the rest.
const RING_BOUNDS: [f64; 3] = [10.0 / 16.0, 12.0 / 16.0, 13.0 / 16.0];

/// Mean raw magnitude per spectral region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FineDescriptor {
    /// Mean magnitude per region (0 when empty).
    pub buckets: [f64; REGION_COUNT],
    /// Number of bins that fell into each region.
    ///
    /// Bins inside the inner exclusion zone belong to no region, so
    /// for `N` boundary points these sum to `N - 2 - excluded`.
    pub memberships: [usize; REGION_COUNT],
    /// Interior bins dropped by the inner exclusion zone.
    pub excluded: usize,
}

impl FineDescriptor {
    /// Interior bins examined: memberships plus exclusions.
    #[must_use]
    pub fn processed(&self) -> usize {
        self.memberships.iter().sum::<usize>() + self.excluded
    }
}

/// Compute the fine descriptor of a closed boundary.
///
/// Never fails; boundaries shorter than 3 points have no interior bins
/// and produce all-zero buckets.
#[must_use]
pub fn fine_descriptor(points: &PointSequence, ctx: &SpectralContext) -> FineDescriptor {
    let spectrum = ctx.centered_spectrum(points);
    let n = spectrum.len();

    let mut acc = BucketAccumulator::<REGION_COUNT>::new();
    let mut excluded = 0;
    for (bin, coefficient) in spectrum.iter().enumerate().take(n.saturating_sub(1)).skip(1) {
        match region(bin, n) {
            Some(r) => acc.add(r, coefficient.norm()),
            None => excluded += 1,
        }
    }
    let (buckets, memberships) = acc.finish();

    tracing::debug!(points = n, excluded, "fine descriptor");
    FineDescriptor {
        buckets,
        memberships,
        excluded,
    }
}

/// Region of interior `bin` in a spectrum of length `n`, or `None` if
/// the bin is excluded.
#[allow(clippy::cast_precision_loss)]
fn region(bin: usize, n: usize) -> Option<usize> {
    if bin <= EDGE_BINS {
        return Some(bin - 1);
    }
    // `bin >= n - 5`, written to avoid underflow on short spectra.
    if bin + EDGE_BINS + 1 >= n {
        return Some(EDGE_BINS + bin + EDGE_BINS + 1 - n);
    }

    let center = n as f64 / 2.0;
    let d = (bin as f64 - center).abs() / center;
    if d < INNER_EXCLUSION {
        return None;
    }
    let ring = RING_BOUNDS
        .iter()
        .position(|&bound| d < bound)
        .unwrap_or(RING_BOUNDS.len());
    let side = if (bin as f64) < center { 8 } else { 12 };
    Some(side + ring)
}
