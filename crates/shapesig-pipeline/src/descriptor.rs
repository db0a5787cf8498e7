//! Descriptor encoding: turn a boundary spectrum into a feature vector.
//!
//! This module defines the [`DescriptorEncoder`] trait for pluggable
//! spectral encodings and the [`EncoderKind`] enum for selecting one at
//! runtime.
//!
//! # Strategy pattern
//!
//! The three encodings are alternatives, not stages. Each one reads the
//! same centered boundary spectrum but buckets it differently, so their
//! feature vectors are not comparable with each other. Pick one per
//! dataset and keep it.

use serde::{Deserialize, Serialize};

use crate::coarse::{CoarseDescriptor, coarse_descriptor};
use crate::fine::{FineDescriptor, fine_descriptor};
use crate::resampled::{ResampledDescriptor, resampled_descriptor};
use crate::spectrum::SpectralContext;
use crate::types::{DescriptorError, PointSequence};

/// Selects which descriptor encoding to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncoderKind {
    /// 15 low-frequency harmonics normalized by the fundamental, plus 5
    /// radial buckets. Needs at least 8 boundary points.
    #[default]
    Coarse,
    /// 16 regions of raw magnitudes: 8 single bins at the spectrum edges
    /// and 4 nested rings per side.
    Fine,
    /// The boundary resampled to exactly `buckets` points and transformed
    /// with a dense DFT matrix.
    Resampled {
        /// Output length.
        buckets: usize,
    },
}

impl EncoderKind {
    /// Short name for reports and logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Coarse => "coarse",
            Self::Fine => "fine",
            Self::Resampled { .. } => "resampled",
        }
    }
}

/// Trait for descriptor encoding strategies.
///
/// Input: one closed boundary in trace order.
/// Output: a fixed-layout set of spectral features.
pub trait DescriptorEncoder {
    /// Encode `points` using the transforms and matrices cached in `ctx`.
    ///
    /// # Errors
    ///
    /// Returns a [`DescriptorError`] when the boundary cannot support the
    /// encoding (too few points, zero fundamental, zero buckets).
    fn encode(
        &self,
        points: &PointSequence,
        ctx: &SpectralContext,
    ) -> Result<ShapeFeatures, DescriptorError>;
}

impl DescriptorEncoder for EncoderKind {
    fn encode(
        &self,
        points: &PointSequence,
        ctx: &SpectralContext,
    ) -> Result<ShapeFeatures, DescriptorError> {
        match *self {
            Self::Coarse => coarse_descriptor(points, ctx).map(ShapeFeatures::Coarse),
            Self::Fine => Ok(ShapeFeatures::Fine(fine_descriptor(points, ctx))),
            Self::Resampled { buckets } => {
                resampled_descriptor(points, buckets, ctx).map(ShapeFeatures::Resampled)
            }
        }
    }
}

/// The output of one [`DescriptorEncoder`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "encoder", rename_all = "snake_case")]
pub enum ShapeFeatures {
    /// See [`CoarseDescriptor`].
    Coarse(CoarseDescriptor),
    /// See [`FineDescriptor`].
    Fine(FineDescriptor),
    /// See [`ResampledDescriptor`].
    Resampled(ResampledDescriptor),
}

impl ShapeFeatures {
    /// Which encoder produced these features.
    #[must_use]
    pub fn kind(&self) -> EncoderKind {
        match self {
            Self::Coarse(_) => EncoderKind::Coarse,
            Self::Fine(_) => EncoderKind::Fine,
            Self::Resampled(r) => EncoderKind::Resampled {
                buckets: r.magnitudes.len(),
            },
        }
    }

    /// Flatten into a single vector for a classifier.
    ///
    /// Coarse: 15 harmonics followed by 5 buckets. Fine: 16 buckets.
    /// Resampled: one magnitude per bucket.
    #[must_use]
    pub fn feature_vector(&self) -> Vec<f64> {
        match self {
            Self::Coarse(c) => c.harmonics.iter().chain(&c.buckets).copied().collect(),
            Self::Fine(f) => f.buckets.to_vec(),
            Self::Resampled(r) => r.magnitudes.clone(),
        }
    }
}

/// Running sums for a fixed number of buckets.
#[derive(Debug, Clone, Copy)]
pub(crate) struct BucketAccumulator<const B: usize> {
    sums: [f64; B],
    counts: [usize; B],
}

impl<const B: usize> BucketAccumulator<B> {
    pub(crate) const fn new() -> Self {
        Self {
            sums: [0.0; B],
            counts: [0; B],
        }
    }

    pub(crate) fn add(&mut self, bucket: usize, value: f64) {
        self.sums[bucket] += value;
        self.counts[bucket] += 1;
    }

    /// Per-bucket means (empty buckets report 0) and memberships.
    #[allow(clippy::cast_precision_loss)]
    pub(crate) fn finish(self) -> ([f64; B], [usize; B]) {
        let mut means = [0.0; B];
        for (mean, (&sum, &count)) in means.iter_mut().zip(self.sums.iter().zip(&self.counts)) {
            if count > 0 {
                *mean = sum / count as f64;
            }
        }
        (means, self.counts)
    }
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
    fn default_is_coarse() {
        assert_eq!(EncoderKind::default(), EncoderKind::Coarse);
    }

    #[test]
    fn encoder_kind_serde_names() {
        assert_eq!(serde_json::to_string(&EncoderKind::Fine).unwrap(), r#""fine""#);
        let kind: EncoderKind = serde_json::from_str(r#"{"resampled":{"buckets":12}}"#).unwrap();
        assert_eq!(kind, EncoderKind::Resampled { buckets: 12 });
    }

    #[test]
    fn each_kind_produces_its_own_features() {
        let ctx = SpectralContext::new();
        let points = square_boundary();
        for kind in [
            EncoderKind::Coarse,
            EncoderKind::Fine,
            EncoderKind::Resampled { buckets: 10 },
        ] {
            let features = kind.encode(&points, &ctx).unwrap();
            assert_eq!(features.kind(), kind);
        }
    }

    #[test]
    fn feature_vector_lengths() {
        let ctx = SpectralContext::new();
        let points = square_boundary();
        let coarse = EncoderKind::Coarse.encode(&points, &ctx).unwrap();
        let fine = EncoderKind::Fine.encode(&points, &ctx).unwrap();
        let resampled = EncoderKind::Resampled { buckets: 6 }
            .encode(&points, &ctx)
            .unwrap();
        assert_eq!(coarse.feature_vector().len(), 20);
        assert_eq!(fine.feature_vector().len(), 16);
        assert_eq!(resampled.feature_vector().len(), 6);
    }

    #[test]
    fn errors_pass_through_the_trait() {
        let ctx = SpectralContext::new();
        let short = PointSequence::new(square_boundary().points()[..5].to_vec());
        assert!(matches!(
            EncoderKind::Coarse.encode(&short, &ctx),
            Err(DescriptorError::InsufficientPoints {
                required: 8,
                found: 5
            })
        ));
        assert_eq!(
            EncoderKind::Resampled { buckets: 0 }.encode(&short, &ctx),
            Err(DescriptorError::ZeroBuckets)
        );
    }

    #[test]
    fn features_serialize_with_encoder_tag() {
        let ctx = SpectralContext::new();
        let features = EncoderKind::Fine.encode(&square_boundary(), &ctx).unwrap();
        let json = serde_json::to_value(&features).unwrap();
        assert_eq!(json["encoder"], "fine");
        assert_eq!(json["buckets"].as_array().unwrap().len(), 16);
    }

    #[test]
    fn accumulator_means_and_empty_buckets() {
        let mut acc = BucketAccumulator::<3>::new();
        acc.add(0, 1.0);
        acc.add(0, 3.0);
        acc.add(2, 5.0);
        let (means, counts) = acc.finish();
        assert_eq!(counts, [2, 0, 1]);
        assert!((means[0] - 2.0).abs() < 1e-12);
        assert!(means[1].abs() < f64::EPSILON);
        assert!((means[2] - 5.0).abs() < 1e-12);
    }
}
