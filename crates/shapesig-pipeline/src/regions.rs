//! Descriptors for every foreground region of an image.
//!
//! The image is thresholded and labelled into 8-connected components
//! with `imageproc`. Each component large enough to trace gets its own
//! tracer and descriptor run. Runs are independent (the tracer reads a
//! [`RegionMask`] over the shared label image and the
//! [`SpectralContext`] is `Sync`), so they are fanned out with `rayon`
//! and joined in label order.
//!
//! Sizes and bounding boxes of all components come from one pass over
//! the label image. Each run then searches and counts only inside its
//! own box.

use image::Luma;
use imageproc::region_labelling::{Connectivity, connected_components};
use rayon::prelude::*;
use serde::Serialize;

use crate::raster::{LabelImage, RegionExtent, RegionMask, binarize};
use crate::spectrum::SpectralContext;
use crate::types::{GrayImage, ShapeConfig, ShapeError};
use crate::{ShapeReport, extract};

/// The outcome of one labelled region.
#[derive(Debug, Serialize)]
pub struct RegionOutcome {
    /// Component label (1-based, in raster scan order of first pixel).
    pub label: u32,
    /// Foreground pixels in the component.
    pub pixels: usize,
    /// The region's report, or why it was skipped.
    pub result: Result<ShapeReport, ShapeError>,
}

/// Extract a [`ShapeReport`] for every component of `image`.
///
/// Components with fewer than `config.min_region_pixels` pixels are
/// left out entirely. A failure in one region does not affect the
/// others; it is recorded in that region's [`RegionOutcome::result`].
///
/// # Errors
///
/// Returns [`ShapeError::InvalidConfig`] if `config` is invalid.
pub fn extract_regions(
    image: &GrayImage,
    config: &ShapeConfig,
    ctx: &SpectralContext,
) -> Result<Vec<RegionOutcome>, ShapeError> {
    config.validate()?;

    let binary = binarize(image, config.threshold);
    let labels = connected_components(&binary, Connectivity::Eight, Luma([0u8]));

    let extents = component_extents(&labels);
    let regions: Vec<(u32, RegionExtent)> = extents
        .iter()
        .enumerate()
        .filter_map(|(label, extent)| Some((u32::try_from(label).ok()?, (*extent)?)))
        .filter(|(_, extent)| extent.pixels >= config.min_region_pixels)
        .collect();
    tracing::debug!(
        components = extents.iter().flatten().count(),
        kept = regions.len(),
        min_region_pixels = config.min_region_pixels,
        "labelled regions"
    );

    let outcomes = regions
        .par_iter()
        .map(|&(label, extent)| {
            let pixels = extent.pixels;
            let mask = RegionMask::with_extent(&labels, label, extent);
            let result = extract(&mask, config, ctx);
            if let Err(ref e) = result {
                tracing::warn!(label, pixels, error = %e, "region skipped");
            }
            RegionOutcome {
                label,
                pixels,
                result,
            }
        })
        .collect();
    Ok(outcomes)
}

/// Extent of every label, indexed by label. Index 0 (background) and
/// unused labels are `None`.
fn component_extents(labels: &LabelImage) -> Vec<Option<RegionExtent>> {
    let mut extents: Vec<Option<RegionExtent>> = Vec::new();
    for (x, y, pixel) in labels.enumerate_pixels() {
        let label = pixel.0[0] as usize;
        if label == 0 {
            continue;
        }
        if extents.len() <= label {
            extents.resize(label + 1, None);
        }
        let (row, col) = (i64::from(y), i64::from(x));
        match &mut extents[label] {
            Some(extent) => extent.include(row, col),
            slot @ None => *slot = Some(RegionExtent::at(row, col)),
        }
    }
    extents
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::cell::Cell;
    use std::ops::Range;

    use super::*;
    use crate::descriptor::EncoderKind;
    use crate::raster::PixelSource;
    use crate::trace::trace_boundary;

    /// Paint inclusive rectangles `(top, left, bottom, right)` white.
    fn image_with(rects: &[(u32, u32, u32, u32)]) -> GrayImage {
        GrayImage::from_fn(40, 30, |x, y| {
            let inside = rects
                .iter()
                .any(|&(t, l, b, r)| (t..=b).contains(&y) && (l..=r).contains(&x));
            if inside { Luma([255]) } else { Luma([0]) }
        })
    }

    #[test]
    fn one_outcome_per_region_in_label_order() {
        let img = image_with(&[(2, 2, 6, 6), (10, 20, 20, 30), (24, 3, 27, 12)]);
        let ctx = SpectralContext::new();
        let outcomes = extract_regions(&img, &ShapeConfig::default(), &ctx).unwrap();
        let labels: Vec<u32> = outcomes.iter().map(|o| o.label).collect();
        assert_eq!(labels, vec![1, 2, 3]);
        let pixels: Vec<usize> = outcomes.iter().map(|o| o.pixels).collect();
        assert_eq!(pixels, vec![25, 121, 40]);
        let lengths: Vec<usize> = outcomes
            .iter()
            .map(|o| o.result.as_ref().unwrap().boundary.len())
            .collect();
        assert_eq!(lengths, vec![16, 40, 24]);
    }

    #[test]
    fn small_regions_are_dropped() {
        let img = image_with(&[(2, 2, 6, 6), (15, 15, 15, 15)]);
        let ctx = SpectralContext::new();
        let outcomes = extract_regions(&img, &ShapeConfig::default(), &ctx).unwrap();
        assert_eq!(outcomes.len(), 1);

        let config = ShapeConfig {
            min_region_pixels: 30,
            ..ShapeConfig::default()
        };
        assert!(extract_regions(&img, &config, &ctx).unwrap().is_empty());
    }

    #[test]
    fn failures_stay_local() {
        // The 1x3 bar traces to 4 points, too short for the coarse encoder.
        let img = image_with(&[(2, 2, 6, 6), (20, 10, 20, 12)]);
        let ctx = SpectralContext::new();
        let outcomes = extract_regions(&img, &ShapeConfig::default(), &ctx).unwrap();
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes[0].result.is_ok());
        assert_eq!(outcomes[1].result.as_ref().unwrap_err().kind(), "insufficient_points");
    }

    #[test]
    fn regions_match_single_region_extraction() {
        let img = image_with(&[(10, 20, 20, 30)]);
        let ctx = SpectralContext::new();
        let config = ShapeConfig {
            encoder: EncoderKind::Fine,
            ..ShapeConfig::default()
        };
        let outcomes = extract_regions(&img, &config, &ctx).unwrap();
        let single = crate::extract_image(&img, &config, &ctx).unwrap();
        assert_eq!(outcomes[0].result.as_ref().unwrap(), &single);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let ctx = SpectralContext::new();
        let config = ShapeConfig {
            encoder: EncoderKind::Resampled { buckets: 0 },
            ..ShapeConfig::default()
        };
        assert!(extract_regions(&GrayImage::new(4, 4), &config, &ctx).is_err());
    }

    #[test]
    fn outcomes_serialize_errors_as_kind_and_message() {
        let img = image_with(&[(20, 10, 20, 12)]);
        let ctx = SpectralContext::new();
        let outcomes = extract_regions(&img, &ShapeConfig::default(), &ctx).unwrap();
        let json = serde_json::to_value(&outcomes).unwrap();
        assert_eq!(json[0]["result"]["Err"]["kind"], "insufficient_points");
    }

    /// Counts intensity lookups made through the wrapped mask.
    struct CountingMask<'a> {
        mask: RegionMask<'a>,
        lookups: Cell<usize>,
    }

    impl PixelSource for CountingMask<'_> {
        fn width(&self) -> u32 {
            self.mask.width()
        }

        fn height(&self) -> u32 {
            self.mask.height()
        }

        fn intensity(&self, row: i64, col: i64) -> u8 {
            self.lookups.set(self.lookups.get() + 1);
            self.mask.intensity(row, col)
        }

        fn search_window(&self) -> (Range<i64>, Range<i64>) {
            self.mask.search_window()
        }

        fn foreground_count(&self) -> usize {
            self.mask.foreground_count()
        }
    }

    #[test]
    fn known_extent_keeps_lookups_inside_the_region() {
        // A 5x5 square far from the middle row of a 400x300 image.
        let img = GrayImage::from_fn(400, 300, |x, y| {
            if (10..15).contains(&y) && (300..305).contains(&x) {
                Luma([255])
            } else {
                Luma([0])
            }
        });
        let labels = connected_components(&img, Connectivity::Eight, Luma([0u8]));
        let extents = component_extents(&labels);
        let extent = extents[1].unwrap();
        assert_eq!(extent.pixels, 25);

        let counted = CountingMask {
            mask: RegionMask::with_extent(&labels, 1, extent),
            lookups: Cell::new(0),
        };
        let boundary = trace_boundary(&counted).unwrap();
        // The 25-pixel box, the start neighbourhood, then at most 8
        // lookups per step including the closing one. A whole-image
        // scan would be 120000.
        assert!(counted.lookups.get() <= 25 + 8 * (boundary.len() + 2));

        let full = trace_boundary(&RegionMask::new(&labels, 1)).unwrap();
        assert_eq!(boundary, full);
    }
}
