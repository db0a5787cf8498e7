//! Read-only pixel access for boundary tracing.
//!
//! The tracer never touches pixel storage directly. It asks a
//! [`PixelSource`] whether a coordinate is foreground, and every
//! coordinate outside the grid answers "background". This keeps the
//! tracing loop free of bounds checks and lets the same tracer run over
//! a thresholded image, a single labelled component, or an in-memory
//! test grid.

use std::ops::Range;

use geo::Rect;
use image::{GrayImage, ImageBuffer, Luma};

use crate::types::Dimensions;

/// A label image as produced by
/// [`imageproc::region_labelling::connected_components`].
pub type LabelImage = ImageBuffer<Luma<u32>, Vec<u32>>;

/// A 2D grid of intensities with a background threshold.
pub trait PixelSource {
    /// Grid width in pixels.
    fn width(&self) -> u32;

    /// Grid height in pixels.
    fn height(&self) -> u32;

    /// Intensity at `(row, col)`. Total: out-of-range coordinates return
    /// `0` (background).
    fn intensity(&self, row: i64, col: i64) -> u8;

    /// Intensities strictly above this value are foreground.
    fn threshold(&self) -> u8 {
        0
    }

    /// Whether `(row, col)` is a foreground pixel.
    fn is_foreground(&self, row: i64, col: i64) -> bool {
        self.intensity(row, col) > self.threshold()
    }

    /// Grid dimensions.
    fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.width(),
            height: self.height(),
        }
    }

    /// Half-open `(rows, cols)` window outside which every pixel is
    /// background. Defaults to the whole grid.
    fn search_window(&self) -> (Range<i64>, Range<i64>) {
        (0..i64::from(self.height()), 0..i64::from(self.width()))
    }

    /// Number of foreground pixels. Defaults to scanning
    /// [`search_window`](Self::search_window).
    fn foreground_count(&self) -> usize {
        count_foreground(self)
    }
}

/// Convert signed grid coordinates to in-bounds `(x, y)` indices.
fn in_bounds(row: i64, col: i64, width: u32, height: u32) -> Option<(u32, u32)> {
    let x = u32::try_from(col).ok()?;
    let y = u32::try_from(row).ok()?;
    (x < width && y < height).then_some((x, y))
}

/// A grayscale image is foreground wherever it is non-zero.
impl PixelSource for GrayImage {
    fn width(&self) -> u32 {
        Self::width(self)
    }

    fn height(&self) -> u32 {
        Self::height(self)
    }

    fn intensity(&self, row: i64, col: i64) -> u8 {
        in_bounds(row, col, Self::width(self), Self::height(self))
            .map_or(0, |(x, y)| self.get_pixel(x, y).0[0])
    }
}

/// A borrowed grayscale image with an explicit background threshold.
#[derive(Debug, Clone, Copy)]
pub struct ThresholdedImage<'a> {
    image: &'a GrayImage,
    threshold: u8,
}

impl<'a> ThresholdedImage<'a> {
    /// Wrap `image` so that intensities above `threshold` are foreground.
    #[must_use]
    pub const fn new(image: &'a GrayImage, threshold: u8) -> Self {
        Self { image, threshold }
    }
}

impl PixelSource for ThresholdedImage<'_> {
    fn width(&self) -> u32 {
        self.image.width()
    }

    fn height(&self) -> u32 {
        self.image.height()
    }

    fn intensity(&self, row: i64, col: i64) -> u8 {
        PixelSource::intensity(self.image, row, col)
    }

    fn threshold(&self) -> u8 {
        self.threshold
    }
}

/// Size and inclusive bounding box of one labelled component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionExtent {
    /// Pixels carrying the label.
    pub pixels: usize,
    /// Inclusive bounds, `x` = column, `y` = row.
    pub bounds: Rect<i64>,
}

impl RegionExtent {
    /// A one-pixel extent at `(row, col)`.
    #[must_use]
    pub fn at(row: i64, col: i64) -> Self {
        Self {
            pixels: 1,
            bounds: Rect::new((col, row), (col, row)),
        }
    }

    /// Grow the extent by one pixel at `(row, col)`.
    pub fn include(&mut self, row: i64, col: i64) {
        let (min, max) = (self.bounds.min(), self.bounds.max());
        self.bounds = Rect::new(
            (min.x.min(col), min.y.min(row)),
            (max.x.max(col), max.y.max(row)),
        );
        self.pixels += 1;
    }
}

/// One labelled component of a label image, seen as a binary grid.
///
/// Pixels carrying `label` are foreground (intensity 255); every other
/// pixel, including other components, is background. With a known
/// [`RegionExtent`] the start search and the foreground count stay
/// inside the component's bounding box instead of the whole image.
#[derive(Debug, Clone, Copy)]
pub struct RegionMask<'a> {
    labels: &'a LabelImage,
    label: u32,
    extent: Option<RegionExtent>,
}

impl<'a> RegionMask<'a> {
    /// View the pixels of `labels` equal to `label`.
    #[must_use]
    pub const fn new(labels: &'a LabelImage, label: u32) -> Self {
        Self {
            labels,
            label,
            extent: None,
        }
    }

    /// View `label` whose size and bounds are already known.
    ///
    /// `extent` must cover every pixel carrying `label`.
    #[must_use]
    pub const fn with_extent(labels: &'a LabelImage, label: u32, extent: RegionExtent) -> Self {
        Self {
            labels,
            label,
            extent: Some(extent),
        }
    }

    /// The component label this mask selects.
    #[must_use]
    pub const fn label(&self) -> u32 {
        self.label
    }
}

impl PixelSource for RegionMask<'_> {
    fn width(&self) -> u32 {
        self.labels.width()
    }

    fn height(&self) -> u32 {
        self.labels.height()
    }

    fn intensity(&self, row: i64, col: i64) -> u8 {
        in_bounds(row, col, self.labels.width(), self.labels.height()).map_or(0, |(x, y)| {
            if self.labels.get_pixel(x, y).0[0] == self.label {
                u8::MAX
            } else {
                0
            }
        })
    }

    fn search_window(&self) -> (Range<i64>, Range<i64>) {
        self.extent.map_or_else(
            || (0..i64::from(self.height()), 0..i64::from(self.width())),
            |extent| {
                let (min, max) = (extent.bounds.min(), extent.bounds.max());
                (min.y..max.y + 1, min.x..max.x + 1)
            },
        )
    }

    fn foreground_count(&self) -> usize {
        self.extent
            .map_or_else(|| count_foreground(self), |extent| extent.pixels)
    }
}

/// An owned row-major boolean grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryGrid {
    width: u32,
    height: u32,
    cells: Vec<bool>,
}

impl BinaryGrid {
    /// An all-background grid.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            cells: vec![false; width as usize * height as usize],
        }
    }

    /// Parse rows of `#` (foreground) and any other character
    /// (background). Short rows are padded with background.
    #[must_use]
    pub fn from_rows(rows: &[&str]) -> Self {
        let width = rows.iter().map(|r| r.chars().count()).max().unwrap_or(0);
        let mut grid = Self::new(
            u32::try_from(width).unwrap_or(u32::MAX),
            u32::try_from(rows.len()).unwrap_or(u32::MAX),
        );
        for (row, line) in rows.iter().enumerate() {
            for (col, ch) in line.chars().enumerate() {
                if ch == '#' {
                    grid.cells[row * width + col] = true;
                }
            }
        }
        grid
    }

    /// Mark `(row, col)` as foreground or background. Out-of-range
    /// coordinates are ignored.
    pub fn set(&mut self, row: i64, col: i64, foreground: bool) {
        if let Some((x, y)) = in_bounds(row, col, self.width, self.height) {
            let idx = y as usize * self.width as usize + x as usize;
            self.cells[idx] = foreground;
        }
    }

    /// Fill the inclusive rectangle `top..=bottom`, `left..=right`.
    pub fn fill_rect(&mut self, top: i64, left: i64, bottom: i64, right: i64) {
        for row in top..=bottom {
            for col in left..=right {
                self.set(row, col, true);
            }
        }
    }
}

impl PixelSource for BinaryGrid {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn intensity(&self, row: i64, col: i64) -> u8 {
        in_bounds(row, col, self.width, self.height).map_or(0, |(x, y)| {
            let idx = y as usize * self.width as usize + x as usize;
            if self.cells[idx] { u8::MAX } else { 0 }
        })
    }
}

/// Count every foreground pixel in the search window of `source`.
#[must_use]
pub fn count_foreground<S: PixelSource + ?Sized>(source: &S) -> usize {
    let (rows, cols) = source.search_window();
    rows.map(|row| {
        cols.clone()
            .filter(|&col| source.is_foreground(row, col))
            .count()
    })
    .sum()
}

/// Binarize `image`: foreground pixels become 255, background 0.
#[must_use]
pub fn binarize(image: &GrayImage, threshold: u8) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        if image.get_pixel(x, y).0[0] > threshold {
            Luma([u8::MAX])
        } else {
            Luma([0])
        }
    })
}
