//! SVG export serializer.
//!
//! Converts closed boundaries into an SVG string with one `<path>` per
//! contour, using the [`svg`] crate for document construction, XML
//! escaping, and path data formatting.
//!
//! Grid points are `(row, col)`; SVG is `(x, y)`, so a point is emitted
//! as `x = col`, `y = row`. Every path is closed with `z` because
//! boundaries wrap from the last point back to the first.
//!
//! Optional [`SvgMetadata`] embeds `<title>` and `<desc>` elements, and
//! the extraction config as JSON inside `<metadata>`.
//!
//! This is a pure function with no I/O -- it returns a `String`.

use svg::Document;
use svg::node::element::path::Data;
use svg::node::element::{Circle, Description, Element, Group, Path, Title};
use svg::node::{Node, Text, Value};

use shapesig_pipeline::{Dimensions, GridPoint, PointSequence, ShapeReport};

/// Stroke colour of traced boundaries.
pub const BOUNDARY_STROKE: &str = "black";
/// Stroke colour of smoothed reconstructions.
pub const SMOOTHED_STROKE: &str = "crimson";

/// Metadata to embed in the SVG document.
///
/// All fields are optional. Text values are XML-escaped automatically by
/// the `svg` crate.
#[derive(Debug, Clone, Default)]
pub struct SvgMetadata<'a> {
    /// Document title, emitted as `<title>`.
    ///
    /// Typically the source image filename (without extension).
    pub title: Option<&'a str>,

    /// Document description, emitted as `<desc>`.
    pub description: Option<&'a str>,

    /// Serialized [`ShapeConfig`](shapesig_pipeline::ShapeConfig),
    /// emitted inside `<metadata>` so exported files carry the settings
    /// that produced them.
    pub config_json: Option<&'a str>,
}

/// One closed contour to draw.
#[derive(Debug, Clone, Copy)]
pub struct ContourLayer<'a> {
    /// The contour, in boundary order.
    pub points: &'a PointSequence,
    /// Stroke colour.
    pub stroke: &'a str,
    /// Optional `id` for the path element.
    pub id: Option<&'a str>,
    /// Mark the first point with a small dot.
    pub mark_start: bool,
}

impl<'a> ContourLayer<'a> {
    /// A black boundary layer with the start point marked.
    #[must_use]
    pub const fn boundary(points: &'a PointSequence) -> Self {
        Self {
            points,
            stroke: BOUNDARY_STROKE,
            id: None,
            mark_start: true,
        }
    }

    /// A reconstruction layer without a start marker.
    #[must_use]
    pub const fn smoothed(points: &'a PointSequence) -> Self {
        Self {
            points,
            stroke: SMOOTHED_STROKE,
            id: None,
            mark_start: false,
        }
    }

    /// Set the element `id`.
    #[must_use]
    pub const fn with_id(mut self, id: &'a str) -> Self {
        self.id = Some(id);
        self
    }
}

#[allow(clippy::cast_precision_loss)]
fn to_xy(p: GridPoint) -> (f64, f64) {
    (p.col as f64, p.row as f64)
}

/// Build a closed SVG path `d` attribute string from a boundary.
///
/// Uses `M` for the first point, `L` for the rest, and `z` to close.
/// Returns an empty string for boundaries with fewer than 2 points.
///
/// # Examples
///
/// ```
/// use shapesig_pipeline::{GridPoint, PointSequence};
/// use shapesig_export::build_path_data;
///
/// let boundary = PointSequence::new(vec![
///     GridPoint::new(20, 10),
///     GridPoint::new(40, 30),
/// ]);
/// assert_eq!(build_path_data(&boundary), "M10,20 L30,40 z");
/// ```
#[must_use]
pub fn build_path_data(points: &PointSequence) -> String {
    let points = points.points();
    if points.len() < 2 {
        return String::new();
    }

    let mut data = Data::new().move_to(to_xy(points[0]));
    for &p in &points[1..] {
        data = data.line_to(to_xy(p));
    }
    String::from(Value::from(data.close()))
}

/// Serialize contour layers to an SVG document.
///
/// The `viewBox` matches the source image in pixels, so contours overlay
/// the image directly. Layers are drawn in order; layers whose contour
/// has fewer than 2 points are skipped.
#[must_use]
pub fn to_svg(layers: &[ContourLayer<'_>], dimensions: Dimensions, metadata: &SvgMetadata<'_>) -> String {
    let w = dimensions.width;
    let h = dimensions.height;
    let mut doc = Document::new()
        .set("width", w)
        .set("height", h)
        .set("viewBox", (0, 0, w, h));

    // Optional <title> element
    if let Some(title) = metadata.title {
        doc = doc.add(Title::new(title));
    }

    // Optional <desc> element
    if let Some(description) = metadata.description {
        doc = doc.add(Description::new().add(Text::new(description)));
    }

    // Optional <metadata> element with the extraction config
    if let Some(config_json) = metadata.config_json {
        let mut config_el = Element::new("shapesig:config");
        config_el.assign("xmlns:shapesig", "urn:shapesig:config:1");
        config_el.append(Text::new(config_json));
        let mut metadata_el = Element::new("metadata");
        metadata_el.append(config_el);
        doc = doc.add(metadata_el);
    }

    for layer in layers {
        let d = build_path_data(layer.points);
        if d.is_empty() {
            continue;
        }

        let mut path = Path::new()
            .set("d", d)
            .set("fill", "none")
            .set("stroke", layer.stroke)
            .set("stroke-width", 0.5);
        if let Some(id) = layer.id {
            path = path.set("id", id);
        }

        match layer.points.first() {
            Some(&start) if layer.mark_start => {
                let (x, y) = to_xy(start);
                let marker = Circle::new()
                    .set("cx", x)
                    .set("cy", y)
                    .set("r", 0.75)
                    .set("fill", layer.stroke);
                doc = doc.add(Group::new().add(path).add(marker));
            }
            _ => doc = doc.add(path),
        }
    }

    // The svg crate omits the XML declaration, so we prepend it.
    format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{doc}\n")
}

/// Serialize one extraction report: the traced boundary plus, when
/// present, its smoothed reconstruction.
#[must_use]
pub fn report_to_svg(
    report: &ShapeReport,
    dimensions: Dimensions,
    metadata: &SvgMetadata<'_>,
) -> String {
    let mut layers = vec![ContourLayer::boundary(&report.boundary).with_id("boundary")];
    if let Some(ref smoothed) = report.smoothed {
        layers.push(ContourLayer::smoothed(&smoothed.points).with_id("smoothed"));
    }
    to_svg(&layers, dimensions, metadata)
}
