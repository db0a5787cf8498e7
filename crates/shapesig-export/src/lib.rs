//! shapesig-export: Pure format serializers (sans-IO)
//!
//! Converts traced and reconstructed boundaries into output formats.
//! Currently supports SVG.

pub mod svg;

pub use svg::{ContourLayer, SvgMetadata, build_path_data, report_to_svg, to_svg};
