//! edgeline-export: Pure format serializers (sans-IO)
//!
//! Turns a [`VectorDocument`](edgeline_pipeline::VectorDocument) into
//! SVG text, and frames several documents into one text stream for
//! batch output.

pub mod framing;
pub mod svg;

pub use framing::{ExportError, SVG_END, SVG_SEPARATOR, SVG_START, frame_documents, parse_framed};
pub use svg::{SvgMetadata, build_path_data, to_svg, to_svg_with_metadata};
