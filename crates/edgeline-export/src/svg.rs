//! SVG export serializer.
//!
//! Builds the document with the [`svg`] crate, which handles XML
//! escaping and path data formatting.
//!
//! Layout:
//!
//! ```text
//! <svg width=F height=F viewBox="0 0 F F">
//!   [<title>] [<desc>]
//!   <g transform="translate(ox,oy) scale(s)">
//!     <path d="M x,y L x,y ..." fill="none" stroke="black"
//!           stroke-width="0.5" stroke-linejoin="round" stroke-linecap="round"/>
//!     ...
//!   </g>
//! </svg>
//! ```
//!
//! Path coordinates are the document's raw, rounded values. The group
//! transform maps them into the frame.

use svg::Document;
use svg::node::Text;
use svg::node::Value;
use svg::node::element::path::Data;
use svg::node::element::{Description, Group, Path, Title};

use edgeline_pipeline::{LineShape, PathCommand, PathElement, Transform, VectorDocument};

/// Metadata to embed in the SVG document.
///
/// When present, `<title>` and `<desc>` are emitted right after the
/// opening `<svg>` tag. Text is XML-escaped by the `svg` crate.
#[derive(Debug, Clone, Default)]
pub struct SvgMetadata<'a> {
    /// Document title, typically the source image stem.
    pub title: Option<&'a str>,
    /// Free-form description, typically the parameters used.
    pub description: Option<&'a str>,
}

/// Build the `d` attribute for one path element.
///
/// # Examples
///
/// ```
/// use edgeline_pipeline::{PathCommand, PathElement, Point, StrokeStyle};
/// use edgeline_export::build_path_data;
///
/// let element = PathElement {
///     commands: vec![
///         PathCommand::MoveTo(Point::new(10.0, 20.0)),
///         PathCommand::LineTo(Point::new(30.5, 40.0)),
///     ],
///     style: StrokeStyle::default(),
/// };
/// assert_eq!(build_path_data(&element), "M10,20 L30.5,40");
/// ```
#[must_use]
pub fn build_path_data(element: &PathElement) -> String {
    let data = element
        .commands
        .iter()
        .fold(Data::new(), |data, command| match *command {
            PathCommand::MoveTo(p) => data.move_to((p.x, p.y)),
            PathCommand::LineTo(p) => data.line_to((p.x, p.y)),
        });
    String::from(Value::from(data))
}

/// Serialize a vector document to SVG.
#[must_use]
pub fn to_svg(document: &VectorDocument) -> String {
    to_svg_with_metadata(document, &SvgMetadata::default())
}

/// Serialize a vector document to SVG with a title and description.
#[must_use]
pub fn to_svg_with_metadata(document: &VectorDocument, metadata: &SvgMetadata<'_>) -> String {
    let frame = document.frame_size;
    let mut doc = Document::new()
        .set("width", frame)
        .set("height", frame)
        .set("viewBox", (0.0, 0.0, frame, frame));

    if let Some(title) = metadata.title {
        doc = doc.add(Title::new(title));
    }
    if let Some(description) = metadata.description {
        doc = doc.add(Description::new().add(Text::new(description)));
    }

    let group = document
        .paths
        .iter()
        .fold(
            Group::new().set("transform", transform_attr(document.transform)),
            |group, element| group.add(path_node(element)),
        );
    doc = doc.add(group);

    // The svg crate omits the XML declaration, so we prepend it.
    format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{doc}\n")
}

fn transform_attr(t: Transform) -> String {
    format!(
        "translate({},{}) scale({})",
        t.offset_x, t.offset_y, t.scale
    )
}

fn path_node(element: &PathElement) -> Path {
    let style = &element.style;
    Path::new()
        .set("d", build_path_data(element))
        .set("fill", style.fill.as_str())
        .set("stroke", style.stroke.as_str())
        .set("stroke-width", style.width)
        .set("stroke-linejoin", line_shape(style.line_join))
        .set("stroke-linecap", line_shape(style.line_cap))
}

const fn line_shape(shape: LineShape) -> &'static str {
    match shape {
        LineShape::Round => "round",
    }
}
