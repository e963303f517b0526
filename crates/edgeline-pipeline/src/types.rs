//! Shared types for the edgeline pipeline.

use serde::{Deserialize, Serialize};

use crate::mask::MaskError;
use crate::trace::TracerKind;

/// Re-export `GrayImage` so downstream crates can reference
/// intermediate raster data without depending on `image` directly.
pub use image::GrayImage;

/// A 2D point in mask pixel coordinates.
///
/// `x` is the column index and `y` is the row index, so a cell at
/// `(row, column)` becomes `Point { x: column, y: row }`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal position (pixels from left edge).
    pub x: f64,
    /// Vertical position (pixels from top edge).
    pub y: f64,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance to another point.
    ///
    /// Avoids the square root for comparison purposes.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx.mul_add(dx, dy * dy)
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        self.distance_squared(other).sqrt()
    }

    /// Returns `true` if both coordinates are finite.
    #[must_use]
    pub const fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// An ordered sequence of points drawn as one connected stroke.
///
/// Raw paths from the tracer hold integer-valued coordinates; smoothed
/// paths hold interpolated ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polyline(Vec<Point>);

impl Polyline {
    /// Create a new polyline from a vector of points.
    #[must_use]
    pub const fn new(points: Vec<Point>) -> Self {
        Self(points)
    }

    /// Returns `true` if the polyline has no points.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of points in the polyline.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns the first point, if any.
    #[must_use]
    pub fn first(&self) -> Option<&Point> {
        self.0.first()
    }

    /// Returns the last point, if any.
    #[must_use]
    pub fn last(&self) -> Option<&Point> {
        self.0.last()
    }

    /// Returns a slice of all points.
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.0
    }

    /// Consumes the polyline and returns the underlying vector of points.
    #[must_use]
    pub fn into_points(self) -> Vec<Point> {
        self.0
    }
}

/// Mask dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels (number of columns).
    pub width: u32,
    /// Height in pixels (number of rows).
    pub height: u32,
}

impl Dimensions {
    /// Total number of cells (`width * height`).
    #[must_use]
    pub fn cell_count(self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Returns `true` if either dimension is zero.
    #[must_use]
    pub const fn is_degenerate(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Uniform scale plus centering offset mapping mask pixels into the
/// output frame.
///
/// Applied to raw coordinates as `translate(offset) scale(scale)`:
/// `frame = offset + scale * raw`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    /// Scale factor shared by both axes.
    pub scale: f64,
    /// Horizontal centering offset in frame units.
    pub offset_x: f64,
    /// Vertical centering offset in frame units.
    pub offset_y: f64,
}

impl Transform {
    /// Map a raw mask-space point into frame coordinates.
    #[must_use]
    pub fn apply(self, p: Point) -> Point {
        Point::new(
            self.scale.mul_add(p.x, self.offset_x),
            self.scale.mul_add(p.y, self.offset_y),
        )
    }
}

/// A single drawing command in a path element.
///
/// Coordinates are in raw mask space, already rounded to one decimal
/// place. The document [`Transform`] maps them into the frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PathCommand {
    /// Start a new stroke at the given point.
    MoveTo(Point),
    /// Draw a straight segment from the current position to the point.
    LineTo(Point),
}

impl PathCommand {
    /// The command's target point.
    #[must_use]
    pub const fn point(self) -> Point {
        match self {
            Self::MoveTo(p) | Self::LineTo(p) => p,
        }
    }
}

/// Line join / cap shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineShape {
    /// Rounded corners and ends.
    Round,
}

/// Stroke styling carried by every path element.
///
/// The pipeline only ever produces [`StrokeStyle::default`]: no fill,
/// black stroke of width 0.5, round joins and caps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrokeStyle {
    /// Stroke color as an SVG color keyword.
    pub stroke: String,
    /// Stroke width in mask units. Exporters place it inside the scaled
    /// group, so it grows with the drawing.
    pub width: f64,
    /// Fill color keyword (`"none"` for open strokes).
    pub fill: String,
    /// Line join shape.
    pub line_join: LineShape,
    /// Line cap shape.
    pub line_cap: LineShape,
}

impl Default for StrokeStyle {
    fn default() -> Self {
        Self {
            stroke: "black".to_string(),
            width: 0.5,
            fill: "none".to_string(),
            line_join: LineShape::Round,
            line_cap: LineShape::Round,
        }
    }
}

/// One drawable stroke: a move followed by one or more lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathElement {
    /// Commands in drawing order; always starts with a `MoveTo`.
    pub commands: Vec<PathCommand>,
    /// Stroke style for this element.
    pub style: StrokeStyle,
}

/// Vector drawing ready for serialization.
///
/// Assembled once by [`emit`](crate::emit::emit) and never mutated
/// afterwards. All paths share the one transform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorDocument {
    /// Side length of the square output frame; also the viewBox size.
    pub frame_size: f64,
    /// Group transform wrapping all paths.
    pub transform: Transform,
    /// Path elements in tracing order.
    pub paths: Vec<PathElement>,
}

impl VectorDocument {
    /// Total number of drawing commands across all paths.
    #[must_use]
    pub fn command_count(&self) -> usize {
        self.paths.iter().map(|p| p.commands.len()).sum()
    }
}

/// Configuration for the edgeline pipeline.
///
/// The raster front-end fields (`blur_sigma`, `canny_low`, `canny_high`,
/// `thin`) only affect [`process`](crate::process); [`vectorize`]
/// reads `tracer`, `smoothing_factor` and `frame_size`.
///
/// Use [`validate`](Self::validate) before running with values that did
/// not come from [`Default`].
///
/// [`vectorize`]: crate::vectorize
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Gaussian blur sigma applied before Canny. `0.0` skips the blur.
    pub blur_sigma: f32,

    /// Canny low threshold. Must be at least [`edge::MIN_THRESHOLD`] and
    /// at most `canny_high`.
    ///
    /// [`edge::MIN_THRESHOLD`]: crate::edge::MIN_THRESHOLD
    pub canny_low: f32,

    /// Canny high threshold.
    pub canny_high: f32,

    /// Whether to thin the edge mask to one-pixel strokes before tracing.
    pub thin: bool,

    /// Which path tracing policy to use.
    pub tracer: TracerKind,

    /// Residual budget for curve smoothing. `0.0` interpolates exactly.
    pub smoothing_factor: f64,

    /// Side length of the square output frame.
    pub frame_size: f64,
}

impl PipelineConfig {
    /// Default Gaussian blur sigma.
    pub const DEFAULT_BLUR_SIGMA: f32 = 1.0;
    /// Default Canny low threshold: 10% of the 0-255 intensity range.
    pub const DEFAULT_CANNY_LOW: f32 = 25.5;
    /// Default Canny high threshold: 20% of the 0-255 intensity range.
    pub const DEFAULT_CANNY_HIGH: f32 = 51.0;
    /// Default smoothing residual budget.
    pub const DEFAULT_SMOOTHING_FACTOR: f64 = 1.0;
    /// Default output frame size.
    pub const DEFAULT_FRAME_SIZE: f64 = 256.0;

    /// Check that every parameter is usable.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] naming the first offending
    /// field.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if !self.blur_sigma.is_finite() || self.blur_sigma < 0.0 {
            return Err(PipelineError::InvalidConfig(format!(
                "blur_sigma must be finite and non-negative, got {}",
                self.blur_sigma
            )));
        }
        if !(self.canny_low.is_finite() && self.canny_high.is_finite()) {
            return Err(PipelineError::InvalidConfig(
                "canny thresholds must be finite".to_string(),
            ));
        }
        if self.canny_low < crate::edge::MIN_THRESHOLD {
            return Err(PipelineError::InvalidConfig(format!(
                "canny_low must be at least {}, got {}",
                crate::edge::MIN_THRESHOLD,
                self.canny_low
            )));
        }
        if self.canny_low > self.canny_high {
            return Err(PipelineError::InvalidConfig(format!(
                "canny_low ({}) exceeds canny_high ({})",
                self.canny_low, self.canny_high
            )));
        }
        if !self.smoothing_factor.is_finite() || self.smoothing_factor < 0.0 {
            return Err(PipelineError::InvalidConfig(format!(
                "smoothing_factor must be finite and non-negative, got {}",
                self.smoothing_factor
            )));
        }
        if !self.frame_size.is_finite() || self.frame_size <= 0.0 {
            return Err(PipelineError::InvalidConfig(format!(
                "frame_size must be finite and positive, got {}",
                self.frame_size
            )));
        }
        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            blur_sigma: Self::DEFAULT_BLUR_SIGMA,
            canny_low: Self::DEFAULT_CANNY_LOW,
            canny_high: Self::DEFAULT_CANNY_HIGH,
            thin: true,
            tracer: TracerKind::default(),
            smoothing_factor: Self::DEFAULT_SMOOTHING_FACTOR,
            frame_size: Self::DEFAULT_FRAME_SIZE,
        }
    }
}

/// Errors that can occur during pipeline processing.
///
/// Uses custom `Serialize`/`Deserialize` because `image::ImageError`
/// does not implement serde traits. The `ImageDecode` variant is
/// serialized as its `Display` string.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Failed to decode the input image.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// Pipeline configuration is invalid.
    #[error("invalid pipeline configuration: {0}")]
    InvalidConfig(String),

    /// The mask has a zero-length side, so no scale can be derived.
    #[error("mask has degenerate dimensions {width}x{height}")]
    DegenerateMask {
        /// Mask width in pixels.
        width: u32,
        /// Mask height in pixels.
        height: u32,
    },

    /// The mask cells did not describe a rectangular grid.
    #[error("malformed mask: {0}")]
    Mask(#[from] MaskError),
}

/// Serde-compatible proxy for `PipelineError`.
///
/// A deserialized `ImageDecode` becomes `InvalidConfig` carrying the
/// original message, since the typed `image::ImageError` cannot be
/// reconstructed.
#[derive(Serialize, Deserialize)]
enum PipelineErrorProxy {
    ImageDecode(String),
    EmptyInput,
    InvalidConfig(String),
    DegenerateMask { width: u32, height: u32 },
    Mask(MaskError),
}

impl Serialize for PipelineError {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let proxy = match self {
            Self::ImageDecode(e) => PipelineErrorProxy::ImageDecode(e.to_string()),
            Self::EmptyInput => PipelineErrorProxy::EmptyInput,
            Self::InvalidConfig(s) => PipelineErrorProxy::InvalidConfig(s.clone()),
            Self::DegenerateMask { width, height } => PipelineErrorProxy::DegenerateMask {
                width: *width,
                height: *height,
            },
            Self::Mask(e) => PipelineErrorProxy::Mask(e.clone()),
        };
        proxy.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PipelineError {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let proxy = PipelineErrorProxy::deserialize(deserializer)?;
        Ok(match proxy {
            PipelineErrorProxy::ImageDecode(msg) => {
                Self::InvalidConfig(format!("image decode error: {msg}"))
            }
            PipelineErrorProxy::EmptyInput => Self::EmptyInput,
            PipelineErrorProxy::InvalidConfig(s) => Self::InvalidConfig(s),
            PipelineErrorProxy::DegenerateMask { width, height } => {
                Self::DegenerateMask { width, height }
            }
            PipelineErrorProxy::Mask(e) => Self::Mask(e),
        })
    }
}
