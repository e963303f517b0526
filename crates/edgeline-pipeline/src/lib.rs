//! edgeline-pipeline: binary edge mask to vector line art (sans-IO).
//!
//! The core path, [`vectorize`], turns a [`BinaryMask`] into a
//! [`VectorDocument`]:
//! tracing -> smoothing -> normalization -> emission.
//!
//! [`process`] puts a raster front end in front of it:
//! decode -> grayscale -> blur + Canny -> mask -> optional thinning.
//!
//! This crate has no I/O dependencies. It works on in-memory bytes and
//! returns structured data; serialization lives in `edgeline-export`
//! and file handling in the `edgeline` binary.

pub mod diagnostics;
pub mod edge;
pub mod emit;
pub mod grayscale;
pub mod mask;
pub mod normalize;
pub mod smooth;
pub mod thin;
pub mod trace;
pub mod types;

pub use diagnostics::{Clock, PipelineDiagnostics, process_with_diagnostics, vectorize_with_diagnostics};
pub use mask::{BinaryMask, MaskError};
pub use smooth::{FitError, Smoothed};
pub use trace::{PathTracer, TracerKind};
pub use types::{
    Dimensions, GrayImage, LineShape, PathCommand, PathElement, PipelineConfig, PipelineError,
    Point, Polyline, StrokeStyle, Transform, VectorDocument,
};

/// Vectorize a binary mask.
///
/// Reads `tracer`, `smoothing_factor` and `frame_size` from `config`.
/// The mask is traced as given; thinning belongs to [`process`].
///
/// An empty mask yields a document with no paths.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidConfig`] if `config` fails
/// [`PipelineConfig::validate`] and [`PipelineError::DegenerateMask`]
/// if the mask has a zero-length side.
///
/// # Examples
///
/// ```
/// use edgeline_pipeline::{BinaryMask, Dimensions, PipelineConfig, vectorize};
///
/// let mask = BinaryMask::from_fn(Dimensions { width: 5, height: 5 }, |x, y| x == y);
/// let doc = vectorize(&mask, &PipelineConfig::default()).unwrap();
/// assert_eq!(doc.paths.len(), 1);
/// assert!((doc.transform.scale - 51.2).abs() < 1e-9);
/// ```
pub fn vectorize(
    mask: &BinaryMask,
    config: &PipelineConfig,
) -> Result<VectorDocument, PipelineError> {
    config.validate()?;

    // 1. Frame transform (rejects degenerate masks up front).
    let transform = normalize::compute_transform(mask.dimensions(), config.frame_size)?;

    // 2. Path tracing.
    let raw = config.tracer.trace(mask);

    // 3. Curve smoothing. Failures fall back to the raw path.
    let smoothed: Vec<Polyline> = smooth::smooth_paths(&raw, config.smoothing_factor)
        .into_iter()
        .map(Smoothed::into_polyline)
        .collect();

    // 4. Emission.
    Ok(emit::emit(&smoothed, transform, config.frame_size))
}

/// Run the full raster pipeline.
///
/// Decodes `image_bytes` (PNG, JPEG, BMP, WebP), converts to grayscale,
/// blurs with `config.blur_sigma`, runs Canny, thins the edge mask when
/// `config.thin` is set, then [`vectorize`]s it.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] if `image_bytes` is empty,
/// [`PipelineError::ImageDecode`] if the image cannot be decoded, and
/// any error from [`vectorize`].
pub fn process(
    image_bytes: &[u8],
    config: &PipelineConfig,
) -> Result<VectorDocument, PipelineError> {
    config.validate()?;

    let gray = grayscale::decode_and_grayscale(image_bytes)?;
    let edges = edge::detect_edges(&gray, config.blur_sigma, config.canny_low, config.canny_high);
    let mask = BinaryMask::from_gray(&edges);
    let mask = if config.thin { thin::thin(&mask) } else { mask };

    vectorize(&mask, config)
}
