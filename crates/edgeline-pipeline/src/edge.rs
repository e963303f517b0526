//! Blur plus Canny edge detection.
//!
//! Produces the binary edge map that becomes the tracing mask: 255 for
//! edge pixels, 0 for background.

use image::GrayImage;

/// Minimum allowed Canny threshold.
///
/// A zero low threshold admits every pixel with any gradient, giving an
/// edge map so dense that tracing degenerates into noise.
pub const MIN_THRESHOLD: f32 = 1.0;
const _: () = assert!(MIN_THRESHOLD > 0.0);

/// Gaussian blur. Non-positive `sigma` returns the image unchanged
/// (`imageproc` panics on `sigma <= 0`).
#[must_use = "returns the blurred image"]
pub fn gaussian_blur(image: &GrayImage, sigma: f32) -> GrayImage {
    if sigma <= 0.0 {
        return image.clone();
    }
    imageproc::filter::gaussian_blur_f32(image, sigma)
}

/// Canny edge detection with clamped thresholds.
///
/// Both thresholds are raised to at least [`MIN_THRESHOLD`] and `low`
/// is lowered to at most `high`.
#[must_use = "returns the binary edge map"]
pub fn canny(image: &GrayImage, low_threshold: f32, high_threshold: f32) -> GrayImage {
    let high = high_threshold.max(MIN_THRESHOLD);
    let low = low_threshold.max(MIN_THRESHOLD).min(high);
    imageproc::edges::canny(image, low, high)
}

/// Blur with `sigma`, then run Canny.
///
/// Larger `sigma` suppresses fine texture, leaving only the strong
/// outlines.
#[must_use = "returns the binary edge map"]
pub fn detect_edges(gray: &GrayImage, sigma: f32, low_threshold: f32, high_threshold: f32) -> GrayImage {
    let blurred = gaussian_blur(gray, sigma);
    let edges = canny(&blurred, low_threshold, high_threshold);
    tracing::debug!(
        sigma,
        edge_pixels = count_edge_pixels(&edges),
        "detected edges"
    );
    edges
}

/// Count edge pixels (value 255).
#[must_use]
pub fn count_edge_pixels(image: &GrayImage) -> u64 {
    image
        .pixels()
        .map(|p| u64::from(u8::from(p.0[0] == 255)))
        .sum()
}
