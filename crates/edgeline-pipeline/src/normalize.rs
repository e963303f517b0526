//! Mask-to-frame transform.
//!
//! Fits the whole mask into a square output frame of side `frame_size`
//! with one uniform scale, then centers it:
//!
//! ```text
//! scale    = min(frame / width, frame / height)
//! offset_x = (frame - width  * scale) / 2
//! offset_y = (frame - height * scale) / 2
//! ```
//!
//! The longer side fills the frame and the shorter side is centered, so
//! the aspect ratio is preserved. Paths stay in mask coordinates; the
//! transform is carried by the document and applied as
//! `translate(offset) scale(scale)`.

use crate::types::{Dimensions, PipelineError, Transform};

/// Compute the transform that fits a mask of `dimensions` into a
/// `frame_size x frame_size` frame.
///
/// # Errors
///
/// Returns [`PipelineError::DegenerateMask`] if either side is zero and
/// [`PipelineError::InvalidConfig`] if `frame_size` is not a positive
/// finite number.
///
/// # Examples
///
/// ```
/// use edgeline_pipeline::{Dimensions, normalize::compute_transform};
///
/// let t = compute_transform(Dimensions { width: 100, height: 50 }, 256.0).unwrap();
/// assert!((t.scale - 2.56).abs() < 1e-12);
/// assert!((t.offset_y - 64.0).abs() < 1e-12);
/// ```
pub fn compute_transform(
    dimensions: Dimensions,
    frame_size: f64,
) -> Result<Transform, PipelineError> {
    if dimensions.is_degenerate() {
        return Err(PipelineError::DegenerateMask {
            width: dimensions.width,
            height: dimensions.height,
        });
    }
    if !frame_size.is_finite() || frame_size <= 0.0 {
        return Err(PipelineError::InvalidConfig(format!(
            "frame_size must be finite and positive, got {frame_size}"
        )));
    }

    let width = f64::from(dimensions.width);
    let height = f64::from(dimensions.height);
    let scale = (frame_size / width).min(frame_size / height);

    Ok(Transform {
        scale,
        offset_x: width.mul_add(-scale, frame_size) / 2.0,
        offset_y: height.mul_add(-scale, frame_size) / 2.0,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::Point;

    fn dims(width: u32, height: u32) -> Dimensions {
        Dimensions { width, height }
    }

    #[test]
    fn wide_mask_fills_width_and_centers_vertically() {
        let t = compute_transform(dims(100, 50), 256.0).unwrap();
        assert!((t.scale - 2.56).abs() < 1e-12);
        assert!(t.offset_x.abs() < 1e-12);
        assert!((t.offset_y - 64.0).abs() < 1e-12);
    }

    #[test]
    fn tall_mask_fills_height_and_centers_horizontally() {
        let t = compute_transform(dims(50, 100), 256.0).unwrap();
        assert!((t.scale - 2.56).abs() < 1e-12);
        assert!((t.offset_x - 64.0).abs() < 1e-12);
        assert!(t.offset_y.abs() < 1e-12);
    }

    #[test]
    fn square_mask_has_no_offset() {
        let t = compute_transform(dims(5, 5), 256.0).unwrap();
        assert!((t.scale - 51.2).abs() < 1e-12);
        assert!(t.offset_x.abs() < 1e-12);
        assert!(t.offset_y.abs() < 1e-12);
    }

    #[test]
    fn mask_corners_land_inside_frame() {
        for (w, h) in [(1, 1), (3, 17), (640, 480), (1, 1000)] {
            let t = compute_transform(dims(w, h), 256.0).unwrap();
            assert!(t.scale > 0.0);
            let far = t.apply(Point::new(f64::from(w), f64::from(h)));
            let near = t.apply(Point::new(0.0, 0.0));
            assert!(near.x >= -1e-9 && near.y >= -1e-9);
            assert!(far.x <= 256.0 + 1e-9 && far.y <= 256.0 + 1e-9);
            // Centered: equal margins on both sides of each axis.
            assert!((near.x - (256.0 - far.x)).abs() < 1e-9);
            assert!((near.y - (256.0 - far.y)).abs() < 1e-9);
        }
    }

    #[test]
    fn zero_width_is_degenerate() {
        let result = compute_transform(dims(0, 10), 256.0);
        assert!(matches!(
            result,
            Err(PipelineError::DegenerateMask {
                width: 0,
                height: 10
            })
        ));
    }

    #[test]
    fn zero_height_is_degenerate() {
        assert!(compute_transform(dims(10, 0), 256.0).is_err());
    }

    #[test]
    fn non_positive_frame_is_rejected() {
        assert!(matches!(
            compute_transform(dims(10, 10), 0.0),
            Err(PipelineError::InvalidConfig(_))
        ));
        assert!(compute_transform(dims(10, 10), f64::NAN).is_err());
    }
}
