//! Image decoding and grayscale conversion.
//!
//! Raw bytes in (PNG, JPEG, BMP, WebP), single-channel `GrayImage` out.
//! Alpha is discarded by the luminance conversion.

use image::GrayImage;

use crate::types::PipelineError;

/// Decode raw image bytes and convert to grayscale.
///
/// Uses the `image` crate's luminance conversion (Rec. 709 weights:
/// `0.2126*R + 0.7152*G + 0.0722*B`).
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] if `bytes` is empty.
/// Returns [`PipelineError::ImageDecode`] if the format is unrecognized
/// or the data is corrupt.
pub fn decode_and_grayscale(bytes: &[u8]) -> Result<GrayImage, PipelineError> {
    if bytes.is_empty() {
        return Err(PipelineError::EmptyInput);
    }

    let img = image::load_from_memory(bytes)?;
    tracing::debug!(
        width = img.width(),
        height = img.height(),
        input_bytes = bytes.len(),
        "decoded image"
    );
    Ok(img.to_luma8())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn encode_png(img: &image::RgbaImage) -> Vec<u8> {
        let mut buf = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut buf);
        image::ImageEncoder::write_image(
            encoder,
            img.as_raw(),
            img.width(),
            img.height(),
            image::ExtendedColorType::Rgba8,
        )
        .unwrap();
        buf
    }

    fn solid(r: u8, g: u8, b: u8) -> Vec<u8> {
        encode_png(&image::RgbaImage::from_pixel(1, 1, image::Rgba([r, g, b, 255])))
    }

    #[test]
    fn empty_input_returns_error() {
        assert!(matches!(
            decode_and_grayscale(&[]),
            Err(PipelineError::EmptyInput)
        ));
    }

    #[test]
    fn corrupt_bytes_return_decode_error() {
        assert!(matches!(
            decode_and_grayscale(&[0xFF, 0xFE, 0x00, 0x01]),
            Err(PipelineError::ImageDecode(_))
        ));
    }

    #[test]
    fn dimensions_are_preserved() {
        let img = image::RgbaImage::from_pixel(17, 31, image::Rgba([128, 64, 32, 255]));
        let gray = decode_and_grayscale(&encode_png(&img)).unwrap();
        assert_eq!((gray.width(), gray.height()), (17, 31));
    }

    #[test]
    fn white_stays_white_and_black_stays_black() {
        assert_eq!(decode_and_grayscale(&solid(255, 255, 255)).unwrap().get_pixel(0, 0).0[0], 255);
        assert_eq!(decode_and_grayscale(&solid(0, 0, 0)).unwrap().get_pixel(0, 0).0[0], 0);
    }

    #[test]
    fn green_weighs_most_and_blue_least() {
        let r = decode_and_grayscale(&solid(255, 0, 0)).unwrap().get_pixel(0, 0).0[0];
        let g = decode_and_grayscale(&solid(0, 255, 0)).unwrap().get_pixel(0, 0).0[0];
        let b = decode_and_grayscale(&solid(0, 0, 255)).unwrap().get_pixel(0, 0).0[0];
        assert!(g > r && r > b, "R={r} G={g} B={b}");
    }
}
