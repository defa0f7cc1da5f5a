//! Bit-plane (LSB) embedding over decoded pixel data.
//!
//! The carried message is the sentinel-wrapped signed payload as UTF-8
//! bytes, followed by a single zero byte. Bits are written MSB first into
//! the least-significant bit of the blue channel, one bit per pixel, in
//! row-major order. Output is always PNG so the bit plane survives encoding.

use std::io::Cursor;
use std::path::Path;

use image::{DynamicImage, GenericImageView, ImageFormat, ImageReader, Pixel};

use crate::codec::{bits_msb_first, decode_utf8, encode_utf8};
use crate::error::{Result, TracemarkError};
use crate::framing::{unwrap, wrap, START_SENTINEL};

/// Largest accepted width or height, in pixels.
pub const MAX_IMAGE_DIMENSION: u32 = 8192;

/// Channel index carrying the payload bit (RGBA order).
const BLUE: usize = 2;

/// Message terminator.
const TERMINATOR: u8 = 0;

/// Bits needed to carry a wrapped message of `wrapped_len` bytes.
pub fn required_bits(wrapped_len: usize) -> usize {
    (wrapped_len + 1) * 8
}

/// Bits available in a `width` x `height` carrier.
pub fn capacity_bits(width: u32, height: u32) -> usize {
    width as usize * height as usize
}

/// Embed a signed payload into encoded image bytes, returning PNG bytes.
pub fn embed(image_bytes: &[u8], signed_payload: &str) -> Result<Vec<u8>> {
    let image = decode(image_bytes)?;
    let marked = embed_into_image(image, signed_payload)?;
    encode_png(marked)
}

/// Embed into a file on disk and write the result to `destination` as PNG.
///
/// The source file is only read. Its encoded bytes are streamed by the
/// decoder, but the decoded image is still held in memory in full.
pub fn embed_file(source: &Path, destination: &Path, signed_payload: &str) -> Result<()> {
    let (width, height) = ImageReader::open(source)?
        .with_guessed_format()?
        .into_dimensions()
        .map_err(codec_error)?;
    check_dimensions(width, height)?;

    let image = ImageReader::open(source)?
        .with_guessed_format()?
        .decode()
        .map_err(codec_error)?;
    let marked = embed_into_image(image, signed_payload)?;

    marked
        .save_with_format(destination, ImageFormat::Png)
        .map_err(codec_error)?;

    tracing::debug!(
        source = %source.display(),
        destination = %destination.display(),
        "Wrote bit-plane watermarked image"
    );
    Ok(())
}

/// Write the message bits into the blue-channel LSBs of `image`.
///
/// 8-bit RGB and RGBA buffers are modified in place; any other color type
/// is converted to RGBA8 first.
pub fn embed_into_image(image: DynamicImage, signed_payload: &str) -> Result<DynamicImage> {
    check_dimensions(image.width(), image.height())?;

    let wrapped = wrap(signed_payload);
    if wrapped.contains('\0') {
        return Err(TracemarkError::Format(
            "Payload must not contain NUL, it terminates the bit-plane message".into(),
        ));
    }

    let mut message = encode_utf8(&wrapped);
    message.push(TERMINATOR);

    let required = required_bits(wrapped.len());
    let available = capacity_bits(image.width(), image.height());
    if required > available {
        return Err(TracemarkError::CapacityExceeded {
            required_bits: required,
            available_bits: available,
        });
    }

    let marked = match image {
        DynamicImage::ImageRgb8(mut rgb) => {
            set_blue_lsbs(rgb.pixels_mut(), &message);
            DynamicImage::ImageRgb8(rgb)
        }
        DynamicImage::ImageRgba8(mut rgba) => {
            set_blue_lsbs(rgba.pixels_mut(), &message);
            DynamicImage::ImageRgba8(rgba)
        }
        other => {
            let mut rgba = other.into_rgba8();
            set_blue_lsbs(rgba.pixels_mut(), &message);
            DynamicImage::ImageRgba8(rgba)
        }
    };

    tracing::debug!(
        bits = required,
        pixels = available,
        "Embedded payload into blue-channel bit plane"
    );
    Ok(marked)
}

fn set_blue_lsbs<'a, P>(pixels: impl Iterator<Item = &'a mut P>, message: &[u8])
where
    P: Pixel<Subpixel = u8> + 'a,
{
    for (pixel, bit) in pixels.zip(bits_msb_first(message)) {
        let blue = &mut pixel.channels_mut()[BLUE];
        *blue = (*blue & 0xFE) | u8::from(bit);
    }
}

/// Recover the signed payload from encoded image bytes.
///
/// `Ok(None)` means the image decoded but carries no wrapped message.
pub fn extract(image_bytes: &[u8]) -> Result<Option<String>> {
    let image = decode(image_bytes)?;
    Ok(extract_from_image(&image))
}

/// Recover the signed payload from an image file.
pub fn extract_file(path: &Path) -> Result<Option<String>> {
    let image = ImageReader::open(path)?
        .with_guessed_format()?
        .decode()
        .map_err(codec_error)?;
    Ok(extract_from_image(&image))
}

/// Read blue-channel LSBs until a zero byte.
///
/// Scanning is capped at twice the pixel count in bits and stops early once
/// the leading bytes cannot be the start sentinel. Pixels are read without
/// copying the buffer; non-RGBA8 images are converted one pixel at a time.
pub fn extract_from_image(image: &DynamicImage) -> Option<String> {
    let max_bits = capacity_bits(image.width(), image.height()).saturating_mul(2);
    let start = START_SENTINEL.as_bytes();

    let mut message = Vec::new();
    let mut current = 0u8;
    let mut filled = 0u8;
    let mut terminated = false;

    let blue_lsbs: Box<dyn Iterator<Item = u8> + '_> = match image {
        DynamicImage::ImageRgba8(rgba) => Box::new(rgba.pixels().map(|p| p[BLUE] & 1)),
        DynamicImage::ImageRgb8(rgb) => Box::new(rgb.pixels().map(|p| p[BLUE] & 1)),
        other => Box::new(other.pixels().map(|(_, _, p)| p[BLUE] & 1)),
    };

    for bit in blue_lsbs.take(max_bits) {
        current = (current << 1) | bit;
        filled += 1;
        if filled < 8 {
            continue;
        }

        if current == TERMINATOR {
            terminated = true;
            break;
        }
        message.push(current);
        current = 0;
        filled = 0;

        if message.len() <= start.len() && message[..] != start[..message.len()] {
            return None;
        }
    }

    if !terminated {
        return None;
    }

    let text = decode_utf8(&message).ok()?;
    unwrap(Some(&text))
}

/// Reject images above the dimension ceiling.
pub fn check_dimensions(width: u32, height: u32) -> Result<()> {
    if width > MAX_IMAGE_DIMENSION || height > MAX_IMAGE_DIMENSION {
        return Err(TracemarkError::ImageTooLarge {
            width,
            height,
            max: MAX_IMAGE_DIMENSION,
        });
    }
    Ok(())
}

fn decode(image_bytes: &[u8]) -> Result<DynamicImage> {
    let reader = ImageReader::new(Cursor::new(image_bytes)).with_guessed_format()?;
    let (width, height) = reader.into_dimensions().map_err(codec_error)?;
    check_dimensions(width, height)?;

    ImageReader::new(Cursor::new(image_bytes))
        .with_guessed_format()?
        .decode()
        .map_err(codec_error)
}

fn encode_png(image: DynamicImage) -> Result<Vec<u8>> {
    let mut out = Cursor::new(Vec::new());
    image
        .write_to(&mut out, ImageFormat::Png)
        .map_err(codec_error)?;
    Ok(out.into_inner())
}

fn codec_error(err: image::ImageError) -> TracemarkError {
    TracemarkError::ImageCodec(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb, RgbImage, Rgba, RgbaImage};

    const SIGNED: &str = "doc|a@b.co|1700000000000|dev|0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef";

    fn carrier(width: u32, height: u32) -> DynamicImage {
        let img = RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x * 7) as u8, (y * 3) as u8, ((x + y) * 5) as u8])
        });
        DynamicImage::ImageRgb8(img)
    }

    fn png_bytes(image: &DynamicImage) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        image.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_required_bits_counts_terminator() {
        assert_eq!(required_bits(0), 8);
        assert_eq!(required_bits(10), 88);
    }

    #[test]
    fn test_embed_extract_in_memory() {
        let marked = embed_into_image(carrier(64, 64), SIGNED).unwrap();
        let recovered = extract_from_image(&marked);
        assert_eq!(recovered.as_deref(), Some(SIGNED));
    }

    #[test]
    fn test_embed_extract_png_bytes() {
        let input = png_bytes(&carrier(64, 64));
        let output = embed(&input, SIGNED).unwrap();
        assert_eq!(image::guess_format(&output).unwrap(), ImageFormat::Png);
        assert_eq!(extract(&output).unwrap().as_deref(), Some(SIGNED));
    }

    #[test]
    fn test_only_blue_lsb_changes() {
        let original = carrier(64, 64);
        let marked = embed_into_image(original.clone(), SIGNED).unwrap();
        let original = original.to_rgba8();
        let marked = marked.to_rgba8();

        for (a, b) in original.pixels().zip(marked.pixels()) {
            assert_eq!(a[0], b[0]);
            assert_eq!(a[1], b[1]);
            assert_eq!(a[3], b[3]);
            assert_eq!(a[2] & 0xFE, b[2] & 0xFE);
        }
    }

    #[test]
    fn test_embed_keeps_color_type_of_8bit_buffers() {
        let marked = embed_into_image(carrier(64, 64), SIGNED).unwrap();
        assert!(marked.as_rgb8().is_some());
        assert_eq!(extract_from_image(&marked).as_deref(), Some(SIGNED));

        let rgba = RgbaImage::from_pixel(64, 64, Rgba([10, 20, 31, 128]));
        let marked = embed_into_image(DynamicImage::ImageRgba8(rgba), SIGNED).unwrap();
        let pixels = marked.as_rgba8().unwrap();
        assert!(pixels.pixels().all(|p| p[3] == 128));
        assert_eq!(extract_from_image(&marked).as_deref(), Some(SIGNED));
    }

    #[test]
    fn test_grayscale_carrier_is_promoted_to_rgba() {
        let gray = GrayImage::from_pixel(64, 64, Luma([200]));
        let marked = embed_into_image(DynamicImage::ImageLuma8(gray), SIGNED).unwrap();
        assert!(marked.as_rgba8().is_some());

        let output = encode_png(marked).unwrap();
        assert_eq!(extract(&output).unwrap().as_deref(), Some(SIGNED));
    }

    #[test]
    fn test_extract_reads_non_rgba_color_types() {
        let rgb = embed_into_image(carrier(64, 64), SIGNED).unwrap();
        let as_rgb16 = DynamicImage::ImageRgb16(rgb.to_rgb16());
        assert_eq!(extract_from_image(&as_rgb16).as_deref(), Some(SIGNED));
    }

    #[test]
    fn test_capacity_exceeded() {
        let wrapped_len = wrap(SIGNED).len();
        // One pixel short of the required bit count
        let needed = required_bits(wrapped_len);
        let width = (needed - 1) as u32;
        let err = embed_into_image(carrier(width, 1), SIGNED).unwrap_err();
        match err {
            TracemarkError::CapacityExceeded {
                required_bits,
                available_bits,
            } => {
                assert_eq!(required_bits, needed);
                assert_eq!(available_bits, needed - 1);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        // Exactly enough pixels succeeds
        assert!(embed_into_image(carrier(needed as u32, 1), SIGNED).is_ok());
    }

    #[test]
    fn test_rejects_oversized_dimensions() {
        assert!(check_dimensions(MAX_IMAGE_DIMENSION, MAX_IMAGE_DIMENSION).is_ok());
        assert!(matches!(
            check_dimensions(MAX_IMAGE_DIMENSION + 1, 1),
            Err(TracemarkError::ImageTooLarge { .. })
        ));
    }

    #[test]
    fn test_unmarked_image_yields_none() {
        let black = DynamicImage::ImageRgb8(RgbImage::new(32, 32));
        assert_eq!(extract_from_image(&black), None);
        assert_eq!(extract_from_image(&carrier(32, 32)), None);
    }

    #[test]
    fn test_rejects_garbage_bytes() {
        assert!(matches!(
            extract(b"not an image"),
            Err(TracemarkError::ImageCodec(_)) | Err(TracemarkError::Io(_))
        ));
    }
}
