//! Decoding of `CF_DIB` clipboard payloads: a bitmap header followed by
//! optional masks or colour table and the pixel rows, without the file header.

use std::io::Cursor;

use image::codecs::bmp::BmpDecoder;
use image::{DynamicImage, RgbaImage};

use crate::clipboard::ClipboardError;

/// Decodes a DIB into RGBA.
pub fn decode_dib(data: &[u8]) -> Result<RgbaImage, ClipboardError> {
    let decoder = BmpDecoder::new_without_file_header(Cursor::new(data))
        .map_err(|e| ClipboardError::FormatUnknown(e.to_string()))?;
    let mut image = DynamicImage::from_decoder(decoder)
        .map_err(|e| ClipboardError::FormatUnknown(e.to_string()))?
        .to_rgba8();

    // Producers with an alpha mask often leave the channel zeroed.
    if image.pixels().all(|p| p[3] == 0) {
        for pixel in image.pixels_mut() {
            pixel[3] = 255;
        }
    }

    Ok(image)
}
