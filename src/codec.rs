//! Image decoding and PNG encoding shared by the removers and the compositor.
//!
//! Errors are returned as [`image::ImageError`]; callers map them into their
//! own error type so the failing stage stays visible.

use std::io::Cursor;

use bytes::Bytes;
use image::{ImageFormat, ImageResult, RgbaImage};

/// Decode any supported format (PNG, JPEG, WebP) to RGBA.
pub fn decode_rgba(data: &[u8]) -> ImageResult<RgbaImage> {
    image::load_from_memory(data).map(|img| img.to_rgba8())
}

/// Encode RGBA pixels as PNG.
pub fn encode_png(img: &RgbaImage) -> ImageResult<Bytes> {
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png)?;
    Ok(Bytes::from(out.into_inner()))
}
