//! Corner-sampled chroma key remover.

use bytes::Bytes;
use image::{Rgba, RgbaImage};
use tracing::debug;

use super::BackgroundRemover;
use crate::codec::{decode_rgba, encode_png};
use crate::error::RemovalError;

/// Default RGB distance under which a pixel counts as background.
pub const DEFAULT_CHROMA_TOLERANCE: u8 = 48;

/// Makes every pixel close to the corner color fully transparent.
///
/// The key color is the mean of the four corner pixels, so this works for
/// studio shots on a flat backdrop and for synthetic test images. It is not
/// a substitute for a segmentation model on photographs.
#[derive(Debug, Clone)]
pub struct ChromaKeyRemover {
    tolerance: f32,
}

impl ChromaKeyRemover {
    pub fn new(tolerance: u8) -> Self {
        Self {
            tolerance: f32::from(tolerance),
        }
    }

    /// Key out background pixels in place.
    ///
    /// Returns the number of pixels made transparent.
    pub fn apply(&self, img: &mut RgbaImage) -> usize {
        let (width, height) = img.dimensions();
        if width == 0 || height == 0 {
            return 0;
        }

        let key = corner_mean(img);
        let mut keyed = 0;
        for pixel in img.pixels_mut() {
            if distance(pixel, &key) <= self.tolerance {
                *pixel = Rgba([0, 0, 0, 0]);
                keyed += 1;
            }
        }
        keyed
    }
}

impl Default for ChromaKeyRemover {
    fn default() -> Self {
        Self::new(DEFAULT_CHROMA_TOLERANCE)
    }
}

impl BackgroundRemover for ChromaKeyRemover {
    fn remove_background(&self, input: &[u8]) -> Result<Bytes, RemovalError> {
        let mut img = decode_rgba(input).map_err(RemovalError::decode)?;
        let keyed = self.apply(&mut img);
        debug!(
            width = img.width(),
            height = img.height(),
            keyed,
            "Chroma key applied"
        );
        encode_png(&img).map_err(RemovalError::encode)
    }

    fn name(&self) -> &'static str {
        "chroma"
    }
}

fn corner_mean(img: &RgbaImage) -> [f32; 3] {
    let (w, h) = img.dimensions();
    let corners = [
        img.get_pixel(0, 0),
        img.get_pixel(w - 1, 0),
        img.get_pixel(0, h - 1),
        img.get_pixel(w - 1, h - 1),
    ];

    let mut sum = [0f32; 3];
    for corner in corners {
        for (acc, channel) in sum.iter_mut().zip(corner.0.iter()) {
            *acc += f32::from(*channel);
        }
    }
    sum.map(|s| s / 4.0)
}

fn distance(pixel: &Rgba<u8>, key: &[f32; 3]) -> f32 {
    pixel
        .0
        .iter()
        .zip(key.iter())
        .map(|(c, k)| {
            let d = f32::from(*c) - k;
            d * d
        })
        .sum::<f32>()
        .sqrt()
}
