//! Image compositing for the custom and blurred background endpoints.
//!
//! # Modes
//!
//! - **Replace**: the background is stretched to the foreground's exact size
//!   (aspect ratio is not preserved) and the foreground is alpha-composited
//!   over it.
//! - **Blur**: the untouched original is Gaussian-blurred and the cut-out's
//!   alpha decides per pixel between the sharp cut-out and the blurred
//!   original.
//!
//! All results are RGBA and leave here as PNG.

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};

use crate::error::ProcessError;

/// Default Gaussian blur radius (sigma, in pixels).
pub const DEFAULT_BLUR_RADIUS: f32 = 15.0;

/// Combines cut-outs with backgrounds.
#[derive(Debug, Clone)]
pub struct Compositor {
    blur_radius: f32,
}

impl Compositor {
    pub fn new(blur_radius: f32) -> Self {
        Self { blur_radius }
    }

    /// Composite `foreground` over `background` resized to the foreground's
    /// dimensions.
    pub fn replace_background(&self, foreground: &RgbaImage, background: &RgbaImage) -> RgbaImage {
        let (width, height) = foreground.dimensions();
        let resized;
        let background = if background.dimensions() == (width, height) {
            background
        } else {
            resized = imageops::resize(background, width, height, FilterType::CatmullRom);
            &resized
        };

        RgbaImage::from_fn(width, height, |x, y| {
            alpha_over(foreground.get_pixel(x, y), background.get_pixel(x, y))
        })
    }

    /// Show `cutout` where its alpha is opaque and a blurred copy of
    /// `original` where it is transparent, blending in between.
    ///
    /// Both images must have the same dimensions.
    pub fn blur_background(
        &self,
        original: &RgbaImage,
        cutout: &RgbaImage,
    ) -> Result<RgbaImage, ProcessError> {
        if original.dimensions() != cutout.dimensions() {
            return Err(ProcessError::DimensionMismatch {
                left: original.dimensions(),
                right: cutout.dimensions(),
            });
        }

        let blurred = self.blur(original);
        Ok(RgbaImage::from_fn(
            original.width(),
            original.height(),
            |x, y| {
                let fg = cutout.get_pixel(x, y);
                masked_select(fg, blurred.get_pixel(x, y), fg[3])
            },
        ))
    }

    /// Gaussian blur with the configured radius. A zero radius is a copy.
    pub fn blur(&self, img: &RgbaImage) -> RgbaImage {
        if self.blur_radius <= 0.0 {
            img.clone()
        } else {
            imageops::blur(img, self.blur_radius)
        }
    }
}

impl Default for Compositor {
    fn default() -> Self {
        Self::new(DEFAULT_BLUR_RADIUS)
    }
}

/// Porter-Duff "over" in straight (non-premultiplied) alpha.
fn alpha_over(fg: &Rgba<u8>, bg: &Rgba<u8>) -> Rgba<u8> {
    let fa = f32::from(fg[3]) / 255.0;
    let ba = f32::from(bg[3]) / 255.0;
    let out_a = fa + ba * (1.0 - fa);
    if out_a <= 0.0 {
        return Rgba([0, 0, 0, 0]);
    }

    let mut out = [0u8; 4];
    for c in 0..3 {
        let value = (f32::from(fg[c]) * fa + f32::from(bg[c]) * ba * (1.0 - fa)) / out_a;
        out[c] = value.round().clamp(0.0, 255.0) as u8;
    }
    out[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
    Rgba(out)
}

/// Per-channel `fg * m + bg * (1 - m)` with `m` in 0..=255.
fn masked_select(fg: &Rgba<u8>, bg: &Rgba<u8>, mask: u8) -> Rgba<u8> {
    let m = u32::from(mask);
    let mut out = [0u8; 4];
    for (c, slot) in out.iter_mut().enumerate() {
        *slot = ((u32::from(fg[c]) * m + u32::from(bg[c]) * (255 - m) + 127) / 255) as u8;
    }
    Rgba(out)
}

// =============================================================================
// Tests
// =============================================================================
