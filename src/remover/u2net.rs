//! U²-Net salient object segmentation on `tract-onnx`.
//!
//! The model sees a square RGB tensor (`[1, 3, S, S]`, ImageNet-normalized)
//! and produces a saliency map whose first output is `[1, 1, S, S]`. The map
//! is min-max normalized, resized back to the source resolution and used as
//! the cut-out mask.

use std::path::Path;
use std::time::Instant;

use bytes::Bytes;
use image::imageops::{self, FilterType};
use image::{GrayImage, Luma, RgbaImage};
use tracing::{debug, info};
use tract_onnx::prelude::*;

use super::BackgroundRemover;
use crate::codec::{decode_rgba, encode_png};
use crate::error::RemovalError;

const MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const STD: [f32; 3] = [0.229, 0.224, 0.225];

type U2NetPlan = RunnableModel<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Background remover backed by a U²-Net ONNX model.
pub struct U2NetRemover {
    plan: U2NetPlan,
    input_size: u32,
}

impl std::fmt::Debug for U2NetRemover {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("U2NetRemover")
            .field("input_size", &self.input_size)
            .finish_non_exhaustive()
    }
}

impl U2NetRemover {
    /// Load and optimize the model at `path` for `input_size` x `input_size`
    /// inputs.
    pub fn load(path: impl AsRef<Path>, input_size: u32) -> Result<Self, RemovalError> {
        let path = path.as_ref();
        let started = Instant::now();
        let edge = input_size as usize;

        let plan = tract_onnx::onnx()
            .model_for_path(path)
            .map_err(|e| {
                RemovalError::Model(format!("Failed to load {}: {e}", path.display()))
            })?
            .with_input_fact(0, f32::fact([1, 3, edge, edge]).into())
            .map_err(|e| RemovalError::Model(format!("Failed to set input shape: {e}")))?
            .into_optimized()
            .map_err(|e| RemovalError::Model(format!("Failed to optimize model: {e}")))?
            .into_runnable()
            .map_err(|e| RemovalError::Model(format!("Failed to create runnable model: {e}")))?;

        info!(
            model = %path.display(),
            input_size,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Segmentation model loaded"
        );

        Ok(Self { plan, input_size })
    }

    fn predict_mask(&self, img: &RgbaImage) -> Result<GrayImage, RemovalError> {
        let outputs = self
            .plan
            .run(tvec!(to_tensor(img, self.input_size).into()))
            .map_err(|e| RemovalError::Inference(e.to_string()))?;

        let first = outputs
            .first()
            .ok_or_else(|| RemovalError::Inference("model produced no outputs".to_string()))?;
        let view = first
            .to_array_view::<f32>()
            .map_err(|e| RemovalError::Inference(e.to_string()))?;

        let shape = view.shape();
        if shape.len() < 2 {
            return Err(RemovalError::Inference(format!(
                "expected a 2D saliency map, got shape {shape:?}"
            )));
        }
        let map_h = shape[shape.len() - 2];
        let map_w = shape[shape.len() - 1];
        let values: Vec<f32> = view.iter().take(map_h * map_w).copied().collect();

        let mask = saliency_to_mask(&values, map_w, map_h);
        Ok(imageops::resize(
            &mask,
            img.width(),
            img.height(),
            FilterType::Lanczos3,
        ))
    }
}

impl BackgroundRemover for U2NetRemover {
    fn remove_background(&self, input: &[u8]) -> Result<Bytes, RemovalError> {
        let started = Instant::now();
        let img = decode_rgba(input).map_err(RemovalError::decode)?;
        let mask = self.predict_mask(&img)?;
        let cutout = cut_out(&img, &mask);

        debug!(
            width = img.width(),
            height = img.height(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "U2Net inference completed"
        );

        encode_png(&cutout).map_err(RemovalError::encode)
    }

    fn name(&self) -> &'static str {
        "u2net"
    }
}

/// Resize to `edge` x `edge` and build the `[1, 3, edge, edge]` input.
///
/// Channels are scaled by the brightest RGB value in the resized image, then
/// ImageNet-normalized. Alpha is ignored.
fn to_tensor(img: &RgbaImage, edge: u32) -> Tensor {
    let resized = imageops::resize(img, edge, edge, FilterType::Lanczos3);

    let max = resized
        .pixels()
        .flat_map(|p| p.0[..3].iter().copied())
        .max()
        .unwrap_or(0)
        .max(1) as f32;

    let edge = edge as usize;
    tract_ndarray::Array4::from_shape_fn((1, 3, edge, edge), |(_, c, y, x)| {
        let value = f32::from(resized.get_pixel(x as u32, y as u32)[c]) / max;
        (value - MEAN[c]) / STD[c]
    })
    .into()
}

/// Min-max normalize a row-major saliency map into a `width` x `height` mask.
///
/// A flat map has no range and becomes all zeros.
fn saliency_to_mask(values: &[f32], width: usize, height: usize) -> GrayImage {
    let (lo, hi) = values
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(*v), hi.max(*v))
        });
    let range = if hi > lo { hi - lo } else { 1.0 };

    GrayImage::from_fn(width as u32, height as u32, |x, y| {
        let v = values[y as usize * width + x as usize];
        Luma([(((v - lo) / range) * 255.0).round().clamp(0.0, 255.0) as u8])
    })
}

/// Blend `img` over a fully transparent canvas using `mask` as the weight.
fn cut_out(img: &RgbaImage, mask: &GrayImage) -> RgbaImage {
    RgbaImage::from_fn(img.width(), img.height(), |x, y| {
        let m = u32::from(mask.get_pixel(x, y)[0]);
        let mut px = *img.get_pixel(x, y);
        for channel in px.0.iter_mut() {
            *channel = ((u32::from(*channel) * m + 127) / 255) as u8;
        }
        px
    })
}
