//! Background removal backends.
//!
//! The rest of the service only sees the [`BackgroundRemover`] trait: encoded
//! image bytes in, PNG bytes with an alpha channel out. Implementations are
//! synchronous and may be slow; callers are expected to run them off the
//! async executor.
//!
//! # Backends
//!
//! - [`U2NetRemover`]: U²-Net style salient object segmentation through
//!   `tract-onnx` (requires the `tract` feature and a model file)
//! - [`ChromaKeyRemover`]: keys out the color found in the image corners,
//!   useful for development and tests where no model is available

mod chroma;
#[cfg(feature = "tract")]
mod u2net;

use bytes::Bytes;

use crate::error::RemovalError;

pub use chroma::{ChromaKeyRemover, DEFAULT_CHROMA_TOLERANCE};
#[cfg(feature = "tract")]
pub use u2net::U2NetRemover;

/// Removes the background from an encoded image.
pub trait BackgroundRemover: Send + Sync + 'static {
    /// Return a PNG with the same pixel dimensions as `input`, background
    /// pixels made transparent.
    fn remove_background(&self, input: &[u8]) -> Result<Bytes, RemovalError>;

    /// Backend name for logs.
    fn name(&self) -> &'static str;
}
