//! Per-endpoint processing pipelines.
//!
//! Each pipeline follows the same shape:
//!
//! 1. persist the validated upload(s) under request-stamped names
//! 2. read the persisted bytes back
//! 3. run the remover (and compositor) on tokio's blocking pool
//! 4. persist the PNG result and hand back an [`OutputArtifact`]
//!
//! Storage failures and processing failures are reported separately so the
//! HTTP layer can answer them differently.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use tracing::{debug, info};

use crate::codec::{decode_rgba, encode_png};
use crate::error::{PipelineError, ProcessError};
use crate::remover::BackgroundRemover;
use crate::storage::{ArtifactKind, ArtifactStore, RequestStamp};
use crate::upload::UploadedImage;

use super::compositor::Compositor;

/// A finished result persisted in the output directory.
#[derive(Debug, Clone)]
pub struct OutputArtifact {
    /// Which endpoint produced it
    pub kind: ArtifactKind,

    /// Location in the output directory
    pub path: PathBuf,

    /// Filename offered to the client in `Content-Disposition`
    pub download_name: String,

    /// Size of the PNG in bytes
    pub size: usize,
}

/// Runs the three processing pipelines against a store and a remover.
pub struct ProcessService {
    store: ArtifactStore,
    remover: Arc<dyn BackgroundRemover>,
    compositor: Compositor,
    timeout: Option<Duration>,
}

impl ProcessService {
    /// Create a service with the default compositor and no time limit.
    pub fn new(store: ArtifactStore, remover: Arc<dyn BackgroundRemover>) -> Self {
        Self {
            store,
            remover,
            compositor: Compositor::default(),
            timeout: None,
        }
    }

    /// Use a specific compositor (e.g. a different blur radius).
    pub fn with_compositor(mut self, compositor: Compositor) -> Self {
        self.compositor = compositor;
        self
    }

    /// Abort processing that runs longer than `timeout`.
    ///
    /// The blocking worker itself is not interrupted; its result is dropped.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Name of the configured background remover.
    pub fn remover_name(&self) -> &'static str {
        self.remover.name()
    }

    /// `/remove-bg`: cut the subject out of `file`.
    pub async fn remove_background(
        &self,
        file: &UploadedImage,
        stamp: &RequestStamp,
    ) -> Result<OutputArtifact, PipelineError> {
        let started = Instant::now();
        let input_path = self
            .store
            .save_upload(&stamp.upload_name(&file.filename), &file.data)
            .await?;
        let input = self.store.read(&input_path).await?;

        let remover = Arc::clone(&self.remover);
        let output = self
            .run_blocking(move || remover.remove_background(&input).map_err(ProcessError::from))
            .await?;

        self.finish(ArtifactKind::NoBackground, stamp, output, started)
            .await
    }

    /// `/custom-bg`: cut the subject out of `file` and place it on
    /// `background`, stretched to the subject image's size.
    pub async fn replace_background(
        &self,
        file: &UploadedImage,
        background: &UploadedImage,
        stamp: &RequestStamp,
    ) -> Result<OutputArtifact, PipelineError> {
        let started = Instant::now();
        let fg_name = stamp.upload_name(&file.filename);
        let mut bg_name = stamp.upload_name(&background.filename);
        if bg_name == fg_name {
            bg_name = stamp.upload_name(&format!("bg_{}", background.filename));
        }

        let fg_path = self.store.save_upload(&fg_name, &file.data).await?;
        let bg_path = self.store.save_upload(&bg_name, &background.data).await?;
        let fg_bytes = self.store.read(&fg_path).await?;
        let bg_bytes = self.store.read(&bg_path).await?;

        let remover = Arc::clone(&self.remover);
        let compositor = self.compositor.clone();
        let output = self
            .run_blocking(move || {
                // Normalize the foreground to RGBA PNG before segmentation
                let fg = decode_rgba(&fg_bytes).map_err(ProcessError::decode("foreground"))?;
                let normalized = encode_png(&fg).map_err(ProcessError::encode)?;

                let cutout = remover.remove_background(&normalized)?;
                let cutout = decode_rgba(&cutout).map_err(ProcessError::decode("cut-out"))?;
                let background =
                    decode_rgba(&bg_bytes).map_err(ProcessError::decode("background"))?;

                encode_png(&compositor.replace_background(&cutout, &background))
                    .map_err(ProcessError::encode)
            })
            .await?;

        self.finish(ArtifactKind::CustomBackground, stamp, output, started)
            .await
    }

    /// `/blur-bg`: keep the subject sharp over a blurred copy of the original.
    pub async fn blur_background(
        &self,
        file: &UploadedImage,
        stamp: &RequestStamp,
    ) -> Result<OutputArtifact, PipelineError> {
        let started = Instant::now();
        let input_path = self
            .store
            .save_upload(&stamp.upload_name(&file.filename), &file.data)
            .await?;
        let input = self.store.read(&input_path).await?;

        let remover = Arc::clone(&self.remover);
        let compositor = self.compositor.clone();
        let output = self
            .run_blocking(move || {
                let original = decode_rgba(&input).map_err(ProcessError::decode("image"))?;
                let cutout = remover.remove_background(&input)?;
                let cutout = decode_rgba(&cutout).map_err(ProcessError::decode("cut-out"))?;

                encode_png(&compositor.blur_background(&original, &cutout)?)
                    .map_err(ProcessError::encode)
            })
            .await?;

        self.finish(ArtifactKind::BlurredBackground, stamp, output, started)
            .await
    }

    async fn finish(
        &self,
        kind: ArtifactKind,
        stamp: &RequestStamp,
        output: Bytes,
        started: Instant,
    ) -> Result<OutputArtifact, PipelineError> {
        let path = self
            .store
            .save_output(&stamp.output_name(kind), &output)
            .await?;

        info!(
            artifact = kind.suffix(),
            remover = self.remover.name(),
            bytes = output.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Artifact ready"
        );

        Ok(OutputArtifact {
            kind,
            path,
            download_name: stamp.download_name(kind),
            size: output.len(),
        })
    }

    async fn run_blocking<T, F>(&self, work: F) -> Result<T, ProcessError>
    where
        F: FnOnce() -> Result<T, ProcessError> + Send + 'static,
        T: Send + 'static,
    {
        let handle = tokio::task::spawn_blocking(work);

        let joined = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, handle).await {
                Ok(joined) => joined,
                Err(_) => {
                    debug!(timeout_ms = limit.as_millis() as u64, "Processing timed out");
                    return Err(ProcessError::Timeout(limit));
                }
            },
            None => handle.await,
        };

        joined.map_err(|e| ProcessError::WorkerPanicked(e.to_string()))?
    }
}

// =============================================================================
// Tests
// =============================================================================
