//! # Backdrop
//!
//! An HTTP service that removes, replaces, or blurs the background of
//! uploaded photos.
//!
//! Clients post `multipart/form-data` to one of three endpoints and receive a
//! PNG attachment back. Uploads and results are kept on local disk under
//! collision-free names and pruned after a configurable retention period.
//!
//! ## Features
//!
//! - **Background removal**: pluggable [`remover::BackgroundRemover`]
//!   backends, including U²-Net segmentation through `tract-onnx`
//! - **Compositing**: alpha-over onto a custom background, or onto a blurred
//!   copy of the original image
//! - **Bounded uploads**: extension checks and a request body limit enforced
//!   before any processing happens
//!
//! ## Architecture
//!
//! - [`upload`] - Upload acceptance rules
//! - [`codec`] - Image decoding and PNG encoding
//! - [`storage`] - File naming and the on-disk artifact store
//! - [`remover`] - Background removal backends
//! - [`process`] - Compositing and the per-endpoint pipelines
//! - [`server`] - Axum-based HTTP server and routes
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use backdrop::{create_router, ArtifactStore, ChromaKeyRemover, ProcessService, RouterConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = ArtifactStore::new("static/uploads", "static/output");
//!     store.ensure_dirs().await?;
//!
//!     let service = ProcessService::new(store, Arc::new(ChromaKeyRemover::default()));
//!     let router = create_router(service, RouterConfig::new());
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:10000").await?;
//!     axum::serve(listener, router).await?;
//!     Ok(())
//! }
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod process;
pub mod remover;
pub mod server;
pub mod storage;
pub mod upload;

// Re-export commonly used types
pub use config::{Config, RemovalBackend};
pub use error::{PipelineError, ProcessError, RemovalError, StorageError, ValidationError};
pub use process::{Compositor, OutputArtifact, ProcessService, DEFAULT_BLUR_RADIUS};
#[cfg(feature = "tract")]
pub use remover::U2NetRemover;
pub use remover::{BackgroundRemover, ChromaKeyRemover, DEFAULT_CHROMA_TOLERANCE};
pub use server::{create_router, ApiError, AppState, HealthResponse, RouterConfig};
pub use storage::{secure_filename, ArtifactKind, ArtifactStore, RequestStamp};
pub use upload::{
    allowed_file, validate_pair, validate_single, UploadedImage, ALLOWED_EXTENSIONS,
    DEFAULT_MAX_BODY_BYTES,
};
