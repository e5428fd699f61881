//! Processing layer: compositing and the per-endpoint pipelines.
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │              HTTP Handlers              │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │             ProcessService              │
//! │  ┌──────────────┐  ┌─────────────────┐  │
//! │  │ArtifactStore │  │   Compositor    │  │
//! │  │ (uploads +   │  │ (replace, blur) │  │
//! │  │  outputs)    │  │                 │  │
//! │  └──────────────┘  └─────────────────┘  │
//! └────────────────────┬────────────────────┘
//!                      │  spawn_blocking
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │        dyn BackgroundRemover            │
//! └─────────────────────────────────────────┘
//! ```

mod compositor;
mod service;

pub use compositor::{Compositor, DEFAULT_BLUR_RADIUS};
pub use service::{OutputArtifact, ProcessService};
