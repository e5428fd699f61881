//! HTTP server layer for Backdrop.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer                              │
//! │        POST /remove-bg    POST /custom-bg    POST /blur-bg      │
//! │                                                                 │
//! │  ┌──────────────────────────┐  ┌─────────────────────────────┐  │
//! │  │        handlers          │  │           routes            │  │
//! │  │ (multipart, validation,  │  │ (body limit, CORS, tracing) │  │
//! │  │  error mapping)          │  │                             │  │
//! │  └──────────────────────────┘  └─────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod handlers;
pub mod routes;

pub use handlers::{
    blur_bg_handler, custom_bg_handler, health_handler, index_handler, remove_bg_handler,
    ApiError, AppState, HealthResponse, UploadForm, BANNER,
};
pub use routes::{create_router, RouterConfig};
