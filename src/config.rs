//! Configuration management for Backdrop.
//!
//! Every option can be given on the command line or through the environment.
//! The listening port follows the common `PORT` convention used by hosting
//! platforms; everything else uses the `BACKDROP_` prefix.
//!
//! # Environment Variables
//!
//! - `PORT` - Server port (default: 10000)
//! - `BACKDROP_HOST` - Server bind address (default: 0.0.0.0)
//! - `BACKDROP_UPLOAD_DIR` - Where uploads are written (default: static/uploads)
//! - `BACKDROP_OUTPUT_DIR` - Where results are written (default: static/output)
//! - `BACKDROP_MAX_BODY_BYTES` - Request body ceiling (default: 10 MiB)
//! - `BACKDROP_BLUR_RADIUS` - Gaussian blur radius for /blur-bg (default: 15)
//! - `BACKDROP_BACKEND` - `u2net` or `chroma`
//! - `BACKDROP_MODEL_PATH` - ONNX model file for the u2net backend
//! - `BACKDROP_INFERENCE_TIMEOUT_SECS` - Per-request processing limit (0 = none)
//! - `BACKDROP_RETENTION_SECS` - Delete stored files older than this (0 = never)
//! - `BACKDROP_CORS_ORIGINS` - Comma-separated allowed origins (default: any)

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::process::DEFAULT_BLUR_RADIUS;
use crate::remover::DEFAULT_CHROMA_TOLERANCE;
use crate::upload::DEFAULT_MAX_BODY_BYTES;

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 10000;

/// Default upload directory, relative to the working directory.
pub const DEFAULT_UPLOAD_DIR: &str = "static/uploads";

/// Default output directory, relative to the working directory.
pub const DEFAULT_OUTPUT_DIR: &str = "static/output";

/// Default square input size for the segmentation model.
pub const DEFAULT_INPUT_SIZE: u32 = 320;

/// Default retention for stored files (24 hours).
pub const DEFAULT_RETENTION_SECS: u64 = 86_400;

/// Default interval between retention sweeps (10 minutes).
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 600;

#[cfg(feature = "tract")]
const DEFAULT_BACKEND: RemovalBackend = RemovalBackend::U2net;
#[cfg(not(feature = "tract"))]
const DEFAULT_BACKEND: RemovalBackend = RemovalBackend::Chroma;

/// Which background remover to run.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalBackend {
    /// U²-Net segmentation model (needs --model-path)
    U2net,
    /// Corner color chroma key
    Chroma,
}

// =============================================================================
// CLI Arguments
// =============================================================================

/// Backdrop - remove, replace, or blur image backgrounds over HTTP.
#[derive(Parser, Debug, Clone)]
#[command(name = "backdrop")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "BACKDROP_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "PORT")]
    pub port: u16,

    /// Maximum request body size in bytes. Larger requests are rejected
    /// before any handler runs.
    #[arg(long, default_value_t = DEFAULT_MAX_BODY_BYTES, env = "BACKDROP_MAX_BODY_BYTES")]
    pub max_body_bytes: usize,

    // =========================================================================
    // Storage Configuration
    // =========================================================================
    /// Directory for uploaded input files.
    #[arg(long, default_value = DEFAULT_UPLOAD_DIR, env = "BACKDROP_UPLOAD_DIR")]
    pub upload_dir: PathBuf,

    /// Directory for generated PNG results.
    #[arg(long, default_value = DEFAULT_OUTPUT_DIR, env = "BACKDROP_OUTPUT_DIR")]
    pub output_dir: PathBuf,

    /// Delete stored files older than this many seconds (0 keeps them forever).
    #[arg(long, default_value_t = DEFAULT_RETENTION_SECS, env = "BACKDROP_RETENTION_SECS")]
    pub retention_secs: u64,

    /// Seconds between retention sweeps.
    #[arg(
        long,
        default_value_t = DEFAULT_SWEEP_INTERVAL_SECS,
        env = "BACKDROP_SWEEP_INTERVAL_SECS"
    )]
    pub sweep_interval_secs: u64,

    // =========================================================================
    // Processing Configuration
    // =========================================================================
    /// Background removal backend.
    #[arg(long, value_enum, default_value_t = DEFAULT_BACKEND, env = "BACKDROP_BACKEND")]
    pub backend: RemovalBackend,

    /// Path to the U²-Net ONNX model (u2net backend only).
    #[arg(long, env = "BACKDROP_MODEL_PATH")]
    pub model_path: Option<PathBuf>,

    /// Square input size the model was exported with.
    #[arg(long, default_value_t = DEFAULT_INPUT_SIZE, env = "BACKDROP_MODEL_INPUT_SIZE")]
    pub model_input_size: u32,

    /// RGB distance tolerance for the chroma backend.
    #[arg(
        long,
        default_value_t = DEFAULT_CHROMA_TOLERANCE,
        env = "BACKDROP_CHROMA_TOLERANCE"
    )]
    pub chroma_tolerance: u8,

    /// Gaussian blur radius used by /blur-bg.
    #[arg(long, default_value_t = DEFAULT_BLUR_RADIUS, env = "BACKDROP_BLUR_RADIUS")]
    pub blur_radius: f32,

    /// Give up on processing after this many seconds (0 waits forever).
    #[arg(long, default_value_t = 0, env = "BACKDROP_INFERENCE_TIMEOUT_SECS")]
    pub inference_timeout_secs: u64,

    // =========================================================================
    // CORS Configuration
    // =========================================================================
    /// Allowed CORS origins (comma-separated).
    ///
    /// If not specified, allows any origin.
    #[arg(long, env = "BACKDROP_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl Config {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.upload_dir.as_os_str().is_empty() || self.output_dir.as_os_str().is_empty() {
            return Err("upload_dir and output_dir must not be empty".to_string());
        }

        if self.upload_dir == self.output_dir {
            return Err("upload_dir and output_dir must be different directories".to_string());
        }

        if self.max_body_bytes == 0 {
            return Err("max_body_bytes must be greater than 0".to_string());
        }

        if !self.blur_radius.is_finite() || self.blur_radius < 0.0 {
            return Err("blur_radius must be a non-negative number".to_string());
        }

        if self.backend == RemovalBackend::U2net {
            if cfg!(not(feature = "tract")) {
                return Err(
                    "The u2net backend requires building with the `tract` feature. \
                     Use --backend chroma or rebuild with --features tract"
                        .to_string(),
                );
            }
            if self.model_path.is_none() {
                return Err(
                    "The u2net backend needs a model. Set --model-path or BACKDROP_MODEL_PATH, \
                     or run without a model using --backend chroma"
                        .to_string(),
                );
            }
            if self.model_input_size == 0 {
                return Err("model_input_size must be greater than 0".to_string());
            }
        }

        if self.retention_secs > 0 && self.sweep_interval_secs == 0 {
            return Err(
                "sweep_interval_secs must be greater than 0 when retention is enabled".to_string(),
            );
        }

        Ok(())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Processing time limit, if any.
    pub fn inference_timeout(&self) -> Option<Duration> {
        (self.inference_timeout_secs > 0).then(|| Duration::from_secs(self.inference_timeout_secs))
    }

    /// Maximum age of stored files, if retention is enabled.
    pub fn retention(&self) -> Option<Duration> {
        (self.retention_secs > 0).then(|| Duration::from_secs(self.retention_secs))
    }

    /// Interval between retention sweeps.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

// =============================================================================
// Tests
// =============================================================================
