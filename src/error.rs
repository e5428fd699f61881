use std::path::PathBuf;
use std::time::Duration;

use image::ImageError;
use thiserror::Error;

/// Client-caused upload errors. Detected before anything touches the disk.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The `file` form field is absent
    #[error("No file uploaded")]
    MissingFile,

    /// The `file` field has an empty filename or a disallowed extension
    #[error("Invalid file type")]
    InvalidFile,

    /// Either the `file` or the `background` field is absent
    #[error("Both foreground and background images are required.")]
    MissingPair,

    /// Either of the two files has an empty filename
    #[error("Please select both images.")]
    EmptyPair,

    /// Either of the two files has a disallowed extension
    #[error("Invalid file type. Allowed types: png, jpg, jpeg, webp.")]
    InvalidPair,
}

/// Errors raised inside a background remover
#[derive(Debug, Clone, Error)]
pub enum RemovalError {
    /// The segmentation model could not be loaded or prepared
    #[error("Model error: {0}")]
    Model(String),

    /// Inference ran but failed or produced an unusable tensor
    #[error("Inference failed: {0}")]
    Inference(String),

    /// Input bytes are not a decodable image
    #[error("Failed to decode input image: {0}")]
    Decode(String),

    /// The cut-out could not be encoded as PNG
    #[error("Failed to encode output image: {0}")]
    Encode(String),
}

impl RemovalError {
    pub(crate) fn decode(err: ImageError) -> Self {
        RemovalError::Decode(err.to_string())
    }

    pub(crate) fn encode(err: ImageError) -> Self {
        RemovalError::Encode(err.to_string())
    }
}

/// Errors from the processing stage (remover + compositor).
///
/// Every variant maps to HTTP 500 with the message in the body.
#[derive(Debug, Clone, Error)]
pub enum ProcessError {
    /// The background remover failed
    #[error(transparent)]
    Removal(#[from] RemovalError),

    /// An image could not be decoded
    #[error("Failed to decode {what}: {message}")]
    Decode { what: &'static str, message: String },

    /// The composited image could not be encoded
    #[error("Failed to encode result: {message}")]
    Encode { message: String },

    /// Foreground and mask sizes disagree
    #[error("Image dimensions do not match: {left:?} vs {right:?}")]
    DimensionMismatch { left: (u32, u32), right: (u32, u32) },

    /// Processing exceeded the configured time limit
    #[error("Processing timed out after {0:?}")]
    Timeout(Duration),

    /// The blocking worker panicked or was cancelled
    #[error("Processing worker failed: {0}")]
    WorkerPanicked(String),
}

impl ProcessError {
    /// Error mapper for a failed decode of the image named `what`.
    pub(crate) fn decode(what: &'static str) -> impl FnOnce(ImageError) -> Self {
        move |err| ProcessError::Decode {
            what,
            message: err.to_string(),
        }
    }

    pub(crate) fn encode(err: ImageError) -> Self {
        ProcessError::Encode {
            message: err.to_string(),
        }
    }

    /// Short tag for structured logs.
    pub fn error_kind(&self) -> &'static str {
        match self {
            ProcessError::Removal(RemovalError::Model(_)) => "model_error",
            ProcessError::Removal(RemovalError::Inference(_)) => "inference_error",
            ProcessError::Removal(RemovalError::Decode(_)) | ProcessError::Decode { .. } => {
                "decode_error"
            }
            ProcessError::Removal(RemovalError::Encode(_)) | ProcessError::Encode { .. } => {
                "encode_error"
            }
            ProcessError::DimensionMismatch { .. } => "dimension_mismatch",
            ProcessError::Timeout(_) => "timeout",
            ProcessError::WorkerPanicked(_) => "worker_failed",
        }
    }
}

/// Filesystem errors from the artifact store
#[derive(Debug, Error)]
pub enum StorageError {
    /// Could not create one of the working directories
    #[error("Failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not write or rename a file into place
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not open or read a stored file
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Anything that can go wrong after validation has passed
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Infrastructure failure while persisting or reading files
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Failure inside the remover or compositor
    #[error(transparent)]
    Process(#[from] ProcessError),
}
