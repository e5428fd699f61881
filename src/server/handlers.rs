//! HTTP request handlers for the Backdrop API.
//!
//! # Endpoints
//!
//! - `GET /` - Plain-text banner
//! - `GET /health` - Health check endpoint
//! - `POST /remove-bg` - Cut the subject out of `file`
//! - `POST /custom-bg` - Put the subject of `file` on `background`
//! - `POST /blur-bg` - Blur everything but the subject of `file`
//!
//! Image endpoints take `multipart/form-data` and answer with a PNG
//! attachment. Failures are single-line plain text.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{
        multipart::{Field, MultipartError, MultipartRejection},
        Multipart, State,
    },
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tokio_util::io::ReaderStream;
use tracing::{debug, error, info, warn};

use crate::error::{PipelineError, ValidationError};
use crate::process::{OutputArtifact, ProcessService};
use crate::storage::RequestStamp;
use crate::upload::{validate_pair, validate_single, UploadedImage};

/// Body returned by `GET /`.
pub const BANNER: &str = "Backdrop API running. Use /remove-bg, /custom-bg, or /blur-bg endpoints.";

/// Form field carrying the subject image.
pub const FILE_FIELD: &str = "file";

/// Form field carrying the replacement background.
pub const BACKGROUND_FIELD: &str = "background";

// =============================================================================
// Application State
// =============================================================================

/// Shared application state containing the processing service.
#[derive(Clone)]
pub struct AppState {
    /// Pipelines for the three image endpoints
    pub service: Arc<ProcessService>,
}

impl AppState {
    pub fn new(service: ProcessService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}

// =============================================================================
// Request Parsing
// =============================================================================

/// File parts collected from a multipart body.
///
/// Only parts that declare a filename count as files; the first part for a
/// given field name wins and anything else is skipped.
#[derive(Debug, Default)]
pub struct UploadForm {
    pub file: Option<UploadedImage>,
    pub background: Option<UploadedImage>,
}

impl UploadForm {
    /// Drain a multipart stream into an [`UploadForm`].
    pub async fn read(mut multipart: Multipart) -> Result<Self, MultipartError> {
        let mut form = UploadForm::default();

        while let Some(field) = multipart.next_field().await? {
            let Some(filename) = declared_filename(&field) else {
                continue;
            };

            let slot = match field.name() {
                Some(FILE_FIELD) => &mut form.file,
                Some(BACKGROUND_FIELD) => &mut form.background,
                _ => continue,
            };
            if slot.is_some() {
                continue;
            }

            let data = field.bytes().await?;
            debug!(filename = %filename, bytes = data.len(), "Received file part");
            *slot = Some(UploadedImage::new(filename, data));
        }

        Ok(form)
    }

    /// Like [`UploadForm::read`], treating a body that is not multipart at
    /// all as a form without files.
    async fn parse(
        multipart: Result<Multipart, MultipartRejection>,
    ) -> Result<Self, ApiError> {
        match multipart {
            Ok(multipart) => Ok(Self::read(multipart).await?),
            Err(rejection) => {
                debug!(reason = %rejection.body_text(), "Request is not multipart");
                Ok(Self::default())
            }
        }
    }
}

/// Filename a part declares, if it declares one at all.
///
/// An empty `filename=""` counts as declared so that it reaches validation
/// instead of looking like a plain text field.
fn declared_filename(field: &Field<'_>) -> Option<String> {
    if let Some(name) = field.file_name() {
        return Some(name.to_string());
    }
    let disposition = field
        .headers()
        .get(header::CONTENT_DISPOSITION)?
        .to_str()
        .ok()?;
    disposition.contains("filename=").then(String::new)
}

// =============================================================================
// Response Types
// =============================================================================

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service version
    pub version: String,
}

// =============================================================================
// Error Mapping
// =============================================================================

/// Everything a handler can fail with.
#[derive(Debug)]
pub enum ApiError {
    /// Missing or unacceptable upload (400)
    Validation(ValidationError),

    /// Malformed multipart body or body limit hit while streaming
    Multipart(MultipartError),

    /// Storage (500, generic body) or processing (500, message in body)
    Pipeline(PipelineError),
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::Validation(err)
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        ApiError::Multipart(err)
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        ApiError::Pipeline(err)
    }
}

/// Convert ApiError to a plain-text HTTP response.
///
/// 4xx errors are logged at WARN level, 5xx errors at ERROR level.
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_kind, body) = match &self {
            ApiError::Validation(err) => (StatusCode::BAD_REQUEST, "validation", err.to_string()),

            ApiError::Multipart(err) => (err.status(), "multipart", err.body_text()),

            ApiError::Pipeline(PipelineError::Process(err)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                err.error_kind(),
                format!("Internal Server Error: {}", err),
            ),

            ApiError::Pipeline(PipelineError::Storage(err)) => {
                error!(error_kind = "storage", "Storage failure: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "storage",
                    "Internal Server Error".to_string(),
                )
            }
        };

        if status.is_server_error() {
            error!(
                error_kind = error_kind,
                status = status.as_u16(),
                "Server error: {}",
                body
            );
        } else if status.is_client_error() {
            warn!(
                error_kind = error_kind,
                status = status.as_u16(),
                "Client error: {}",
                body
            );
        }

        (status, body).into_response()
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Handle `GET /`.
pub async fn index_handler() -> &'static str {
    BANNER
}

/// Handle health check requests.
///
/// # Endpoint
///
/// `GET /health`
///
/// # Response
///
/// `200 OK` with JSON body:
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0"
/// }
/// ```
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Handle background removal requests.
///
/// # Endpoint
///
/// `POST /remove-bg` with form field `file`
///
/// # Response
///
/// - `200 OK`: PNG attachment named `{timestamp}_no_bg.png`
/// - `400 Bad Request`: `No file uploaded` / `Invalid file type`
/// - `413 Payload Too Large`: body exceeds the configured limit
/// - `500 Internal Server Error`: `Internal Server Error: <reason>`
pub async fn remove_bg_handler(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError> {
    let form = UploadForm::parse(multipart).await?;
    let file = validate_single(form.file.as_ref())?;
    info!(endpoint = "/remove-bg", file = %file.filename, "Processing request");

    let artifact = state
        .service
        .remove_background(file, &RequestStamp::now())
        .await?;

    artifact_response(&state, artifact).await
}

/// Handle background replacement requests.
///
/// # Endpoint
///
/// `POST /custom-bg` with form fields `file` and `background`
///
/// # Response
///
/// - `200 OK`: PNG attachment named `{timestamp}_custom_bg.png`, same size
///   as `file`
/// - `400 Bad Request`: either field missing, empty, or of a disallowed type
/// - `500 Internal Server Error`: `Internal Server Error: <reason>`
pub async fn custom_bg_handler(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError> {
    let form = UploadForm::parse(multipart).await?;
    let (file, background) = validate_pair(form.file.as_ref(), form.background.as_ref())?;
    info!(
        endpoint = "/custom-bg",
        file = %file.filename,
        background = %background.filename,
        "Processing request"
    );

    let artifact = state
        .service
        .replace_background(file, background, &RequestStamp::now())
        .await?;

    artifact_response(&state, artifact).await
}

/// Handle background blur requests.
///
/// # Endpoint
///
/// `POST /blur-bg` with form field `file`
///
/// # Response
///
/// - `200 OK`: PNG attachment named `{timestamp}_blur_bg.png`
/// - `400 Bad Request`: `No file uploaded` / `Invalid file type`
/// - `500 Internal Server Error`: `Internal Server Error: <reason>`
pub async fn blur_bg_handler(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError> {
    let form = UploadForm::parse(multipart).await?;
    let file = validate_single(form.file.as_ref())?;
    info!(endpoint = "/blur-bg", file = %file.filename, "Processing request");

    let artifact = state
        .service
        .blur_background(file, &RequestStamp::now())
        .await?;

    artifact_response(&state, artifact).await
}

/// Stream a stored artifact back as a PNG attachment.
async fn artifact_response(state: &AppState, artifact: OutputArtifact) -> Result<Response, ApiError> {
    let file = state
        .service
        .store()
        .open(&artifact.path)
        .await
        .map_err(PipelineError::from)?;

    let headers = [
        (header::CONTENT_TYPE, "image/png".to_string()),
        (header::CONTENT_LENGTH, artifact.size.to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", artifact.download_name),
        ),
        (
            header::ACCESS_CONTROL_EXPOSE_HEADERS,
            "Content-Disposition".to_string(),
        ),
    ];

    Ok((
        StatusCode::OK,
        headers,
        Body::from_stream(ReaderStream::new(file)),
    )
        .into_response())
}

// =============================================================================
// Tests
// =============================================================================
