//! Uploaded images and the validation gate in front of every endpoint.
//!
//! Validation only looks at the declared filename. Content is never sniffed
//! here; a file named `cat.png` holding garbage passes and fails later at
//! decode time with a processing error.

use bytes::Bytes;

use crate::error::ValidationError;

/// Extensions accepted for uploads (compared case-insensitively).
pub const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp"];

/// Default request body ceiling (10 MiB).
pub const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// A file part received from a multipart form.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    /// Filename as declared by the client (may be empty)
    pub filename: String,

    /// Raw file contents
    pub data: Bytes,
}

impl UploadedImage {
    pub fn new(filename: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            filename: filename.into(),
            data: data.into(),
        }
    }

    /// Whether the filename is non-empty and carries an allowed extension.
    pub fn is_allowed(&self) -> bool {
        allowed_file(&self.filename)
    }
}

fn extension_of(filename: &str) -> Option<String> {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
}

/// Check a filename against [`ALLOWED_EXTENSIONS`].
pub fn allowed_file(filename: &str) -> bool {
    match extension_of(filename) {
        Some(ext) => ALLOWED_EXTENSIONS.contains(&ext.as_str()),
        None => false,
    }
}

/// Validate the single `file` field used by `/remove-bg` and `/blur-bg`.
pub fn validate_single(file: Option<&UploadedImage>) -> Result<&UploadedImage, ValidationError> {
    let file = file.ok_or(ValidationError::MissingFile)?;
    if file.filename.is_empty() || !file.is_allowed() {
        return Err(ValidationError::InvalidFile);
    }
    Ok(file)
}

/// Validate the `file` + `background` pair used by `/custom-bg`.
///
/// Checks run in order: presence of both, non-empty names, then extensions.
pub fn validate_pair<'a>(
    file: Option<&'a UploadedImage>,
    background: Option<&'a UploadedImage>,
) -> Result<(&'a UploadedImage, &'a UploadedImage), ValidationError> {
    let (Some(file), Some(background)) = (file, background) else {
        return Err(ValidationError::MissingPair);
    };

    if file.filename.is_empty() || background.filename.is_empty() {
        return Err(ValidationError::EmptyPair);
    }

    if !(file.is_allowed() && background.is_allowed()) {
        return Err(ValidationError::InvalidPair);
    }

    Ok((file, background))
}

// =============================================================================
// Tests
// =============================================================================
