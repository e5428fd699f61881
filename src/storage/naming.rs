//! File naming for uploads and output artifacts.
//!
//! Every request gets a [`RequestStamp`]: a second-resolution local timestamp
//! plus a random token. The timestamp keeps names sortable and readable, the
//! token keeps two requests in the same second from writing the same path.
//! The name offered to the client for download omits the token.

use chrono::{DateTime, Local};
use uuid::Uuid;

/// Timestamp layout used in every generated name (`YYYYMMDDHHMMSS`).
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Length of the random token embedded in on-disk names.
pub const TOKEN_LEN: usize = 8;

/// Fallback used when sanitizing leaves nothing of the original filename.
const EMPTY_FILENAME_FALLBACK: &str = "upload";

/// The output produced by each endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// `/remove-bg`
    NoBackground,
    /// `/custom-bg`
    CustomBackground,
    /// `/blur-bg`
    BlurredBackground,
}

impl ArtifactKind {
    /// Fixed suffix placed after the timestamp.
    pub fn suffix(self) -> &'static str {
        match self {
            ArtifactKind::NoBackground => "no_bg",
            ArtifactKind::CustomBackground => "custom_bg",
            ArtifactKind::BlurredBackground => "blur_bg",
        }
    }
}

/// Per-request naming context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestStamp {
    timestamp: String,
    token: String,
}

impl RequestStamp {
    /// Stamp for a request arriving now.
    pub fn now() -> Self {
        Self::at(Local::now())
    }

    /// Stamp for the given instant with a fresh random token.
    pub fn at(time: DateTime<Local>) -> Self {
        let token = Uuid::new_v4().simple().to_string()[..TOKEN_LEN].to_string();
        Self::from_parts(time.format(TIMESTAMP_FORMAT).to_string(), token)
    }

    /// Build a stamp from explicit parts.
    pub fn from_parts(timestamp: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            timestamp: timestamp.into(),
            token: token.into(),
        }
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// On-disk name for an uploaded file: `{ts}_{token}_{sanitized}`.
    pub fn upload_name(&self, original: &str) -> String {
        format!(
            "{}_{}_{}",
            self.timestamp,
            self.token,
            secure_filename(original)
        )
    }

    /// On-disk name for an output artifact: `{ts}_{token}_{suffix}.png`.
    pub fn output_name(&self, kind: ArtifactKind) -> String {
        format!("{}_{}_{}.png", self.timestamp, self.token, kind.suffix())
    }

    /// Name offered to the client: `{ts}_{suffix}.png`.
    pub fn download_name(&self, kind: ArtifactKind) -> String {
        format!("{}_{}.png", self.timestamp, kind.suffix())
    }
}

/// Reduce a client-supplied filename to a safe single path component.
///
/// Non-ASCII characters are dropped, path separators and whitespace runs
/// become `_`, anything outside `[A-Za-z0-9_.-]` is removed and leading or
/// trailing dots and underscores are stripped. An empty result falls back to
/// `upload`.
pub fn secure_filename(filename: &str) -> String {
    let ascii: String = filename
        .chars()
        .filter(char::is_ascii)
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();

    let joined = ascii.split_whitespace().collect::<Vec<_>>().join("_");

    let cleaned: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect();

    let trimmed = cleaned.trim_matches(|c| c == '.' || c == '_');
    if trimmed.is_empty() {
        EMPTY_FILENAME_FALLBACK.to_string()
    } else {
        trimmed.to_string()
    }
}

// =============================================================================
// Tests
// =============================================================================
