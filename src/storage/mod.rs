//! Ephemeral on-disk storage for uploads and results.
//!
//! # Layout
//!
//! ```text
//! <upload_dir>/{ts}_{token}_{sanitized-original-name}
//! <output_dir>/{ts}_{token}_{no_bg|custom_bg|blur_bg}.png
//! ```
//!
//! Files are only ever written once per request and read back by the same
//! request. Nothing is shared between requests; an optional retention sweep
//! deletes files after a configurable age.

mod naming;
mod store;

pub use naming::{secure_filename, ArtifactKind, RequestStamp, TIMESTAMP_FORMAT, TOKEN_LEN};
pub use store::ArtifactStore;
