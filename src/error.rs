//! Error type shared by every pipeline stage.
//!
//! Library errors pass through transparently so callers see the underlying
//! message unchanged; only failures the crate detects itself get their own
//! wording.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, ForgeError>;

/// Errors that can occur while converting XML to PDF.
#[derive(Error, Debug)]
pub enum ForgeError {
    /// Reading the input or writing an artifact failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The XML reader rejected the input.
    #[error(transparent)]
    Xml(#[from] quick_xml::Error),

    /// The XML was readable but structurally incomplete.
    #[error("malformed XML: {0}")]
    MalformedXml(String),

    /// JSON text could not be decoded.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Template parsing or execution failed.
    #[error(transparent)]
    Template(#[from] tera::Error),

    /// The browser driver reported a failure.
    #[error(transparent)]
    Browser(#[from] chromiumoxide::error::CdpError),

    /// The browser could not be configured for launch.
    #[error("browser configuration error: {0}")]
    BrowserConfig(String),

    /// The page did not load and show its body in time.
    #[error("page did not become ready within {0:?}")]
    Timeout(Duration),

    /// A path could not be expressed as a `file://` URL.
    #[error("not a local file path: {}", .0.display())]
    FileUrl(PathBuf),

    /// Moving a finished artifact into place failed.
    #[error(transparent)]
    Persist(#[from] tempfile::PersistError),
}
