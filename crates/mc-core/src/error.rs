//! Unified error type for mediaconv.
//!
//! All crates funnel their failures into [`Error`]. The transport derives a
//! stable wire tag from each variant via [`Error::kind`], and uses
//! [`Error::is_cancelled`] to tell a user cancellation apart from a genuine
//! failure.

use std::path::PathBuf;

use crate::ids::JobId;
use crate::media::MediaKind;

/// Unified error type covering all failure modes in mediaconv.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The caller declared a media kind outside the known set.
    #[error("Unsupported type: {0}")]
    UnsupportedMediaKind(String),

    /// The selected backend cannot produce the requested output format.
    #[error("Unsupported {kind} output format: {format}")]
    UnsupportedFormat {
        /// Media kind of the job.
        kind: MediaKind,
        /// The requested output format.
        format: String,
    },

    /// An external tool (ffmpeg, ffprobe) could not be started or failed.
    #[error("Tool error [{tool}]: {message}")]
    Tool {
        /// Name of the tool that failed.
        tool: String,
        /// Human-readable error description.
        message: String,
    },

    /// Media probing failed.
    #[error("Probe error: {0}")]
    Probe(String),

    /// The save directory could not be created.
    #[error("Failed to create directory {}: {source}", path.display())]
    DirectoryCreation {
        /// Directory that could not be created.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The conversion was terminated by an explicit cancel.
    #[error("Conversion cancelled: {id}")]
    Cancelled {
        /// The job that was cancelled.
        id: JobId,
    },

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Input data failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Stable, machine-readable tag for this error, used on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::UnsupportedMediaKind(_) => "unsupported_media_kind",
            Error::UnsupportedFormat { .. } => "unsupported_format",
            Error::Tool { .. } => "tool",
            Error::Probe(_) => "probe",
            Error::DirectoryCreation { .. } => "directory_creation",
            Error::Cancelled { .. } => "cancelled",
            Error::Io { .. } => "io",
            Error::Validation(_) => "validation",
            Error::Internal(_) => "internal",
        }
    }

    /// Whether this error stems from an explicit cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled { .. })
    }

    /// Convenience constructor for [`Error::Tool`].
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Tool {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Convenience constructor for [`Error::Cancelled`].
    pub fn cancelled(id: &JobId) -> Self {
        Error::Cancelled { id: id.clone() }
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
