//! A single conversion request.

use std::path::PathBuf;

use mc_core::{JobId, MediaKind};

/// Inputs of one conversion. Immutable once handed to the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionJob {
    /// Caller-supplied identifier, unique among running jobs.
    pub id: JobId,
    /// Declared category of the source; selects the adapter.
    pub media_kind: MediaKind,
    /// File to convert.
    pub source_path: PathBuf,
    /// Target format, used verbatim as the output extension (e.g. "mp4").
    pub output_format: String,
    /// Directory the output is written to; created if missing.
    pub save_directory: PathBuf,
}

impl ConversionJob {
    pub fn new(
        id: impl Into<JobId>,
        media_kind: MediaKind,
        source_path: impl Into<PathBuf>,
        output_format: impl Into<String>,
        save_directory: impl Into<PathBuf>,
    ) -> Self {
        Self {
            id: id.into(),
            media_kind,
            source_path: source_path.into(),
            output_format: output_format.into(),
            save_directory: save_directory.into(),
        }
    }

    /// `<save_directory>/<source file stem>.<output_format>`.
    pub fn output_path(&self) -> PathBuf {
        let stem = self
            .source_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "output".to_string());
        self.save_directory
            .join(format!("{stem}.{}", self.output_format))
    }
}
