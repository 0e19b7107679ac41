//! The [`TranscodeEngine`] trait: the seam between the transcode adapter and
//! the external process that does the work.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::progress::EngineProgress;

/// Input for one transcode run.
#[derive(Debug, Clone)]
pub struct TranscodeRequest {
    /// Source media file.
    pub source: PathBuf,
    /// Destination file; its extension selects the output format.
    pub output: PathBuf,
    /// Replace `output` if it already exists.
    pub overwrite: bool,
}

/// A process-based media transcoder.
///
/// Implementations must honour `cancel` promptly: once it fires, the
/// underlying process is terminated and `transcode` returns an error.
#[async_trait]
pub trait TranscodeEngine: Send + Sync {
    /// A short name for logs and error messages (e.g. "ffmpeg").
    fn name(&self) -> &'static str;

    /// Total duration of `source` in seconds, if it can be determined.
    async fn probe_duration(&self, source: &Path) -> mc_core::Result<Option<f64>>;

    /// Run the conversion, calling `on_progress` for every progress report.
    async fn transcode(
        &self,
        request: &TranscodeRequest,
        on_progress: &(dyn Fn(EngineProgress) + Send + Sync),
        cancel: &CancellationToken,
    ) -> mc_core::Result<()>;
}
