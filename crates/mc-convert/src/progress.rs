//! Progress reporting from adapters back to the caller.

use std::sync::Arc;

use mc_core::JobId;

/// Destination for per-job progress percentages.
///
/// Wraps a callback receiving the job id and a percentage. Values are not
/// clamped; 100 is the canonical completion signal. Cloning is cheap.
#[derive(Clone)]
pub struct ProgressSink {
    callback: Arc<dyn Fn(&JobId, f64) + Send + Sync>,
}

impl ProgressSink {
    /// Create a new sink from the given callback.
    pub fn new(callback: impl Fn(&JobId, f64) + Send + Sync + 'static) -> Self {
        Self {
            callback: Arc::new(callback),
        }
    }

    /// Create a sink that discards all progress reports.
    pub fn noop() -> Self {
        Self::new(|_, _| {})
    }

    /// Report progress for `id`.
    pub fn send(&self, id: &JobId, progress: f64) {
        tracing::trace!(job_id = %id, progress, "Progress");
        (self.callback)(id, progress);
    }
}

impl std::fmt::Debug for ProgressSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressSink").finish_non_exhaustive()
    }
}
