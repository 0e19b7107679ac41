//! The [`Adapter`] trait and the job bookkeeping shared by its implementations.
//!
//! An adapter wraps one category of conversion engine. It keeps its own
//! table of in-flight jobs so that [`Adapter::cancel`] can find any job it
//! is serving without help from the dispatcher.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;

use mc_core::JobId;

use crate::job::ConversionJob;
use crate::progress::ProgressSink;

/// Future returned by [`Adapter::convert`], resolving to the output path.
pub type ConversionFuture = BoxFuture<'static, mc_core::Result<PathBuf>>;

/// A conversion backend.
pub trait Adapter: Send + Sync {
    /// A short, human-readable name for logs (e.g. "transcode").
    fn name(&self) -> &'static str;

    /// Start converting `job`.
    ///
    /// The job is registered with the adapter before this returns, so a
    /// [`cancel`](Adapter::cancel) issued at any point after the call finds
    /// it. The returned future settles exactly once: with the output path,
    /// with the engine's error, or with [`mc_core::Error::Cancelled`] if the
    /// job was cancelled through this adapter.
    fn convert(&self, job: ConversionJob, progress: ProgressSink) -> ConversionFuture;

    /// Cancel the job registered under `id`.
    ///
    /// Returns `false` if no such job is in flight, which makes repeated
    /// cancels and cancels after completion harmless.
    fn cancel(&self, id: &JobId) -> bool;
}

// ---------------------------------------------------------------------------
// JobTable
// ---------------------------------------------------------------------------

/// Registration of one in-flight job inside an adapter.
///
/// Dropping the guard removes the registration, unless it was already
/// cancelled or replaced by a newer job with the same id.
#[derive(Debug)]
pub(crate) struct JobGuard {
    jobs: Arc<DashMap<JobId, JobEntry>>,
    id: JobId,
    ticket: u64,
    pub(crate) token: CancellationToken,
}

impl Drop for JobGuard {
    fn drop(&mut self) {
        let ticket = self.ticket;
        self.jobs.remove_if(&self.id, |_, entry| entry.ticket == ticket);
    }
}

#[derive(Debug, Clone)]
struct JobEntry {
    ticket: u64,
    token: CancellationToken,
}

/// Instance-owned map of in-flight jobs to their cancellation tokens.
#[derive(Debug, Clone, Default)]
pub(crate) struct JobTable {
    jobs: Arc<DashMap<JobId, JobEntry>>,
    next_ticket: Arc<AtomicU64>,
}

impl JobTable {
    pub(crate) fn register(&self, id: &JobId) -> JobGuard {
        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();
        let entry = JobEntry {
            ticket,
            token: token.clone(),
        };
        if self.jobs.insert(id.clone(), entry).is_some() {
            tracing::warn!(job_id = %id, "Job id registered twice; the earlier job can no longer be cancelled");
        }
        JobGuard {
            jobs: self.jobs.clone(),
            id: id.clone(),
            ticket,
            token,
        }
    }

    /// Remove the registration for `id` and fire its token.
    pub(crate) fn cancel(&self, id: &JobId) -> bool {
        match self.jobs.remove(id) {
            Some((_, entry)) => {
                entry.token.cancel();
                true
            }
            None => false,
        }
    }

    pub(crate) fn contains(&self, id: &JobId) -> bool {
        self.jobs.contains_key(id)
    }

    pub(crate) fn len(&self) -> usize {
        self.jobs.len()
    }
}

/// Create `dir` and its parents if they do not exist.
pub(crate) async fn ensure_directory(dir: &Path) -> mc_core::Result<()> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|source| mc_core::Error::DirectoryCreation {
            path: dir.to_path_buf(),
            source,
        })
}
