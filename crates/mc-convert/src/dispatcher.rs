//! Job registry and routing of conversions to adapters.
//!
//! The [`Dispatcher`] picks the adapter for a job from its media kind,
//! remembers which adapter serves each running job, and routes cancels to
//! it. A job id is present in the registry exactly while its conversion is
//! running.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use mc_av::ToolRegistry;
use mc_core::config::ConversionConfig;
use mc_core::{Backend, JobId, MediaKind};

use crate::adapter::{Adapter, ConversionFuture};
use crate::adapters::{ImageAdapter, TranscodeAdapter, TranscodeOptions};
use crate::job::ConversionJob;
use crate::progress::ProgressSink;

struct Entry {
    ticket: u64,
    adapter: Arc<dyn Adapter>,
}

type Registry = Arc<Mutex<HashMap<JobId, Entry>>>;

/// Routes conversion jobs to adapters and tracks the running ones.
pub struct Dispatcher {
    transcoder: Arc<dyn Adapter>,
    image: Arc<dyn Adapter>,
    registry: Registry,
    next_ticket: AtomicU64,
}

impl Dispatcher {
    /// Create a dispatcher over the given adapters.
    pub fn new(transcoder: Arc<dyn Adapter>, image: Arc<dyn Adapter>) -> Self {
        Self {
            transcoder,
            image,
            registry: Arc::new(Mutex::new(HashMap::new())),
            next_ticket: AtomicU64::new(0),
        }
    }

    /// Create a dispatcher with the ffmpeg transcoder and the image adapter.
    pub fn with_default_adapters(config: &ConversionConfig, tools: Arc<ToolRegistry>) -> Self {
        let transcoder = TranscodeAdapter::ffmpeg(tools, TranscodeOptions::from(config));
        let image = ImageAdapter::from_config(config);
        Self::new(Arc::new(transcoder), Arc::new(image))
    }

    /// The adapter serving `kind`.
    pub fn adapter_for(&self, kind: MediaKind) -> &Arc<dyn Adapter> {
        match kind.backend() {
            Backend::Transcode => &self.transcoder,
            Backend::Image => &self.image,
        }
    }

    /// Register `job` and start it on the adapter selected by its media kind.
    ///
    /// The registry entry exists once this returns, so a [`cancel`] issued
    /// before the returned future is first polled still reaches the adapter.
    /// The future resolves with the output path, or with the adapter's error
    /// unchanged. The entry is removed on every exit path, including when
    /// the future is dropped.
    ///
    /// [`cancel`]: Dispatcher::cancel
    pub fn start(&self, job: ConversionJob, progress: ProgressSink) -> ConversionFuture {
        let adapter = self.adapter_for(job.media_kind).clone();
        let id = job.id.clone();
        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);

        tracing::info!(
            job_id = %id,
            media_kind = %job.media_kind,
            adapter = adapter.name(),
            "Dispatching {} -> {}",
            job.source_path.display(),
            job.output_format
        );

        let conversion = {
            let mut registry = self.registry.lock();
            let previous = registry.insert(
                id.clone(),
                Entry {
                    ticket,
                    adapter: adapter.clone(),
                },
            );
            if previous.is_some() {
                tracing::warn!(job_id = %id, "Job id is already running; replacing its registry entry");
            }
            adapter.convert(job, progress)
        };
        let guard = RegistryGuard {
            registry: self.registry.clone(),
            id,
            ticket,
        };

        Box::pin(async move {
            let result = conversion.await;
            let id = &guard.id;
            match &result {
                Ok(output) => tracing::info!(job_id = %id, "Conversion finished: {}", output.display()),
                Err(e) if e.is_cancelled() => tracing::info!(job_id = %id, "Conversion cancelled"),
                Err(e) => tracing::warn!(job_id = %id, "Conversion failed: {e}"),
            }
            result
        })
    }

    /// Run `job` to completion. See [`Dispatcher::start`].
    pub async fn handle(&self, job: ConversionJob, progress: ProgressSink) -> mc_core::Result<PathBuf> {
        self.start(job, progress).await
    }

    /// Cancel the running job `id`.
    ///
    /// Returns `false` if no such job is running; otherwise removes it from
    /// the registry and returns the adapter's answer.
    pub fn cancel(&self, id: &JobId) -> bool {
        let mut registry = self.registry.lock();
        match registry.remove(id) {
            Some(entry) => {
                tracing::info!(job_id = %id, adapter = entry.adapter.name(), "Cancelling job");
                entry.adapter.cancel(id)
            }
            None => {
                tracing::debug!(job_id = %id, "Cancel for unknown job ignored");
                false
            }
        }
    }

    /// Cancel every running job, returning the ids that were drained.
    pub fn cancel_all(&self) -> Vec<JobId> {
        let mut registry = self.registry.lock();
        if registry.is_empty() {
            return Vec::new();
        }

        let drained: Vec<(JobId, Entry)> = registry.drain().collect();
        tracing::info!(count = drained.len(), "Cancelling all jobs");
        drained
            .into_iter()
            .map(|(id, entry)| {
                entry.adapter.cancel(&id);
                id
            })
            .collect()
    }

    /// Ids of the running jobs, sorted.
    pub fn active_jobs(&self) -> Vec<JobId> {
        let mut ids: Vec<JobId> = self.registry.lock().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn is_active(&self, id: &JobId) -> bool {
        self.registry.lock().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.registry.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.lock().is_empty()
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("transcoder", &self.transcoder.name())
            .field("image", &self.image.name())
            .field("active", &self.len())
            .finish()
    }
}

/// Removes a registry entry when dropped, unless a newer job took the id.
struct RegistryGuard {
    registry: Registry,
    id: JobId,
    ticket: u64,
}

impl Drop for RegistryGuard {
    fn drop(&mut self) {
        let mut registry = self.registry.lock();
        if registry.get(&self.id).is_some_and(|entry| entry.ticket == self.ticket) {
            registry.remove(&self.id);
        }
    }
}
