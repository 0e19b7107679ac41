//! Video and audio conversion through a [`TranscodeEngine`].

use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use mc_av::{EngineProgress, FfmpegEngine, ToolRegistry, TranscodeEngine, TranscodeRequest};
use mc_core::config::ConversionConfig;
use mc_core::{Error, JobId};

use crate::adapter::{ensure_directory, Adapter, ConversionFuture, JobTable};
use crate::job::ConversionJob;
use crate::progress::ProgressSink;

/// Behaviour switches for [`TranscodeAdapter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TranscodeOptions {
    /// Replace existing output files.
    pub overwrite: bool,
    /// Drop progress reports lower than the last one sent for the job.
    pub monotonic_progress: bool,
}

impl Default for TranscodeOptions {
    fn default() -> Self {
        Self {
            overwrite: true,
            monotonic_progress: false,
        }
    }
}

impl From<&ConversionConfig> for TranscodeOptions {
    fn from(config: &ConversionConfig) -> Self {
        Self {
            overwrite: config.overwrite,
            monotonic_progress: config.monotonic_progress,
        }
    }
}

/// Adapter for video and audio jobs.
///
/// Probes the source duration, runs the engine, and turns its timemark
/// reports into percentages of that duration.
pub struct TranscodeAdapter {
    engine: Arc<dyn TranscodeEngine>,
    jobs: JobTable,
    options: TranscodeOptions,
}

impl TranscodeAdapter {
    pub fn new(engine: Arc<dyn TranscodeEngine>, options: TranscodeOptions) -> Self {
        Self {
            engine,
            jobs: JobTable::default(),
            options,
        }
    }

    /// Adapter backed by ffmpeg/ffprobe from `tools`.
    pub fn ffmpeg(tools: Arc<ToolRegistry>, options: TranscodeOptions) -> Self {
        Self::new(Arc::new(FfmpegEngine::new(tools)), options)
    }

    /// Number of jobs currently tracked by this adapter.
    pub fn active_count(&self) -> usize {
        self.jobs.len()
    }
}

impl std::fmt::Debug for TranscodeAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranscodeAdapter")
            .field("engine", &self.engine.name())
            .field("active", &self.jobs.len())
            .field("options", &self.options)
            .finish()
    }
}

impl Adapter for TranscodeAdapter {
    fn name(&self) -> &'static str {
        "transcode"
    }

    fn convert(&self, job: ConversionJob, progress: ProgressSink) -> ConversionFuture {
        let guard = self.jobs.register(&job.id);
        let engine = self.engine.clone();
        let options = self.options;

        Box::pin(async move {
            let result = run(engine.as_ref(), &job, &progress, &guard.token, options).await;
            if guard.token.is_cancelled() {
                return Err(Error::cancelled(&job.id));
            }
            result
        })
    }

    fn cancel(&self, id: &JobId) -> bool {
        let cancelled = self.jobs.cancel(id);
        if cancelled {
            tracing::debug!(job_id = %id, "Transcode cancel requested");
        }
        cancelled
    }
}

/// Passes progress through, optionally dropping values that go backwards.
struct ProgressGate {
    monotonic: bool,
    last: Mutex<f64>,
}

impl ProgressGate {
    fn new(monotonic: bool) -> Self {
        Self {
            monotonic,
            last: Mutex::new(f64::NEG_INFINITY),
        }
    }

    fn admit(&self, pct: f64) -> bool {
        if !self.monotonic {
            return true;
        }
        let mut last = self.last.lock();
        if pct < *last {
            return false;
        }
        *last = pct;
        true
    }
}

async fn run(
    engine: &dyn TranscodeEngine,
    job: &ConversionJob,
    progress: &ProgressSink,
    token: &CancellationToken,
    options: TranscodeOptions,
) -> mc_core::Result<PathBuf> {
    ensure_directory(&job.save_directory).await?;

    let duration = tokio::select! {
        biased;
        _ = token.cancelled() => return Err(Error::cancelled(&job.id)),
        duration = engine.probe_duration(&job.source_path) => duration?,
    };
    if duration.is_none() {
        tracing::debug!(job_id = %job.id, "Source duration unknown, progress will read 0");
    }

    let output = job.output_path();
    let request = TranscodeRequest {
        source: job.source_path.clone(),
        output: output.clone(),
        overwrite: options.overwrite,
    };

    tracing::info!(
        job_id = %job.id,
        engine = engine.name(),
        "Transcoding {} -> {}",
        job.source_path.display(),
        output.display()
    );

    let gate = ProgressGate::new(options.monotonic_progress);
    let on_progress = |report: EngineProgress| match report.percent(duration) {
        Some(pct) if gate.admit(pct) => progress.send(&job.id, pct),
        Some(_) => {}
        None => tracing::debug!(job_id = %job.id, ?report, "Unparseable progress report"),
    };

    engine.transcode(&request, &on_progress, token).await?;

    progress.send(&job.id, 100.0);
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    use async_trait::async_trait;

    /// Engine that replays a fixed list of progress reports.
    struct ScriptedEngine {
        duration: Result<Option<f64>, String>,
        reports: Vec<EngineProgress>,
        fail_with: Option<String>,
        hang: bool,
    }

    impl ScriptedEngine {
        fn ok(duration: Option<f64>, reports: Vec<EngineProgress>) -> Self {
            Self {
                duration: Ok(duration),
                reports,
                fail_with: None,
                hang: false,
            }
        }
    }

    #[async_trait]
    impl TranscodeEngine for ScriptedEngine {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn probe_duration(&self, _source: &Path) -> mc_core::Result<Option<f64>> {
            match &self.duration {
                Ok(d) => Ok(*d),
                Err(msg) => Err(Error::Probe(msg.clone())),
            }
        }

        async fn transcode(
            &self,
            _request: &TranscodeRequest,
            on_progress: &(dyn Fn(EngineProgress) + Send + Sync),
            cancel: &CancellationToken,
        ) -> mc_core::Result<()> {
            for report in &self.reports {
                on_progress(report.clone());
            }
            if self.hang {
                cancel.cancelled().await;
                return Err(Error::tool("scripted", "killed"));
            }
            match &self.fail_with {
                Some(msg) => Err(Error::tool("scripted", msg.clone())),
                None => Ok(()),
            }
        }
    }

    fn recording_sink() -> (ProgressSink, Arc<Mutex<Vec<f64>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        let sink = ProgressSink::new(move |_, pct| seen_clone.lock().push(pct));
        (sink, seen)
    }

    fn job(dir: &Path, id: &str) -> ConversionJob {
        ConversionJob::new(id, mc_core::MediaKind::Video, "/a/video.mov", "mp4", dir.join("out"))
    }

    #[tokio::test]
    async fn timemarks_become_percentages() {
        let dir = tempfile::tempdir().unwrap();
        let engine = ScriptedEngine::ok(
            Some(100.0),
            vec![
                EngineProgress::Timemark("00:00:25".into()),
                EngineProgress::Timemark("00:00:50".into()),
            ],
        );
        let adapter = TranscodeAdapter::new(Arc::new(engine), TranscodeOptions::default());
        let (sink, seen) = recording_sink();

        let output = adapter.convert(job(dir.path(), "1"), sink).await.unwrap();

        assert_eq!(output, dir.path().join("out").join("video.mp4"));
        assert!(dir.path().join("out").is_dir());
        assert_eq!(*seen.lock(), vec![25.0, 50.0, 100.0]);
        assert_eq!(adapter.active_count(), 0);
    }

    #[tokio::test]
    async fn unknown_duration_reports_zero() {
        let dir = tempfile::tempdir().unwrap();
        let engine = ScriptedEngine::ok(None, vec![EngineProgress::Timemark("00:00:10".into())]);
        let adapter = TranscodeAdapter::new(Arc::new(engine), TranscodeOptions::default());
        let (sink, seen) = recording_sink();

        adapter.convert(job(dir.path(), "1"), sink).await.unwrap();
        assert_eq!(*seen.lock(), vec![0.0, 100.0]);
    }

    #[tokio::test]
    async fn probe_failure_emits_no_progress() {
        let dir = tempfile::tempdir().unwrap();
        let engine = ScriptedEngine {
            duration: Err("no such file".into()),
            reports: vec![EngineProgress::Percent(10.0)],
            fail_with: None,
            hang: false,
        };
        let adapter = TranscodeAdapter::new(Arc::new(engine), TranscodeOptions::default());
        let (sink, seen) = recording_sink();

        let err = adapter.convert(job(dir.path(), "1"), sink).await.unwrap_err();
        assert!(matches!(err, Error::Probe(_)), "got: {err}");
        assert!(seen.lock().is_empty());
        assert_eq!(adapter.active_count(), 0);
    }

    #[tokio::test]
    async fn engine_failure_propagates() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = ScriptedEngine::ok(Some(10.0), vec![]);
        engine.fail_with = Some("Invalid data found".into());
        let adapter = TranscodeAdapter::new(Arc::new(engine), TranscodeOptions::default());

        let err = adapter
            .convert(job(dir.path(), "1"), ProgressSink::noop())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Tool { .. }), "got: {err}");
        assert!(!err.is_cancelled());
        assert_eq!(adapter.active_count(), 0);
    }

    #[tokio::test]
    async fn cancel_rejects_with_cancelled() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = ScriptedEngine::ok(Some(10.0), vec![]);
        engine.hang = true;
        let adapter = TranscodeAdapter::new(Arc::new(engine), TranscodeOptions::default());

        let future = adapter.convert(job(dir.path(), "7"), ProgressSink::noop());
        assert_eq!(adapter.active_count(), 1);
        assert!(adapter.cancel(&JobId::from("7")));
        assert!(!adapter.cancel(&JobId::from("7")));

        let err = future.await.unwrap_err();
        assert!(matches!(err, Error::Cancelled { ref id } if id.as_str() == "7"), "got: {err}");
        assert_eq!(adapter.active_count(), 0);
    }

    #[test]
    fn cancel_unknown_is_false() {
        let engine = ScriptedEngine::ok(None, vec![]);
        let adapter = TranscodeAdapter::new(Arc::new(engine), TranscodeOptions::default());
        assert!(!adapter.cancel(&JobId::from("missing")));
    }

    #[tokio::test]
    async fn monotonic_progress_drops_regressions() {
        let dir = tempfile::tempdir().unwrap();
        let reports = vec![
            EngineProgress::Percent(40.0),
            EngineProgress::Percent(30.0),
            EngineProgress::Percent(60.0),
        ];

        let options = TranscodeOptions {
            monotonic_progress: true,
            ..TranscodeOptions::default()
        };
        let adapter = TranscodeAdapter::new(Arc::new(ScriptedEngine::ok(None, reports.clone())), options);
        let (sink, seen) = recording_sink();
        adapter.convert(job(dir.path(), "1"), sink).await.unwrap();
        assert_eq!(*seen.lock(), vec![40.0, 60.0, 100.0]);

        let adapter = TranscodeAdapter::new(
            Arc::new(ScriptedEngine::ok(None, reports)),
            TranscodeOptions::default(),
        );
        let (sink, seen) = recording_sink();
        adapter.convert(job(dir.path(), "1"), sink).await.unwrap();
        assert_eq!(*seen.lock(), vec![40.0, 30.0, 60.0, 100.0]);
    }

    #[tokio::test]
    async fn directory_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("out");
        std::fs::write(&blocker, b"file").unwrap();
        let adapter = TranscodeAdapter::new(
            Arc::new(ScriptedEngine::ok(None, vec![])),
            TranscodeOptions::default(),
        );

        let err = adapter
            .convert(job(dir.path(), "1"), ProgressSink::noop())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::DirectoryCreation { .. }), "got: {err}");
    }

    #[test]
    fn options_follow_config() {
        let config = ConversionConfig {
            overwrite: false,
            monotonic_progress: true,
        };
        let options = TranscodeOptions::from(&config);
        assert!(!options.overwrite);
        assert!(options.monotonic_progress);
    }
}
