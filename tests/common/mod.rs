//! Shared test harness for integration tests.
//!
//! Provides [`ScriptedEngine`], a [`TranscodeEngine`] that replays canned
//! progress reports instead of running ffmpeg, plus helpers for building
//! jobs and recording progress.

#![allow(dead_code)]

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use mc_av::{EngineProgress, TranscodeEngine, TranscodeRequest};
use mc_convert::{ConversionJob, Dispatcher, ProgressSink};
use mc_core::{Error, JobId, MediaKind};

/// What the scripted engine does after replaying its reports.
#[derive(Debug, Clone)]
pub enum Ending {
    Finish,
    Fail(String),
    /// Block until cancelled, then fail the way a killed process would.
    Hang,
}

/// Transcode engine that replays a fixed script.
#[derive(Debug, Clone)]
pub struct ScriptedEngine {
    pub duration: Option<f64>,
    pub reports: Vec<EngineProgress>,
    pub ending: Ending,
}

impl ScriptedEngine {
    pub fn percent_then_finish(pct: f64) -> Self {
        Self {
            duration: Some(60.0),
            reports: vec![EngineProgress::Percent(pct)],
            ending: Ending::Finish,
        }
    }

    pub fn timemarks(duration: Option<f64>, marks: &[&str]) -> Self {
        Self {
            duration,
            reports: marks
                .iter()
                .map(|m| EngineProgress::Timemark(m.to_string()))
                .collect(),
            ending: Ending::Finish,
        }
    }

    pub fn hanging() -> Self {
        Self {
            duration: Some(60.0),
            reports: Vec::new(),
            ending: Ending::Hang,
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            duration: Some(60.0),
            reports: Vec::new(),
            ending: Ending::Fail(message.to_string()),
        }
    }
}

#[async_trait]
impl TranscodeEngine for ScriptedEngine {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn probe_duration(&self, _source: &Path) -> mc_core::Result<Option<f64>> {
        Ok(self.duration)
    }

    async fn transcode(
        &self,
        request: &TranscodeRequest,
        on_progress: &(dyn Fn(EngineProgress) + Send + Sync),
        cancel: &CancellationToken,
    ) -> mc_core::Result<()> {
        for report in &self.reports {
            on_progress(report.clone());
        }
        match &self.ending {
            Ending::Finish => {
                std::fs::write(&request.output, b"converted")?;
                Ok(())
            }
            Ending::Fail(message) => Err(Error::tool("scripted", message.clone())),
            Ending::Hang => {
                cancel.cancelled().await;
                Err(Error::tool("scripted", "killed"))
            }
        }
    }
}

pub type Recorded = Arc<Mutex<Vec<(JobId, f64)>>>;

/// A sink that records every progress report it receives.
pub fn recording_sink() -> (ProgressSink, Recorded) {
    let seen: Recorded = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = seen.clone();
    let sink = ProgressSink::new(move |id, pct| seen_clone.lock().unwrap().push((id.clone(), pct)));
    (sink, seen)
}

/// A `video.mov -> mp4` job saving into `<dir>/out`.
pub fn job(id: &str, kind: MediaKind, dir: &Path) -> ConversionJob {
    ConversionJob::new(id, kind, "/a/video.mov", "mp4", dir.join("out"))
}

pub async fn wait_until_active(dispatcher: &Dispatcher, id: &str) {
    let id = JobId::from(id);
    tokio::time::timeout(std::time::Duration::from_secs(5), async {
        while !dispatcher.is_active(&id) {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("job never became active");
}

pub fn write_png(path: &Path) {
    let img = image::RgbaImage::from_pixel(4, 4, image::Rgba([10, 20, 30, 255]));
    img.save(path).unwrap();
}
