//! FFmpeg-backed [`TranscodeEngine`].
//!
//! Runs `ffmpeg -progress pipe:1` and turns its `out_time=` lines into
//! timemark progress reports. The child is killed as soon as the job's
//! cancellation token fires, and also if the future is dropped.

use std::collections::VecDeque;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;

use crate::engine::{TranscodeEngine, TranscodeRequest};
use crate::progress::EngineProgress;
use crate::tools::ToolRegistry;

/// Number of stderr lines kept for error messages.
const STDERR_TAIL_LINES: usize = 20;

/// Transcoder that shells out to ffmpeg, probing with ffprobe.
#[derive(Debug, Clone)]
pub struct FfmpegEngine {
    tools: Arc<ToolRegistry>,
}

impl FfmpegEngine {
    /// Create an engine using the tools found in `tools`.
    ///
    /// Missing tools are not an error here: each conversion fails with
    /// [`mc_core::Error::Tool`] instead, so image conversions keep working
    /// on machines without ffmpeg.
    pub fn new(tools: Arc<ToolRegistry>) -> Self {
        Self { tools }
    }
}

/// Build the ffmpeg argument list for a request.
fn build_args(request: &TranscodeRequest) -> Vec<String> {
    let mut args: Vec<String> = [
        "-hide_banner",
        "-nostats",
        "-loglevel",
        "error",
        "-progress",
        "pipe:1",
    ]
    .into_iter()
    .map(String::from)
    .collect();

    args.push(if request.overwrite { "-y" } else { "-n" }.to_string());
    args.push("-i".to_string());
    args.push(request.source.to_string_lossy().to_string());
    args.push(request.output.to_string_lossy().to_string());
    args
}

/// Extract a progress report from one line of `-progress` output.
fn parse_progress_line(line: &str) -> Option<EngineProgress> {
    let value = line.trim().strip_prefix("out_time=")?.trim();
    // ffmpeg prints N/A before the first frame and occasionally a negative
    // time right after start.
    if value.starts_with('-') || value == "N/A" {
        return None;
    }
    Some(EngineProgress::Timemark(value.to_string()))
}

/// Keep the last few lines of stderr for error reporting.
async fn collect_tail(stderr: impl AsyncRead + Unpin) -> String {
    let mut lines = BufReader::new(stderr).lines();
    let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);
    while let Ok(Some(line)) = lines.next_line().await {
        if tail.len() == STDERR_TAIL_LINES {
            tail.pop_front();
        }
        tail.push_back(line);
    }
    Vec::from(tail).join("\n")
}

/// Kill the child and wait for it to exit.
async fn terminate(child: &mut Child) -> mc_core::Error {
    if let Err(e) = child.start_kill() {
        tracing::warn!("Failed to kill ffmpeg: {e}");
    }
    if let Err(e) = child.wait().await {
        tracing::warn!("Failed to reap ffmpeg: {e}");
    }
    mc_core::Error::tool("ffmpeg", "terminated")
}

#[async_trait]
impl TranscodeEngine for FfmpegEngine {
    fn name(&self) -> &'static str {
        "ffmpeg"
    }

    async fn probe_duration(&self, source: &Path) -> mc_core::Result<Option<f64>> {
        crate::probe::probe_duration(&self.tools, source).await
    }

    async fn transcode(
        &self,
        request: &TranscodeRequest,
        on_progress: &(dyn Fn(EngineProgress) + Send + Sync),
        cancel: &CancellationToken,
    ) -> mc_core::Result<()> {
        let ffmpeg = self.tools.require("ffmpeg")?;
        let args = build_args(request);

        tracing::info!(
            "ffmpeg: {} -> {}",
            request.source.display(),
            request.output.display()
        );
        tracing::debug!("FFmpeg args: {:?}", args);

        let mut child = Command::new(&ffmpeg.path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| mc_core::Error::tool("ffmpeg", format!("failed to spawn: {e}")))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| mc_core::Error::tool("ffmpeg", "stdout was not captured"))?;
        let stderr_tail = child.stderr.take().map(|s| tokio::spawn(collect_tail(s)));

        let mut lines = BufReader::new(stdout).lines();
        loop {
            let line = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                line = lines.next_line() => Some(line),
            };

            match line {
                None => return Err(terminate(&mut child).await),
                Some(Ok(Some(line))) => {
                    if let Some(progress) = parse_progress_line(&line) {
                        on_progress(progress);
                    }
                }
                Some(Ok(None)) => break,
                Some(Err(e)) => {
                    tracing::debug!("Stopped reading ffmpeg progress: {e}");
                    break;
                }
            }
        }

        let status = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            status = child.wait() => Some(status),
        };
        let Some(status) = status else {
            return Err(terminate(&mut child).await);
        };
        let status = status
            .map_err(|e| mc_core::Error::tool("ffmpeg", format!("I/O error waiting for process: {e}")))?;

        if status.success() {
            return Ok(());
        }

        let tail = match stderr_tail {
            Some(handle) => handle.await.unwrap_or_default(),
            None => String::new(),
        };
        Err(mc_core::Error::tool(
            "ffmpeg",
            format!("exited with status {status}: {}", tail.trim()),
        ))
    }
}
