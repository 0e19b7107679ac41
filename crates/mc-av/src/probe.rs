//! Source duration probing via ffprobe.
//!
//! Shells out to `ffprobe -v error -print_format json -show_format` and reads
//! `format.duration`. Any failure, including a missing ffprobe, is reported
//! as [`mc_core::Error::Probe`].

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::command::ToolCommand;
use crate::tools::ToolRegistry;

/// Probes of a local file should be quick.
const PROBE_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: Option<FfprobeFormat>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

/// Return the total duration of `source` in seconds.
///
/// `Ok(None)` means ffprobe ran but reported no usable duration (streams,
/// still images); callers then report 0% until completion.
pub async fn probe_duration(tools: &ToolRegistry, source: &Path) -> mc_core::Result<Option<f64>> {
    let ffprobe = tools
        .require("ffprobe")
        .map_err(|e| mc_core::Error::Probe(e.to_string()))?;

    let output = ToolCommand::new(ffprobe.path.clone())
        .args(["-v", "error", "-print_format", "json", "-show_format"])
        .arg(source.to_string_lossy().as_ref())
        .timeout(PROBE_TIMEOUT)
        .execute()
        .await
        .map_err(|e| mc_core::Error::Probe(format!("{}: {e}", source.display())))?;

    let duration = parse_duration(&output.stdout)?;
    tracing::debug!("Probed {}: duration={duration:?}", source.display());
    Ok(duration)
}

/// Extract `format.duration` from ffprobe JSON output.
fn parse_duration(json: &str) -> mc_core::Result<Option<f64>> {
    let parsed: FfprobeOutput = serde_json::from_str(json)
        .map_err(|e| mc_core::Error::Probe(format!("ffprobe JSON parse error: {e}")))?;

    Ok(parsed
        .format
        .and_then(|f| f.duration)
        .and_then(|d| d.trim().parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 0.0))
}
