//! # mc-av
//!
//! External media tool plumbing for the mediaconv core.
//!
//! This crate provides:
//!
//! - **Tool discovery** ([`ToolRegistry`]) -- find and cache paths to ffmpeg
//!   and ffprobe.
//! - **Command execution** ([`ToolCommand`]) -- async builder with timeout
//!   support for short-lived tool invocations.
//! - **Duration probing** ([`probe_duration`]) -- ffprobe-backed lookup of a
//!   source's total duration.
//! - **Progress math** ([`progress`]) -- timemark parsing and percentage
//!   calculation.
//! - **Transcode engines** ([`TranscodeEngine`], [`FfmpegEngine`]) -- the
//!   long-running, killable conversion process.

pub mod command;
pub mod engine;
pub mod ffmpeg;
pub mod probe;
pub mod progress;
pub mod tools;

// ---- Re-exports for convenience ----

pub use command::{ToolCommand, ToolOutput};
pub use engine::{TranscodeEngine, TranscodeRequest};
pub use ffmpeg::FfmpegEngine;
pub use probe::probe_duration;
pub use progress::{parse_timemark, progress_percent, EngineProgress};
pub use tools::{ToolConfig, ToolInfo, ToolRegistry};
