//! # mc-convert
//!
//! Conversion orchestration for mediaconv.
//!
//! This crate provides:
//!
//! - **[`ConversionJob`]** -- one request to convert a single file, with its
//!   derived output path.
//! - **[`Adapter`]** trait -- a backend that converts files and can cancel
//!   its own in-flight jobs.
//! - **Built-in adapters** ([`adapters`]) -- the ffmpeg-backed
//!   [`TranscodeAdapter`] for video and audio and the in-process
//!   [`ImageAdapter`].
//! - **[`ProgressSink`]** -- where adapters report per-job percentages.
//! - **[`Dispatcher`]** -- selects an adapter by media kind, tracks running
//!   jobs by id, and routes cancellation.

pub mod adapter;
pub mod adapters;
pub mod dispatcher;
pub mod job;
pub mod progress;

// Re-export key types at the crate root.
pub use adapter::{Adapter, ConversionFuture};
pub use adapters::{ImageAdapter, TranscodeAdapter, TranscodeOptions};
pub use dispatcher::Dispatcher;
pub use job::ConversionJob;
pub use progress::ProgressSink;
