//! Concrete [`Adapter`](crate::Adapter) implementations.

mod image;
mod transcode;

pub use self::image::ImageAdapter;
pub use transcode::{TranscodeAdapter, TranscodeOptions};
