//! mediaconv - media conversion service
//!
//! This library crate exposes the transport layer for integration testing.
//! The conversion core lives in `mc-convert`.

pub mod protocol;
pub mod transport;

pub use transport::serve;
