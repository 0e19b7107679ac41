//! mc-core: shared types, IDs, errors, configuration, and notifications.
//!
//! This crate is the foundational dependency for all other mc-* crates,
//! providing the caller-supplied job identifier, the closed set of media
//! kinds with their output format tables, a unified error type, application
//! configuration, and the notification payloads sent back to the UI.

pub mod config;
pub mod error;
pub mod events;
pub mod ids;
pub mod media;

// Re-export the most commonly used items at the crate root.
pub use error::{Error, Result};
pub use events::Notification;
pub use ids::JobId;
pub use media::{Backend, MediaKind};
