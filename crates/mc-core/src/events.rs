//! Notifications pushed from the core back to the UI.
//!
//! These travel outside the request/response cycle: a conversion emits any
//! number of [`Notification::Progress`] messages before its response, and a
//! successful cancel is followed by [`Notification::Cancelled`]. Consumers
//! must tolerate notifications for ids they no longer track.

use serde::{Deserialize, Serialize};

use crate::ids::JobId;

/// Out-of-band message describing what happened to a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Notification {
    /// A job reported progress, as a percentage. Not clamped to `[0, 100]`.
    Progress { id: JobId, progress: f64 },
    /// A job was cancelled at the caller's request.
    Cancelled { id: JobId },
}

impl Notification {
    /// The job this notification is about.
    pub fn job_id(&self) -> &JobId {
        match self {
            Self::Progress { id, .. } | Self::Cancelled { id } => id,
        }
    }
}
