//! Job identifiers.
//!
//! Unlike server-generated IDs, a [`JobId`] is chosen by the caller (the UI
//! assigns one per queued file) and only has to be unique among the jobs
//! that are running at the same time.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Caller-supplied identifier for one conversion job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// Wrap a caller-supplied identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for JobId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl Borrow<str> for JobId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn display_is_the_raw_id() {
        let id = JobId::new("f3a9-1");
        assert_eq!(id.to_string(), "f3a9-1");
        assert_eq!(id.as_str(), "f3a9-1");
    }

    #[test]
    fn serializes_as_plain_string() {
        let id = JobId::from("42");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"42\"");
        let back: JobId = serde_json::from_str("\"42\"").unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn map_lookup_by_str() {
        let mut map = HashMap::new();
        map.insert(JobId::from("a"), 1);
        assert_eq!(map.get("a"), Some(&1));
    }
}
