//! Bucket object names.

use std::fmt;
use thiserror::Error;

/// Returned when a caller-supplied object name cannot address the bucket.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid object name `{0}`")]
pub struct InvalidObjectName(pub String);

/// Key of a stored object inside the service bucket.
///
/// Any non-empty key is accepted. Whether it exists is the backend's call,
/// so keys written by other tools (spaces, `:`, `+`) stay reachable.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectName(String);

impl ObjectName {
    /// Wrap an untrusted name, e.g. from the `name` query parameter.
    pub fn parse(raw: &str) -> Result<Self, InvalidObjectName> {
        if raw.is_empty() {
            return Err(InvalidObjectName(String::new()));
        }
        Ok(Self(raw.to_string()))
    }

    /// Wrap a key the service generated itself or the backend listed.
    pub(crate) fn from_trusted(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
