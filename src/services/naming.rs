//! Object naming policy.
//!
//! A name is derived once per upload attempt, before the first `put`.

use crate::{models::object_name::ObjectName, services::media_gate::OUTPUT_EXTENSION};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

pub trait NameGenerator: Send + Sync {
    fn generate(&self) -> ObjectName;
}

/// Wall-clock names with a random suffix:
/// `20261016T120000.123456Z-1a2b3c4d.jpg`.
///
/// The suffix keeps two uploads in the same microsecond apart.
#[derive(Debug, Default, Clone, Copy)]
pub struct TimestampNames;

impl TimestampNames {
    fn name_at(now: DateTime<Utc>, suffix: &str) -> ObjectName {
        ObjectName::from_trusted(format!(
            "{}-{}.{}",
            now.format("%Y%m%dT%H%M%S%.6fZ"),
            suffix,
            OUTPUT_EXTENSION
        ))
    }
}

impl NameGenerator for TimestampNames {
    fn generate(&self) -> ObjectName {
        let suffix = Uuid::new_v4().simple().to_string();
        Self::name_at(Utc::now(), &suffix[..8])
    }
}

/// Deterministic `{prefix}-000001.jpg`, `{prefix}-000002.jpg`, ...
#[derive(Debug)]
pub struct SequenceNames {
    prefix: String,
    next: AtomicU64,
}

impl SequenceNames {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU64::new(1),
        }
    }
}

impl NameGenerator for SequenceNames {
    fn generate(&self) -> ObjectName {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        ObjectName::from_trusted(format!("{}-{:06}.{}", self.prefix, n, OUTPUT_EXTENSION))
    }
}
