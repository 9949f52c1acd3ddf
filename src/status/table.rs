// src/status/table.rs
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Ok,
    Down,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Ok => "ok",
            Status::Down => "down",
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Status::Ok)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Last observed status per endpoint.
///
/// Cloning shares the underlying map. Writes lock a single shard, so readers
/// are never held up by a sweep in flight; they see whatever has been
/// written so far.
#[derive(Debug, Clone, Default)]
pub struct StatusTable {
    entries: Arc<DashMap<String, Status>>,
}

impl StatusTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` means the endpoint has not been checked yet.
    pub fn get(&self, endpoint: &str) -> Option<Status> {
        self.entries.get(endpoint).map(|entry| *entry.value())
    }

    pub fn set(&self, endpoint: &str, status: Status) {
        self.entries.insert(endpoint.to_string(), status);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Point-in-time copy, sorted by endpoint.
    pub fn snapshot(&self) -> BTreeMap<String, Status> {
        self.entries
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect()
    }
}
