//! Streaming deduplication of job records by job id.

use std::collections::HashSet;
use std::fmt;
use std::sync::Mutex;

use crate::models::JobRecord;
use crate::traits::SeenStore;

/// In-memory seen set. Lives as long as the crawl session; never pruned.
#[derive(Debug, Default)]
pub struct InMemorySeenStore {
    ids: Mutex<HashSet<String>>,
}

impl InMemorySeenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SeenStore for InMemorySeenStore {
    fn insert(&self, job_id: &str) -> bool {
        let mut ids = self.ids.lock().unwrap_or_else(|e| e.into_inner());
        ids.insert(job_id.to_string())
    }

    fn len(&self) -> usize {
        self.ids.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

/// Why a record did not make it past the deduplicator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropReason {
    /// The record has no job id.
    MissingRecordKey,
    /// A record with this job id was already admitted.
    Duplicate(String),
}

impl DropReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DropReason::MissingRecordKey => "missing_id",
            DropReason::Duplicate(_) => "duplicate",
        }
    }
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DropReason::MissingRecordKey => write!(f, "Item without job_id"),
            DropReason::Duplicate(id) => write!(f, "Duplicate job_id: {id}"),
        }
    }
}

/// Outcome of [`Deduplicator::admit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    Admitted(JobRecord),
    Dropped(DropReason),
}

impl Admission {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Admission::Admitted(_))
    }
}

/// Passes the first record for each job id and drops every repeat.
pub struct Deduplicator<S = InMemorySeenStore> {
    seen: S,
}

impl Deduplicator<InMemorySeenStore> {
    pub fn new() -> Self {
        Self {
            seen: InMemorySeenStore::new(),
        }
    }
}

impl Default for Deduplicator<InMemorySeenStore> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: SeenStore> Deduplicator<S> {
    /// Use a custom backend for the seen set.
    pub fn with_store(seen: S) -> Self {
        Self { seen }
    }

    pub fn admit(&self, record: JobRecord) -> Admission {
        let job_id = record.job_id.trim();
        if job_id.is_empty() {
            return Admission::Dropped(DropReason::MissingRecordKey);
        }

        if !self.seen.insert(job_id) {
            tracing::info!("Duplicate job skipped: {}", job_id);
            return Admission::Dropped(DropReason::Duplicate(job_id.to_string()));
        }

        Admission::Admitted(record)
    }

    /// Number of distinct job ids admitted so far.
    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }
}
