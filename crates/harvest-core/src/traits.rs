use std::future::Future;

use crate::error::AppError;
use crate::models::JobRecord;

/// Fetches raw HTML content from a URL.
pub trait Fetcher: Send + Sync + Clone {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<String, AppError>> + Send;
}

/// Receives deduplicated job records, one at a time.
pub trait RecordSink: Send + Sync {
    /// Hand over one record. Each call is independently committed.
    fn send(&self, record: &JobRecord) -> impl Future<Output = Result<(), AppError>> + Send;

    /// Flush buffered output once the crawl is over.
    fn finish(&self) -> impl Future<Output = Result<(), AppError>> + Send {
        async { Ok(()) }
    }
}

/// Storage for job ids the deduplicator has already let through.
pub trait SeenStore: Send + Sync {
    /// Record `job_id` as seen. Returns `true` if it was not seen before.
    ///
    /// The check and the insert must happen as one atomic step.
    fn insert(&self, job_id: &str) -> bool;

    /// Number of distinct ids seen so far.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A no-op sink for dry runs.
#[derive(Debug, Clone, Default)]
pub struct NullSink;

impl RecordSink for NullSink {
    async fn send(&self, _record: &JobRecord) -> Result<(), AppError> {
        Ok(())
    }
}
