//! Crawl-wide cap on simultaneous requests.
//!
//! [`LimitedFetcher`] hands out a fixed number of permits shared by every
//! clone, so listing and detail requests of all sites together never exceed
//! the configured limit.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio_util::task::AbortOnDropHandle;

use crate::error::AppError;
use crate::traits::Fetcher;

/// A [`Fetcher`] wrapper allowing at most `limit` requests in flight.
///
/// Each request runs on its own task while it holds a permit, so a request
/// that has started always makes progress even if the caller stops polling
/// it for a while. Dropping the caller's future aborts the task and frees
/// the permit.
#[derive(Clone)]
pub struct LimitedFetcher<F> {
    inner: F,
    permits: Arc<Semaphore>,
}

impl<F: Fetcher + 'static> LimitedFetcher<F> {
    pub fn new(inner: F, limit: usize) -> Self {
        Self {
            inner,
            permits: Arc::new(Semaphore::new(limit.max(1))),
        }
    }

    /// Permits not currently held by a request.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }
}

impl<F: Fetcher + 'static> Fetcher for LimitedFetcher<F> {
    async fn fetch(&self, url: &str) -> Result<String, AppError> {
        let inner = self.inner.clone();
        let permits = Arc::clone(&self.permits);
        let url = url.to_string();

        let task = AbortOnDropHandle::new(tokio::spawn(async move {
            let _permit = permits
                .acquire_owned()
                .await
                .map_err(|e| AppError::Generic(format!("Request limiter closed: {e}")))?;
            inner.fetch(&url).await
        }));

        task.await
            .map_err(|e| AppError::Generic(format!("Fetch task failed: {e}")))?
    }
}
