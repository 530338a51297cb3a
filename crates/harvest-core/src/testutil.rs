//! Test utilities: mock implementations of the collaborator traits.
//!
//! Handwritten mocks for dependency injection in unit tests.
//! All mocks use `Arc<Mutex<_>>` for interior mutability, allowing
//! test assertions on recorded calls.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::error::AppError;
use crate::models::JobRecord;
use crate::traits::{Fetcher, RecordSink};

// ---------------------------------------------------------------------------
// MockFetcher
// ---------------------------------------------------------------------------

#[derive(Clone)]
enum Route {
    Page(String),
    /// Error message; served as a `NetworkError` unless it was an HTTP error.
    Fail { http: bool, message: String },
}

/// Mock fetcher serving canned pages by URL.
///
/// Unknown URLs answer with an HTTP 404 error. Every requested URL is
/// recorded in call order.
#[derive(Clone, Default)]
pub struct MockFetcher {
    routes: Arc<Mutex<HashMap<String, Route>>>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(self, url: &str, html: &str) -> Self {
        self.routes
            .lock()
            .unwrap()
            .insert(url.to_string(), Route::Page(html.to_string()));
        self
    }

    /// Serve an error for `url`. Only the variant kind (HTTP or network)
    /// and the message are kept.
    pub fn with_error(self, url: &str, error: AppError) -> Self {
        let route = match error {
            AppError::HttpError(message) => Route::Fail {
                http: true,
                message,
            },
            other => Route::Fail {
                http: false,
                message: other.to_string(),
            },
        };
        self.routes.lock().unwrap().insert(url.to_string(), route);
        self
    }

    /// URLs requested so far, in call order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

impl Fetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<String, AppError> {
        self.requests.lock().unwrap().push(url.to_string());
        let route = self.routes.lock().unwrap().get(url).cloned();
        match route {
            Some(Route::Page(html)) => Ok(html),
            Some(Route::Fail { http: true, message }) => Err(AppError::HttpError(message)),
            Some(Route::Fail { http: false, message }) => Err(AppError::NetworkError(message)),
            None => Err(AppError::HttpError(format!("HTTP 404 for {url}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// MockSink
// ---------------------------------------------------------------------------

/// Mock sink that records every record it receives.
#[derive(Clone, Default)]
pub struct MockSink {
    pub records: Arc<Mutex<Vec<JobRecord>>>,
    /// Job ids whose `send` fails.
    failing_ids: Arc<Mutex<Vec<String>>>,
    /// Whether `finish` fails.
    failing_finish: bool,
    pub finished: Arc<Mutex<bool>>,
}

impl MockSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sink that rejects the record with the given job id.
    pub fn failing_on(job_id: &str) -> Self {
        let sink = Self::default();
        sink.failing_ids.lock().unwrap().push(job_id.to_string());
        sink
    }

    /// Sink whose final flush fails.
    pub fn failing_finish() -> Self {
        Self {
            failing_finish: true,
            ..Self::default()
        }
    }

    pub fn job_ids(&self) -> Vec<String> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.job_id.clone())
            .collect()
    }
}

impl RecordSink for MockSink {
    async fn send(&self, record: &JobRecord) -> Result<(), AppError> {
        if self.failing_ids.lock().unwrap().contains(&record.job_id) {
            return Err(AppError::SinkError(format!("rejected {}", record.job_id)));
        }
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }

    async fn finish(&self) -> Result<(), AppError> {
        *self.finished.lock().unwrap() = true;
        if self.failing_finish {
            return Err(AppError::SinkError("flush failed".into()));
        }
        Ok(())
    }
}
