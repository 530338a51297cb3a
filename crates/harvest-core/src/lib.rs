pub mod crawl;
pub mod dedup;
pub mod detail;
pub mod error;
pub mod limit;
pub mod listing;
pub mod models;
pub mod normalize;
pub mod registry;
pub mod throttle;
pub mod traits;
pub mod util;

#[cfg(test)]
mod testutil;

pub use crawl::{CrawlConfig, CrawlReporter, CrawlSession, CrawlStats, TracingCrawlReporter};
pub use dedup::{Admission, Deduplicator, DropReason, InMemorySeenStore};
pub use error::AppError;
pub use limit::LimitedFetcher;
pub use models::{FieldKey, JobLink, JobRecord, SiteConfig};
pub use registry::SiteRegistry;
pub use traits::{Fetcher, NullSink, RecordSink, SeenStore};
