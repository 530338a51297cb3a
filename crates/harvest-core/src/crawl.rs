use chrono::Utc;
use futures::StreamExt;
use futures::stream;
use tokio_util::sync::CancellationToken;

use crate::dedup::{Admission, Deduplicator, DropReason, InMemorySeenStore};
use crate::detail::extract_job;
use crate::error::AppError;
use crate::limit::LimitedFetcher;
use crate::listing::walk_listing;
use crate::models::{JobLink, JobRecord, PageFailure, SiteConfig};
use crate::traits::{Fetcher, RecordSink, SeenStore};

/// Crawl-wide settings owned by the session.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Maximum requests in flight at once, listing and detail pages of all
    /// sites together.
    pub concurrency: usize,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self { concurrency: 2 }
    }
}

impl CrawlConfig {
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }
}

/// Counters gathered over one crawl.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlStats {
    pub sites: usize,
    pub links: usize,
    pub records_emitted: usize,
    pub duplicates: usize,
    pub missing_ids: usize,
    pub listing_failures: usize,
    pub detail_failures: usize,
    pub sink_failures: usize,
    pub cancelled: bool,
}

/// Events emitted by the crawl session for monitoring/logging.
#[derive(Debug, Clone)]
pub enum CrawlEvent<'a> {
    SiteStarted {
        site: &'a SiteConfig,
    },
    ListingFailed {
        site_name: &'a str,
        url: &'a str,
        error: &'a AppError,
    },
    DetailFailed {
        link: &'a JobLink,
        error: &'a AppError,
    },
    MissingJobId {
        url: &'a str,
    },
    Dropped {
        url: &'a str,
        reason: &'a DropReason,
    },
    RecordEmitted {
        record: &'a JobRecord,
    },
    SinkFailed {
        job_id: &'a str,
        error: &'a AppError,
    },
    SinkFinishFailed {
        error: &'a AppError,
    },
    Cancelled,
    Finished {
        stats: &'a CrawlStats,
    },
}

/// Trait for receiving crawl events (decoupled logging).
pub trait CrawlReporter: Send + Sync {
    fn report(&self, event: CrawlEvent<'_>) {
        let _ = event;
    }
}

/// Reporter that uses the `tracing` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingCrawlReporter;

impl CrawlReporter for TracingCrawlReporter {
    fn report(&self, event: CrawlEvent<'_>) {
        match event {
            CrawlEvent::SiteStarted { site } => {
                tracing::info!("Starting scraping for site: {}", site.name);
            }
            CrawlEvent::ListingFailed {
                site_name,
                url,
                error,
            } => {
                tracing::warn!(site = %site_name, %url, %error, "Listing page failed");
            }
            CrawlEvent::DetailFailed { link, error } if error.is_fetch_failure() => {
                tracing::warn!(site = %link.site_name, url = %link.url, %error, "Detail page failed");
            }
            CrawlEvent::DetailFailed { link, error } => {
                tracing::error!(site = %link.site_name, url = %link.url, %error, "Detail page could not be processed");
            }
            CrawlEvent::MissingJobId { url } => {
                tracing::warn!("Job ID not found in URL, skipping job: {}", url);
            }
            CrawlEvent::Dropped { url, reason } => match reason {
                DropReason::MissingRecordKey => {
                    tracing::warn!(%url, "Record without job_id dropped");
                }
                DropReason::Duplicate(job_id) => {
                    tracing::debug!(%job_id, %url, "Duplicate record dropped");
                }
            },
            CrawlEvent::RecordEmitted { record } => {
                tracing::debug!(job_id = %record.job_id, source = %record.source, "Record emitted");
            }
            CrawlEvent::SinkFailed { job_id, error } => {
                tracing::warn!(%job_id, %error, "Sink rejected record");
            }
            CrawlEvent::SinkFinishFailed { error } => {
                tracing::error!(%error, "Sink failed to flush output");
            }
            CrawlEvent::Cancelled => {
                tracing::info!("Crawl cancelled, stopping");
            }
            CrawlEvent::Finished { stats } => {
                tracing::info!(
                    sites = stats.sites,
                    links = stats.links,
                    emitted = stats.records_emitted,
                    duplicates = stats.duplicates,
                    missing_ids = stats.missing_ids,
                    listing_failures = stats.listing_failures,
                    detail_failures = stats.detail_failures,
                    sink_failures = stats.sink_failures,
                    "Crawl finished"
                );
            }
        }
    }
}

/// Result of one unit of work coming out of the fetch stage.
enum Outcome {
    Listing(PageFailure),
    Detail {
        link: JobLink,
        page: Result<String, AppError>,
    },
}

/// Orchestrates the crawl: listing walk → detail fetch → extract → dedup → sink.
///
/// Generic over its collaborators via traits, so tests run without real
/// HTTP or storage. The session owns the deduplicator; nothing is global.
pub struct CrawlSession<F, K, S = InMemorySeenStore>
where
    F: Fetcher,
    K: RecordSink,
    S: SeenStore,
{
    fetcher: F,
    sink: K,
    dedup: Deduplicator<S>,
    config: CrawlConfig,
}

impl<F, K> CrawlSession<F, K, InMemorySeenStore>
where
    F: Fetcher + 'static,
    K: RecordSink,
{
    /// Create a session with an in-memory seen set.
    pub fn new(fetcher: F, sink: K, config: CrawlConfig) -> Self {
        Self::with_dedup(fetcher, sink, Deduplicator::new(), config)
    }
}

impl<F, K, S> CrawlSession<F, K, S>
where
    F: Fetcher + 'static,
    K: RecordSink,
    S: SeenStore,
{
    pub fn with_dedup(fetcher: F, sink: K, dedup: Deduplicator<S>, config: CrawlConfig) -> Self {
        Self {
            fetcher,
            sink,
            dedup,
            config,
        }
    }

    /// Crawl every site until all listings are exhausted or `cancel` fires.
    ///
    /// Failures are local: a listing failure ends that site, a detail
    /// failure skips that job, a sink failure skips that record. The
    /// returned stats cover everything handled before the end.
    pub async fn run<R: CrawlReporter>(
        &self,
        sites: &[SiteConfig],
        cancel: CancellationToken,
        reporter: &R,
    ) -> CrawlStats {
        let mut stats = CrawlStats {
            sites: sites.len(),
            ..CrawlStats::default()
        };

        let concurrency = self.config.concurrency.max(1);
        let fetcher = LimitedFetcher::new(self.fetcher.clone(), concurrency);

        let listings = stream::select_all(sites.iter().map(|site| {
            reporter.report(CrawlEvent::SiteStarted { site });
            Box::pin(walk_listing(fetcher.clone(), site.clone()))
        }));

        let outcomes = listings
            .map(move |item| {
                let fetcher = fetcher.clone();
                async move {
                    match item {
                        Ok(link) => {
                            let page = fetcher.fetch(&link.url).await;
                            Outcome::Detail { link, page }
                        }
                        Err(failure) => Outcome::Listing(failure),
                    }
                }
            })
            .buffer_unordered(concurrency);
        futures::pin_mut!(outcomes);

        loop {
            let outcome = tokio::select! {
                () = cancel.cancelled() => {
                    reporter.report(CrawlEvent::Cancelled);
                    stats.cancelled = true;
                    break;
                }
                next = outcomes.next() => match next {
                    Some(outcome) => outcome,
                    None => break,
                },
            };
            self.handle(outcome, &mut stats, reporter).await;
        }

        if let Err(error) = self.sink.finish().await {
            stats.sink_failures += 1;
            reporter.report(CrawlEvent::SinkFinishFailed { error: &error });
        }

        reporter.report(CrawlEvent::Finished { stats: &stats });
        stats
    }

    async fn handle<R: CrawlReporter>(&self, outcome: Outcome, stats: &mut CrawlStats, reporter: &R) {
        let (link, html) = match outcome {
            Outcome::Listing(failure) => {
                stats.listing_failures += 1;
                reporter.report(CrawlEvent::ListingFailed {
                    site_name: &failure.site_name,
                    url: &failure.url,
                    error: &failure.error,
                });
                return;
            }
            Outcome::Detail { link, page } => {
                stats.links += 1;
                match page {
                    Ok(html) => (link, html),
                    Err(error) => {
                        stats.detail_failures += 1;
                        reporter.report(CrawlEvent::DetailFailed {
                            link: &link,
                            error: &error,
                        });
                        return;
                    }
                }
            }
        };

        let record = match extract_job(&html, &link.context(), Utc::now()) {
            Ok(record) => record,
            Err(AppError::MissingJobId(url)) => {
                stats.missing_ids += 1;
                reporter.report(CrawlEvent::MissingJobId { url: &url });
                return;
            }
            Err(error) => {
                stats.detail_failures += 1;
                reporter.report(CrawlEvent::DetailFailed {
                    link: &link,
                    error: &error,
                });
                return;
            }
        };

        let record = match self.dedup.admit(record) {
            Admission::Admitted(record) => record,
            Admission::Dropped(reason) => {
                match reason {
                    DropReason::MissingRecordKey => stats.missing_ids += 1,
                    DropReason::Duplicate(_) => stats.duplicates += 1,
                }
                reporter.report(CrawlEvent::Dropped {
                    url: &link.url,
                    reason: &reason,
                });
                return;
            }
        };

        match self.sink.send(&record).await {
            Ok(()) => {
                stats.records_emitted += 1;
                reporter.report(CrawlEvent::RecordEmitted { record: &record });
            }
            Err(error) => {
                stats.sink_failures += 1;
                reporter.report(CrawlEvent::SinkFailed {
                    job_id: &record.job_id,
                    error: &error,
                });
            }
        }
    }
}
