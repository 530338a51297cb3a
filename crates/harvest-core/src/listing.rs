//! Listing page traversal.
//!
//! [`walk_listing`] turns a site's search page into a lazy stream of job
//! links. Links are yielded one at a time in page order, and the next page
//! is only fetched once every link of the current page has been consumed.

use std::collections::{HashSet, VecDeque};
use std::sync::LazyLock;

use futures::Stream;
use futures::stream;
use scraper::{ElementRef, Html, Selector};

use crate::models::{JobLink, PageFailure, SiteConfig};
use crate::traits::Fetcher;
use crate::util::{own_text, resolve_url};

static JOB_LINK: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("article.article--result .article__header__text__title a")
        .expect("job link selector is valid CSS")
});
static NEXT_PAGE: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("a.paginationNextLink").expect("pagination selector is valid CSS")
});

/// Job links and pagination found on one listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingPage {
    pub links: Vec<JobLink>,
    pub next_page: Option<String>,
}

/// Parse a listing page. Relative hrefs are resolved against `base_domain`;
/// anchors without an href are skipped.
pub fn parse_listing_page(html: &str, site_name: &str, base_domain: &str) -> ListingPage {
    let document = Html::parse_document(html);

    let links = document
        .select(&JOB_LINK)
        .filter_map(|anchor| {
            let href = anchor.value().attr("href").map(str::trim)?;
            if href.is_empty() {
                return None;
            }
            let Some(url) = resolve_url(base_domain, href) else {
                tracing::debug!(%href, %base_domain, "Could not resolve job link");
                return None;
            };
            Some(JobLink {
                url,
                title: anchor_title(anchor).to_string(),
                site_name: site_name.to_string(),
                base_domain: base_domain.to_string(),
            })
        })
        .collect();

    let next_page = document
        .select(&NEXT_PAGE)
        .filter_map(|anchor| anchor.value().attr("href"))
        .map(str::trim)
        .find(|href| !href.is_empty())
        .and_then(|href| resolve_url(base_domain, href));

    ListingPage { links, next_page }
}

/// The anchor's own text, or the first text nested inside it when the
/// title is wrapped in another element. Empty when there is none.
fn anchor_title(anchor: ElementRef<'_>) -> &str {
    own_text(anchor)
        .or_else(|| anchor.text().map(str::trim).find(|text| !text.is_empty()))
        .unwrap_or_default()
}

struct WalkState<F> {
    fetcher: F,
    site_name: String,
    base_domain: String,
    next_url: Option<String>,
    pending: VecDeque<JobLink>,
    visited: HashSet<String>,
}

/// Enumerate every job link of a site, following pagination until no
/// next-page link is left.
///
/// A failed page fetch is yielded once as an error and ends this site's
/// walk. There is no retry here.
pub fn walk_listing<F>(
    fetcher: F,
    site: SiteConfig,
) -> impl Stream<Item = Result<JobLink, PageFailure>> + Send
where
    F: Fetcher + 'static,
{
    let base_domain = site.base_domain();
    let state = WalkState {
        fetcher,
        visited: HashSet::from([site.base_url.clone()]),
        next_url: Some(site.base_url),
        site_name: site.name,
        base_domain,
        pending: VecDeque::new(),
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(link) = state.pending.pop_front() {
                return Some((Ok(link), state));
            }

            let url = state.next_url.take()?;
            let html = match state.fetcher.fetch(&url).await {
                Ok(html) => html,
                Err(error) => {
                    let failure = PageFailure {
                        site_name: state.site_name.clone(),
                        url,
                        error,
                    };
                    return Some((Err(failure), state));
                }
            };

            let page = parse_listing_page(&html, &state.site_name, &state.base_domain);
            tracing::info!(
                site = %state.site_name,
                "{}: found {} jobs on page",
                state.site_name,
                page.links.len()
            );
            state.pending.extend(page.links);

            if let Some(next) = page.next_page {
                if state.visited.insert(next.clone()) {
                    tracing::info!("Following next page for {}: {}", state.site_name, next);
                    state.next_url = Some(next);
                } else {
                    tracing::warn!(
                        site = %state.site_name,
                        url = %next,
                        "Next page already visited, stopping pagination"
                    );
                }
            }
        }
    })
}
