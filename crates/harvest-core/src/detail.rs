//! Detail page extraction: job id, structured fields, and description.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::error::AppError;
use crate::models::{DetailContext, JobRecord, StructuredFields};
use crate::normalize::normalize_label;
use crate::util::own_text;

static JOB_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("job id pattern is valid"));

static FIELD: LazyLock<Selector> = LazyLock::new(|| selector(".article__content__view__field"));
static FIELD_LABEL: LazyLock<Selector> =
    LazyLock::new(|| selector(".article__content__view__field__label"));
static FIELD_VALUE: LazyLock<Selector> =
    LazyLock::new(|| selector(".article__content__view__field__value"));
static CONTENT_VIEW: LazyLock<Selector> = LazyLock::new(|| selector(".article__content__view"));

/// UI chrome that trails the real description (share and apply buttons).
const BOILERPLATE: &[&str] = &[
    "share this job",
    "facebook",
    "x",
    "linkedin",
    "apply",
    "email",
    "share",
];

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("detail selectors are valid CSS")
}

/// Build a record from a detail page.
///
/// Fails with [`AppError::MissingJobId`] when the URL has no digits; the
/// caller skips such jobs.
pub fn extract_job(
    html: &str,
    ctx: &DetailContext,
    extracted_at: DateTime<Utc>,
) -> Result<JobRecord, AppError> {
    let job_id =
        extract_job_id(&ctx.url).ok_or_else(|| AppError::MissingJobId(ctx.url.clone()))?;

    let document = Html::parse_document(html);
    let fields = extract_fields(&document);
    let description = extract_description(&document);

    Ok(JobRecord::new(ctx, job_id, extracted_at)
        .with_fields(fields)
        .with_description(description))
}

/// First maximal run of decimal digits in `url`.
pub fn extract_job_id(url: &str) -> Option<&str> {
    JOB_ID.find(url).map(|m| m.as_str())
}

/// Structured fields, in document order. Later blocks overwrite earlier
/// ones for the same key.
///
/// A block is either a label/value pair or a lone value of the form
/// `"Label: value"`. Blocks without a value are skipped.
pub fn extract_fields(document: &Html) -> StructuredFields {
    let mut fields = StructuredFields::default();

    for block in document.select(&FIELD) {
        let label = first_own_text(block, &FIELD_LABEL);
        let Some(value) = first_own_text(block, &FIELD_VALUE) else {
            tracing::debug!(label = ?label, "Field block without value, skipping");
            continue;
        };

        let (raw_label, raw_value) = match label {
            Some(label) => (label, value),
            None => match value.split_once(':') {
                Some(split) => split,
                None => continue,
            },
        };

        if let Some(key) = normalize_label(raw_label).filter(|key| key.is_allowed()) {
            fields.set(key, raw_value.trim());
        }
    }

    fields
}

fn first_own_text<'a>(block: ElementRef<'a>, selector: &Selector) -> Option<&'a str> {
    block.select(selector).next().and_then(own_text)
}

/// Description text under the content view, with trailing UI chrome
/// removed. `None` when nothing is left.
pub fn extract_description(document: &Html) -> Option<String> {
    let mut fragments = Vec::new();

    for container in document.select(&CONTENT_VIEW) {
        if has_matching_ancestor(container, &CONTENT_VIEW) {
            continue;
        }
        fragments.extend(
            container
                .text()
                .map(str::trim)
                .filter(|text| !text.is_empty()),
        );
    }

    let kept = trim_trailing_boilerplate(&fragments);
    if kept.is_empty() {
        None
    } else {
        Some(kept.join(" "))
    }
}

fn has_matching_ancestor(element: ElementRef<'_>, selector: &Selector) -> bool {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .any(|ancestor| selector.matches(&ancestor))
}

/// Drop fragments from the end while they look like share/apply chrome.
///
/// Stops at the first fragment from the end that does not match, so a
/// keyword inside the body of the description is never touched.
pub fn trim_trailing_boilerplate<'a, S: AsRef<str>>(fragments: &'a [S]) -> &'a [S] {
    let mut end = fragments.len();
    while end > 0 && is_boilerplate(fragments[end - 1].as_ref()) {
        end -= 1;
    }
    &fragments[..end]
}

fn is_boilerplate(fragment: &str) -> bool {
    let line = fragment.to_lowercase();
    let line = line.trim_end_matches(':');
    BOILERPLATE.iter().any(|keyword| line.contains(keyword))
}
