use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

/// Path segment at which a site's search URL is cut to obtain its domain root.
const CAREERS_SEGMENT: &str = "/careers";

/// A crawl target: a career site and its job search page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Identifier for the site, copied into every record as `source`.
    pub name: String,
    /// Search page URL (e.g. `https://acme.avature.net/careers/SearchJobs`).
    pub base_url: String,
}

impl SiteConfig {
    pub fn new(name: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
        }
    }

    /// Domain root used to resolve relative links.
    ///
    /// The search URL is truncated at the first `/careers` path segment:
    /// `https://acme.avature.net/careers/SearchJobs` → `https://acme.avature.net`.
    /// Without that segment the URL's origin is used.
    pub fn base_domain(&self) -> String {
        let Ok(url) = Url::parse(&self.base_url) else {
            return self.base_url.trim_end_matches('/').to_string();
        };
        let origin = url.origin().ascii_serialization();
        match url.path().find(CAREERS_SEGMENT) {
            Some(idx) => format!("{origin}{}", &url.path()[..idx]),
            None => origin,
        }
    }
}

/// Canonical key for a structured field on a detail page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKey {
    WorkLocation,
    PostedDate,
    JobId,
    BusinessArea,
    Duration,
}

/// Field keys a detail page is allowed to contribute to a record.
pub const ALLOWED_FIELDS: &[FieldKey] = &[
    FieldKey::WorkLocation,
    FieldKey::PostedDate,
    FieldKey::JobId,
    FieldKey::BusinessArea,
    FieldKey::Duration,
];

impl FieldKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKey::WorkLocation => "work_location",
            FieldKey::PostedDate => "posted_date",
            FieldKey::JobId => "job_id",
            FieldKey::BusinessArea => "business_area",
            FieldKey::Duration => "duration",
        }
    }

    pub fn is_allowed(&self) -> bool {
        ALLOWED_FIELDS.contains(self)
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for FieldKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "work_location" => Ok(FieldKey::WorkLocation),
            "posted_date" => Ok(FieldKey::PostedDate),
            "job_id" => Ok(FieldKey::JobId),
            "business_area" => Ok(FieldKey::BusinessArea),
            "duration" => Ok(FieldKey::Duration),
            _ => Err(format!("Unknown field key: {}", s)),
        }
    }
}

/// A job link discovered on a listing page, carrying the navigation state
/// its detail request needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobLink {
    pub url: String,
    pub title: String,
    pub site_name: String,
    pub base_domain: String,
}

impl JobLink {
    pub fn context(&self) -> DetailContext {
        DetailContext {
            site_name: self.site_name.clone(),
            title: self.title.clone(),
            url: self.url.clone(),
        }
    }
}

/// What the detail extractor already knows from the listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailContext {
    pub site_name: String,
    pub title: String,
    pub url: String,
}

/// A listing page that could not be fetched.
#[derive(Debug)]
pub struct PageFailure {
    pub site_name: String,
    pub url: String,
    pub error: crate::error::AppError,
}

/// Structured fields found on a detail page. Only keys actually present on
/// the page are set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructuredFields {
    pub work_location: Option<String>,
    pub posted_date: Option<String>,
    pub job_id: Option<String>,
    pub business_area: Option<String>,
    pub duration: Option<String>,
}

impl StructuredFields {
    /// Store a value, overwriting any earlier one for the same key.
    pub fn set(&mut self, key: FieldKey, value: impl Into<String>) {
        let slot = match key {
            FieldKey::WorkLocation => &mut self.work_location,
            FieldKey::PostedDate => &mut self.posted_date,
            FieldKey::JobId => &mut self.job_id,
            FieldKey::BusinessArea => &mut self.business_area,
            FieldKey::Duration => &mut self.duration,
        };
        *slot = Some(value.into());
    }

    pub fn get(&self, key: FieldKey) -> Option<&str> {
        match key {
            FieldKey::WorkLocation => self.work_location.as_deref(),
            FieldKey::PostedDate => self.posted_date.as_deref(),
            FieldKey::JobId => self.job_id.as_deref(),
            FieldKey::BusinessArea => self.business_area.as_deref(),
            FieldKey::Duration => self.duration.as_deref(),
        }
    }

    pub fn is_empty(&self) -> bool {
        ALLOWED_FIELDS.iter().all(|key| self.get(*key).is_none())
    }
}

/// A harvested job posting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    pub job_id: String,
    pub title: String,
    pub url: String,
    /// Name of the site the posting was found on.
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub posted_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_area: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_description: Option<String>,
    pub extracted_at: DateTime<Utc>,
}

impl JobRecord {
    /// Start a record from the listing context and the id taken from its URL.
    pub fn new(ctx: &DetailContext, job_id: impl Into<String>, extracted_at: DateTime<Utc>) -> Self {
        Self {
            job_id: job_id.into(),
            title: ctx.title.clone(),
            url: ctx.url.clone(),
            source: ctx.site_name.clone(),
            work_location: None,
            posted_date: None,
            business_area: None,
            duration: None,
            job_description: None,
            extracted_at,
        }
    }

    /// Merge the structured fields that were found. A page-level `job_id`
    /// field replaces the one derived from the URL.
    pub fn with_fields(mut self, fields: StructuredFields) -> Self {
        if let Some(job_id) = fields.job_id {
            self.job_id = job_id;
        }
        if fields.work_location.is_some() {
            self.work_location = fields.work_location;
        }
        if fields.posted_date.is_some() {
            self.posted_date = fields.posted_date;
        }
        if fields.business_area.is_some() {
            self.business_area = fields.business_area;
        }
        if fields.duration.is_some() {
            self.duration = fields.duration;
        }
        self
    }

    /// Attach the description unless it is empty.
    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.job_description = description.filter(|d| !d.is_empty());
        self
    }
}
