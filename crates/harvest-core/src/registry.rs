//! Site registry: the list of career sites to crawl, loaded from YAML.
//!
//! ```yaml
//! avature_sites:
//!   - name: Acme
//!     base_url: https://acme.avature.net/careers/SearchJobs
//! ```

use std::path::Path;

use serde::Deserialize;
use url::Url;

use crate::error::AppError;
use crate::models::SiteConfig;

/// Default location of the site list, relative to the working directory.
pub const DEFAULT_SITES_PATH: &str = "config/avature_sites.yaml";

#[derive(Debug, Deserialize)]
struct RegistryFile {
    avature_sites: Vec<SiteConfig>,
}

/// Validated, immutable list of crawl targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteRegistry {
    sites: Vec<SiteConfig>,
}

impl SiteRegistry {
    /// Load and validate the registry file at `path`.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AppError::ConfigError(format!("Failed to read {}: {e}", path.display()))
        })?;
        Self::from_yaml(&raw)
    }

    pub fn from_yaml(raw: &str) -> Result<Self, AppError> {
        let file: RegistryFile = serde_yaml::from_str(raw)
            .map_err(|e| AppError::ConfigError(format!("Invalid site registry: {e}")))?;
        Self::from_sites(file.avature_sites)
    }

    pub fn from_sites(sites: Vec<SiteConfig>) -> Result<Self, AppError> {
        for site in &sites {
            validate_site(site)?;
        }
        Ok(Self { sites })
    }

    pub fn sites(&self) -> &[SiteConfig] {
        &self.sites
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    /// Keep only the sites whose name is in `names` (case-insensitive).
    /// Unknown names are an error.
    pub fn select(&self, names: &[String]) -> Result<Self, AppError> {
        if names.is_empty() {
            return Ok(self.clone());
        }
        if let Some(unknown) = names
            .iter()
            .find(|name| !self.sites.iter().any(|s| s.name.eq_ignore_ascii_case(name)))
        {
            return Err(AppError::ConfigError(format!("Unknown site: {unknown}")));
        }
        let sites = self
            .sites
            .iter()
            .filter(|s| names.iter().any(|name| s.name.eq_ignore_ascii_case(name)))
            .cloned()
            .collect();
        Ok(Self { sites })
    }
}

fn validate_site(site: &SiteConfig) -> Result<(), AppError> {
    if site.name.trim().is_empty() {
        return Err(AppError::ConfigError(format!(
            "Site with base_url {} has no name",
            site.base_url
        )));
    }
    let url = Url::parse(&site.base_url).map_err(|e| {
        AppError::ConfigError(format!("Site {} has an invalid base_url: {e}", site.name))
    })?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(AppError::ConfigError(format!(
            "Site {} uses unsupported scheme '{scheme}'",
            site.name
        ))),
    }
}
