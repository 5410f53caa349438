//! Concrete enrichers: resume download + parse, and hosted-profile scrapers.

pub mod profile;
pub mod prompts;
pub mod resume;

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tracing::{info, warn};

use crate::config::ScraperConfig;
use crate::llm_client::TextModel;
use crate::pipeline::enricher::{EnricherSet, EnrichmentError};

use profile::{ProfileSite, RemoteProfileEnricher};
use resume::ResumeEnricher;

/// One HTTP client shared by every enricher. `timeout` is the per-call bound.
pub fn http_client(timeout: Duration) -> Result<Client, EnrichmentError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| EnrichmentError::Fetch(e.to_string()))
}

/// Registers the resume enricher plus every profile scraper with a configured endpoint.
pub fn build_enrichers(
    http: Client,
    model: Arc<dyn TextModel>,
    scrapers: &ScraperConfig,
) -> EnricherSet {
    let mut set = EnricherSet::new().with(Arc::new(ResumeEnricher::new(http.clone(), model)));

    match &scrapers.linkedin_url {
        Some(endpoint) => {
            set = set.with(Arc::new(RemoteProfileEnricher::new(
                http.clone(),
                ProfileSite::LinkedIn,
                endpoint.clone(),
                scrapers.linkedin_credentials.clone(),
            )));
        }
        None => warn!("LINKEDIN_SCRAPER_URL not set, LinkedIn enrichment disabled"),
    }
    match &scrapers.github_url {
        Some(endpoint) => {
            set = set.with(Arc::new(RemoteProfileEnricher::new(
                http,
                ProfileSite::GitHub,
                endpoint.clone(),
                None,
            )));
        }
        None => warn!("GITHUB_SCRAPER_URL not set, GitHub enrichment disabled"),
    }

    info!(kinds = ?set.kinds(), "enrichers registered");
    set
}
