//! Hosted-profile enrichment through a remote scraper service.
//!
//! The scraper receives `{applicant_id, profile_url, credentials?}` and answers with
//! the scraped profile as JSON. Its payload is kept verbatim; only `skills` is lifted out.

use std::fmt;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::models::applicant::ApplicantId;
use crate::models::enrichment::{EnrichedRecord, ParsedProfile, SourceKind};
use crate::pipeline::enricher::{Enricher, EnrichmentError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileSite {
    LinkedIn,
    GitHub,
}

impl ProfileSite {
    pub fn kind(&self) -> SourceKind {
        match self {
            ProfileSite::LinkedIn => SourceKind::LinkedIn,
            ProfileSite::GitHub => SourceKind::GitHub,
        }
    }

    fn host(&self) -> &'static str {
        match self {
            ProfileSite::LinkedIn => "linkedin.com",
            ProfileSite::GitHub => "github.com",
        }
    }

    pub fn accepts(&self, url: &str) -> bool {
        url.to_ascii_lowercase().contains(self.host())
    }
}

/// Login forwarded to scrapers that need one.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScraperCredentials {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for ScraperCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScraperCredentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct ScrapeRequest<'a> {
    applicant_id: ApplicantId,
    profile_url: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    credentials: Option<&'a ScraperCredentials>,
}

/// Builds the profile from a scraper payload. An `error` field in the payload is a
/// failed scrape.
pub fn profile_from_payload(profile_url: &str, payload: Value) -> Result<ParsedProfile, EnrichmentError> {
    if let Some(error) = payload.get("error").filter(|e| !e.is_null()) {
        let message = error.as_str().map(String::from).unwrap_or_else(|| error.to_string());
        return Err(EnrichmentError::Fetch(message));
    }
    if !payload.is_object() {
        return Err(EnrichmentError::Parse("scraper payload is not an object".to_string()));
    }
    let skills = payload
        .get("skills")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default();
    Ok(ParsedProfile {
        profile_url: profile_url.to_string(),
        skills,
        data: payload,
    })
}

pub struct RemoteProfileEnricher {
    http: Client,
    site: ProfileSite,
    endpoint: String,
    credentials: Option<ScraperCredentials>,
}

impl RemoteProfileEnricher {
    pub fn new(
        http: Client,
        site: ProfileSite,
        endpoint: String,
        credentials: Option<ScraperCredentials>,
    ) -> Self {
        Self {
            http,
            site,
            endpoint,
            credentials,
        }
    }
}

#[async_trait]
impl Enricher for RemoteProfileEnricher {
    fn kind(&self) -> SourceKind {
        self.site.kind()
    }

    async fn enrich(
        &self,
        applicant_id: ApplicantId,
        source_url: &str,
    ) -> Result<EnrichedRecord, EnrichmentError> {
        let profile_url = source_url.trim();
        if !self.site.accepts(profile_url) {
            return Err(EnrichmentError::Fetch(format!(
                "'{profile_url}' is not a {} profile URL",
                self.site.kind()
            )));
        }

        let payload: Value = self
            .http
            .post(&self.endpoint)
            .json(&ScrapeRequest {
                applicant_id,
                profile_url,
                credentials: self.credentials.as_ref(),
            })
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| EnrichmentError::Fetch(e.to_string()))?
            .json()
            .await
            .map_err(|e| EnrichmentError::Parse(e.to_string()))?;
        debug!(%applicant_id, kind = %self.site.kind(), "profile scraped");

        let profile = profile_from_payload(profile_url, payload)?;
        Ok(match self.site {
            ProfileSite::LinkedIn => EnrichedRecord::LinkedIn(profile),
            ProfileSite::GitHub => EnrichedRecord::GitHub(profile),
        })
    }
}
