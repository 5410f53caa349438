//! Enricher abstraction: one implementation per source kind, looked up through an
//! [`EnricherSet`]. Every call goes through [`run_enrichment`], which bounds it with a
//! timeout.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::models::applicant::ApplicantId;
use crate::models::enrichment::{EnrichedRecord, SourceKind};
use crate::pipeline::collector::EnrichmentRequest;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum EnrichmentError {
    #[error("fetch failed: {0}")]
    Fetch(String),

    #[error("parse failed: {0}")]
    Parse(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("no enricher configured for {0}")]
    Unavailable(SourceKind),

    #[error("enricher returned a {returned} result for a {requested} request")]
    KindMismatch {
        requested: SourceKind,
        returned: SourceKind,
    },
}

/// Fetch-and-parse for one source kind. Implementations are external collaborators
/// (document parser, profile scrapers) and may be slow or fail.
#[async_trait]
pub trait Enricher: Send + Sync {
    fn kind(&self) -> SourceKind;

    async fn enrich(
        &self,
        applicant_id: ApplicantId,
        source_url: &str,
    ) -> Result<EnrichedRecord, EnrichmentError>;
}

/// Registry of enrichers keyed by the kind they serve.
#[derive(Clone, Default)]
pub struct EnricherSet {
    enrichers: HashMap<SourceKind, Arc<dyn Enricher>>,
}

impl EnricherSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `enricher` under its own kind, replacing any previous one.
    pub fn with(mut self, enricher: Arc<dyn Enricher>) -> Self {
        self.enrichers.insert(enricher.kind(), enricher);
        self
    }

    pub fn get(&self, kind: SourceKind) -> Option<&Arc<dyn Enricher>> {
        self.enrichers.get(&kind)
    }

    pub fn kinds(&self) -> Vec<SourceKind> {
        let mut kinds: Vec<_> = self.enrichers.keys().copied().collect();
        kinds.sort();
        kinds
    }
}

/// Runs one request against its enricher under `timeout`.
pub async fn run_enrichment(
    enrichers: &EnricherSet,
    request: &EnrichmentRequest,
    timeout: Duration,
) -> Result<EnrichedRecord, EnrichmentError> {
    let enricher = enrichers
        .get(request.kind)
        .ok_or(EnrichmentError::Unavailable(request.kind))?;

    let record = tokio::time::timeout(
        timeout,
        enricher.enrich(request.applicant_id, &request.source_url),
    )
    .await
    .map_err(|_| EnrichmentError::Timeout(timeout))??;

    if record.kind() != request.kind {
        return Err(EnrichmentError::KindMismatch {
            requested: request.kind,
            returned: record.kind(),
        });
    }
    Ok(record)
}

/// Runs one request on its own task. A panicking enricher loses only this slot.
pub async fn enrich_isolated(
    enrichers: EnricherSet,
    request: EnrichmentRequest,
    timeout: Duration,
) -> Option<EnrichedRecord> {
    let task_request = request.clone();
    let handle = tokio::spawn(async move {
        let result = run_enrichment(&enrichers, &task_request, timeout).await;
        settle(&task_request, result)
    });
    match handle.await {
        Ok(slot) => slot,
        Err(e) => {
            error!(
                applicant_id = %request.applicant_id,
                kind = %request.kind,
                "enrichment task aborted: {e}"
            );
            None
        }
    }
}

/// Worker-boundary conversion: a failure becomes `None` plus a logged reason.
pub fn settle(
    request: &EnrichmentRequest,
    result: Result<EnrichedRecord, EnrichmentError>,
) -> Option<EnrichedRecord> {
    match result {
        Ok(record) => {
            info!(
                applicant_id = %request.applicant_id,
                kind = %request.kind,
                "enrichment completed"
            );
            Some(record)
        }
        Err(err) => {
            warn!(
                applicant_id = %request.applicant_id,
                kind = %request.kind,
                url = %request.source_url,
                "enrichment failed: {err}"
            );
            None
        }
    }
}
