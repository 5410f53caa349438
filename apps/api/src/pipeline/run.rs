//! One processing run for one posting: fetch → dispatch → drain → persist → rank.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::models::aggregate::PartialApplicantRecord;
use crate::models::applicant::{ApplicantId, ApplicantSet, ApplicationStatus};
use crate::models::enrichment::SourceKind;
use crate::models::ranking::ShortlistEntry;
use crate::pipeline::ports::{
    ApplicantSource, RankingClient, RankingError, RepositoryError, ResultSink,
};
use crate::pipeline::store::AggregateStore;
use crate::pipeline::{DispatchSummary, Dispatcher};
use crate::ranking::{shortlist, RankingCandidate};

#[derive(Debug, Error)]
pub enum RunError {
    #[error("job posting {0} not found")]
    PostingNotFound(Uuid),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Ranking(#[from] RankingError),
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub post_id: Uuid,
    pub job_post_title: String,
    pub applicants_processed: usize,
    pub dispatch: DispatchSummary,
    pub shortlist: Vec<ShortlistEntry>,
    pub completed_at: DateTime<Utc>,
}

impl RunReport {
    /// The result stored on a completed ranking request.
    pub fn to_document(&self) -> Value {
        json!({
            "applicants_processed": self.applicants_processed,
            "ranked_applicants": self.shortlist,
            "job_post_title": self.job_post_title,
            "ranking_completed_at": self.completed_at.to_rfc3339(),
        })
    }
}

#[derive(Debug, Clone)]
pub enum RunOutcome {
    Ranked(RunReport),
    NoApplicants,
}

/// Snapshot of the pipeline for the status endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineStatus {
    pub strategy: &'static str,
    pub running: bool,
    pub applicants_in_store: usize,
    pub pending_by_kind: BTreeMap<SourceKind, usize>,
}

pub struct RankingPipeline {
    source: Arc<dyn ApplicantSource>,
    sink: Arc<dyn ResultSink>,
    ranker: Arc<dyn RankingClient>,
    dispatcher: Arc<dyn Dispatcher>,
    store: Arc<AggregateStore>,
    top_n: usize,
    // The store is shared, so runs are serialized.
    run_guard: Mutex<()>,
}

impl RankingPipeline {
    pub fn new(
        source: Arc<dyn ApplicantSource>,
        sink: Arc<dyn ResultSink>,
        ranker: Arc<dyn RankingClient>,
        dispatcher: Arc<dyn Dispatcher>,
        top_n: usize,
    ) -> Self {
        Self {
            source,
            sink,
            ranker,
            dispatcher,
            store: Arc::new(AggregateStore::new()),
            top_n,
            run_guard: Mutex::new(()),
        }
    }

    pub fn status(&self) -> PipelineStatus {
        PipelineStatus {
            strategy: self.dispatcher.name(),
            running: self.run_guard.try_lock().is_err(),
            applicants_in_store: self.store.len(),
            pending_by_kind: self.dispatcher.pending(),
        }
    }

    pub async fn process_posting(&self, post_id: Uuid) -> Result<RunOutcome, RunError> {
        let _running = self.run_guard.lock().await;
        self.store.reset();

        let posting = self
            .source
            .fetch_job_posting(post_id)
            .await?
            .ok_or(RunError::PostingNotFound(post_id))?;

        let mut applicants = self.source.fetch_applicant_set(post_id).await?;
        dedupe_users(&mut applicants);
        if applicants.users.is_empty() {
            info!(%post_id, "no applicants for posting");
            return Ok(RunOutcome::NoApplicants);
        }

        info!(
            %post_id,
            title = %posting.title,
            applicants = applicants.users.len(),
            strategy = self.dispatcher.name(),
            "processing posting"
        );

        for user in &applicants.users {
            if let Err(e) = self
                .sink
                .mark_application_status(post_id, user.id, ApplicationStatus::UnderReview)
                .await
            {
                warn!(applicant_id = %user.id, "failed to mark application under review: {e}");
            }
        }

        let dispatch = self
            .dispatcher
            .dispatch(Arc::new(applicants), self.store.clone())
            .await;
        info!(%post_id, ?dispatch, "enrichment drained");

        let records = self.store.snapshot();
        self.persist_aggregates(post_id, &records).await;

        let candidates: Vec<RankingCandidate> = records.values().map(RankingCandidate::from).collect();
        let ranked = self.ranker.rank(&posting, &candidates).await?;
        let shortlist = shortlist(ranked, self.top_n);
        self.sink.persist_ranking_result(post_id, &shortlist).await?;

        info!(%post_id, shortlisted = shortlist.len(), "ranking stored");
        Ok(RunOutcome::Ranked(RunReport {
            post_id,
            job_post_title: posting.title,
            applicants_processed: records.len(),
            dispatch,
            shortlist,
            completed_at: Utc::now(),
        }))
    }

    /// Writes every aggregate and marks its application done. Failures are logged only.
    async fn persist_aggregates(
        &self,
        post_id: Uuid,
        records: &BTreeMap<ApplicantId, PartialApplicantRecord>,
    ) {
        let mut writes = JoinSet::new();
        for record in records.values().cloned() {
            let sink = self.sink.clone();
            writes.spawn(async move {
                let applicant_id = record.identity.id;
                if let Err(e) = sink.persist_aggregate(post_id, &record).await {
                    warn!(%applicant_id, "failed to persist aggregate: {e}");
                    return;
                }
                if let Err(e) = sink
                    .mark_application_status(post_id, applicant_id, ApplicationStatus::Done)
                    .await
                {
                    warn!(%applicant_id, "failed to mark application done: {e}");
                }
            });
        }
        while let Some(joined) = writes.join_next().await {
            if let Err(e) = joined {
                error!("aggregate write task aborted: {e}");
            }
        }
    }
}

/// Keeps the first identity per applicant id.
fn dedupe_users(applicants: &mut ApplicantSet) {
    let mut seen = HashSet::new();
    applicants.users.retain(|user| seen.insert(user.id));
}
