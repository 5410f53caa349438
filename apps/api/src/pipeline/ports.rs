//! Interfaces to the collaborators the pipeline depends on but does not own:
//! the system of record, result persistence, the ranking request table and the
//! ranking model.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::models::aggregate::PartialApplicantRecord;
use crate::models::applicant::{ApplicantId, ApplicantSet, ApplicationStatus, JobPosting};
use crate::models::ranking::{RankedApplicant, RankingRequestRow, RequestStatus, ShortlistEntry};
use crate::ranking::RankingCandidate;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum RankingError {
    #[error("ranking model call failed: {0}")]
    Llm(String),

    #[error("ranking model returned an unusable response: {0}")]
    InvalidResponse(String),
}

/// Read side of the system of record.
#[async_trait]
pub trait ApplicantSource: Send + Sync {
    async fn fetch_job_posting(&self, post_id: Uuid) -> Result<Option<JobPosting>, RepositoryError>;

    async fn fetch_applicant_set(&self, post_id: Uuid) -> Result<ApplicantSet, RepositoryError>;
}

/// Where finished aggregates and shortlists go.
#[async_trait]
pub trait ResultSink: Send + Sync {
    async fn persist_aggregate(
        &self,
        post_id: Uuid,
        record: &PartialApplicantRecord,
    ) -> Result<(), RepositoryError>;

    async fn persist_ranking_result(
        &self,
        post_id: Uuid,
        shortlist: &[ShortlistEntry],
    ) -> Result<(), RepositoryError>;

    async fn mark_application_status(
        &self,
        post_id: Uuid,
        applicant_id: ApplicantId,
        status: ApplicationStatus,
    ) -> Result<(), RepositoryError>;
}

/// Outcome of asking for a ranking of a posting.
#[derive(Debug, Clone, PartialEq)]
pub enum CreateRequestOutcome {
    Created { request_id: Uuid },
    Existing { request_id: Uuid, status: Option<String> },
}

/// The `ranking_requests` table the listener polls.
#[async_trait]
pub trait RequestQueue: Send + Sync {
    /// Pending (or status-less) requests, oldest first.
    async fn pending_requests(&self) -> Result<Vec<RankingRequestRow>, RepositoryError>;

    async fn update_request_status(
        &self,
        post_id: Uuid,
        status: RequestStatus,
        result: Option<Value>,
    ) -> Result<(), RepositoryError>;

    async fn create_request(
        &self,
        post_id: Uuid,
        requested_via: &str,
    ) -> Result<CreateRequestOutcome, RepositoryError>;

    async fn find_request(&self, post_id: Uuid)
        -> Result<Option<RankingRequestRow>, RepositoryError>;
}

/// Scores applicants against a posting. Order of the returned list is not trusted;
/// callers sort by score.
#[async_trait]
pub trait RankingClient: Send + Sync {
    async fn rank(
        &self,
        posting: &JobPosting,
        candidates: &[RankingCandidate],
    ) -> Result<Vec<RankedApplicant>, RankingError>;
}
