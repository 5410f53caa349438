//! In-memory fakes shared by the pipeline tests.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use serde_json::Value;
use uuid::Uuid;

use crate::models::aggregate::PartialApplicantRecord;
use crate::models::applicant::{
    ApplicantId, ApplicantIdentity, ApplicantSet, ApplicationRecord, ApplicationStatus,
    JobPosting, RegistrationRecord,
};
use crate::models::enrichment::{EnrichedRecord, ParsedProfile, ParsedResume, SourceKind};
use crate::models::ranking::{RankedApplicant, RankingRequestRow, RequestStatus, ShortlistEntry};
use crate::pipeline::enricher::{Enricher, EnrichmentError};
use crate::pipeline::ports::{
    ApplicantSource, CreateRequestOutcome, RankingClient, RankingError, RepositoryError,
    RequestQueue, ResultSink,
};
use crate::ranking::RankingCandidate;

// ────────────────────────────────────────────────────────────────────────────
// Enrichers
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub enum Behavior {
    Succeed,
    Fail,
    Hang,
    Panic,
    Delay(Duration),
}

pub struct StubEnricher {
    kind: SourceKind,
    behavior: Behavior,
    pub calls: AtomicUsize,
}

impl StubEnricher {
    pub fn new(kind: SourceKind, behavior: Behavior) -> Self {
        Self {
            kind,
            behavior,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn arc(kind: SourceKind, behavior: Behavior) -> Arc<dyn Enricher> {
        Arc::new(Self::new(kind, behavior))
    }

    fn record(&self, source_url: &str) -> EnrichedRecord {
        let profile = ParsedProfile {
            profile_url: source_url.to_string(),
            skills: vec!["Rust".to_string()],
            data: Value::Null,
        };
        match self.kind {
            SourceKind::Resume => EnrichedRecord::Resume(ParsedResume {
                name: "Parsed Applicant".to_string(),
                skills: vec!["Rust".to_string()],
                ..Default::default()
            }),
            SourceKind::LinkedIn => EnrichedRecord::LinkedIn(profile),
            SourceKind::GitHub => EnrichedRecord::GitHub(profile),
        }
    }
}

#[async_trait]
impl Enricher for StubEnricher {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    async fn enrich(
        &self,
        _applicant_id: ApplicantId,
        source_url: &str,
    ) -> Result<EnrichedRecord, EnrichmentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.behavior {
            Behavior::Succeed => Ok(self.record(source_url)),
            Behavior::Fail => Err(EnrichmentError::Fetch(format!("{source_url} unreachable"))),
            Behavior::Hang => std::future::pending().await,
            Behavior::Panic => panic!("{:?} enricher crashed on {source_url}", self.kind),
            Behavior::Delay(delay) => {
                tokio::time::sleep(delay).await;
                Ok(self.record(source_url))
            }
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Applicant fixtures
// ────────────────────────────────────────────────────────────────────────────

pub type SourceRow<'a> = (Option<&'a str>, Option<&'a str>, Option<&'a str>);

/// One applicant per row, each with a registration carrying the row's
/// (resume, linkedin, github) URLs. All applicants share one posting.
pub fn applicant_set(rows: &[SourceRow<'_>]) -> ApplicantSet {
    let post_id = Uuid::new_v4();
    let mut set = ApplicantSet::default();
    for (idx, (resume, linkedin, github)) in rows.iter().enumerate() {
        let id = Uuid::new_v4();
        set.users.push(ApplicantIdentity {
            id,
            name: format!("Applicant {idx}"),
            post_id,
        });
        set.registrations.push(RegistrationRecord {
            id: Uuid::new_v4(),
            owner: Some(id),
            resume: resume.map(String::from),
            linkedin: linkedin.map(String::from),
            github: github.map(String::from),
            skills: Some(vec!["Rust".to_string()]),
            ..Default::default()
        });
        set.applications.push(ApplicationRecord {
            id: Uuid::new_v4(),
            post_id,
            user_id: Some(id),
            application_type: Some("job".to_string()),
            ..Default::default()
        });
    }
    set
}

/// Applicant 1 has only a registration resume; applicant 2 only a GitHub profile.
/// Returns the set plus (resume-only id, profile-only id).
pub fn profile_only_and_resume_only() -> (ApplicantSet, ApplicantId, ApplicantId) {
    let set = applicant_set(&[
        (Some("https://cdn.example.com/resume.pdf"), None, None),
        (None, None, Some("https://github.com/applicant-two")),
    ]);
    let resume_only = set.users[0].id;
    let profile_only = set.users[1].id;
    (set, resume_only, profile_only)
}

pub fn posting_for(set: &ApplicantSet) -> JobPosting {
    JobPosting {
        id: set.users.first().map(|u| u.post_id).unwrap_or_else(Uuid::new_v4),
        title: "Platform Engineer".to_string(),
        description: Some("Distributed systems in Rust".to_string()),
        details: None,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Repository
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct RepoState {
    postings: BTreeMap<Uuid, JobPosting>,
    applicants: BTreeMap<Uuid, ApplicantSet>,
    aggregates: Vec<(Uuid, PartialApplicantRecord)>,
    rankings: Vec<(Uuid, Vec<ShortlistEntry>)>,
    statuses: Vec<(ApplicantId, ApplicationStatus)>,
    requests: Vec<RankingRequestRow>,
}

/// Implements every repository port over plain collections.
#[derive(Default)]
pub struct InMemoryRepository {
    state: Mutex<RepoState>,
    fail_rankings: bool,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_posting(self, posting: JobPosting, applicants: ApplicantSet) -> Self {
        {
            let mut state = self.state.lock();
            state.applicants.insert(posting.id, applicants);
            state.postings.insert(posting.id, posting);
        }
        self
    }

    pub fn failing_rankings(mut self) -> Self {
        self.fail_rankings = true;
        self
    }

    pub fn aggregates(&self) -> Vec<(Uuid, PartialApplicantRecord)> {
        self.state.lock().aggregates.clone()
    }

    pub fn rankings(&self) -> Vec<(Uuid, Vec<ShortlistEntry>)> {
        self.state.lock().rankings.clone()
    }

    pub fn statuses(&self) -> Vec<(ApplicantId, ApplicationStatus)> {
        self.state.lock().statuses.clone()
    }

    pub fn request(&self, post_id: Uuid) -> Option<RankingRequestRow> {
        self.state
            .lock()
            .requests
            .iter()
            .find(|r| r.post_id == post_id)
            .cloned()
    }
}

#[async_trait]
impl ApplicantSource for InMemoryRepository {
    async fn fetch_job_posting(&self, post_id: Uuid) -> Result<Option<JobPosting>, RepositoryError> {
        Ok(self.state.lock().postings.get(&post_id).cloned())
    }

    async fn fetch_applicant_set(&self, post_id: Uuid) -> Result<ApplicantSet, RepositoryError> {
        Ok(self
            .state
            .lock()
            .applicants
            .get(&post_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl ResultSink for InMemoryRepository {
    async fn persist_aggregate(
        &self,
        post_id: Uuid,
        record: &PartialApplicantRecord,
    ) -> Result<(), RepositoryError> {
        self.state.lock().aggregates.push((post_id, record.clone()));
        Ok(())
    }

    async fn persist_ranking_result(
        &self,
        post_id: Uuid,
        shortlist: &[ShortlistEntry],
    ) -> Result<(), RepositoryError> {
        if self.fail_rankings {
            return Err(RepositoryError::Unavailable("ranking table offline".to_string()));
        }
        self.state.lock().rankings.push((post_id, shortlist.to_vec()));
        Ok(())
    }

    async fn mark_application_status(
        &self,
        _post_id: Uuid,
        applicant_id: ApplicantId,
        status: ApplicationStatus,
    ) -> Result<(), RepositoryError> {
        self.state.lock().statuses.push((applicant_id, status));
        Ok(())
    }
}

#[async_trait]
impl RequestQueue for InMemoryRepository {
    async fn pending_requests(&self) -> Result<Vec<RankingRequestRow>, RepositoryError> {
        let mut pending: Vec<_> = self
            .state
            .lock()
            .requests
            .iter()
            .filter(|r| r.status.as_deref().map_or(true, |s| s == RequestStatus::Pending.as_str()))
            .cloned()
            .collect();
        pending.sort_by_key(|r| r.created_at);
        Ok(pending)
    }

    async fn update_request_status(
        &self,
        post_id: Uuid,
        status: RequestStatus,
        result: Option<Value>,
    ) -> Result<(), RepositoryError> {
        let mut state = self.state.lock();
        if let Some(row) = state.requests.iter_mut().find(|r| r.post_id == post_id) {
            row.status = Some(status.as_str().to_string());
            if result.is_some() {
                row.result = result;
            }
            if matches!(status, RequestStatus::Completed | RequestStatus::Failed) {
                row.processed_at = Some(Utc::now());
            }
        }
        Ok(())
    }

    async fn create_request(
        &self,
        post_id: Uuid,
        requested_via: &str,
    ) -> Result<CreateRequestOutcome, RepositoryError> {
        let mut state = self.state.lock();
        if let Some(row) = state.requests.iter().find(|r| r.post_id == post_id) {
            return Ok(CreateRequestOutcome::Existing {
                request_id: row.id,
                status: row.status.clone(),
            });
        }
        let request_id = Uuid::new_v4();
        state.requests.push(RankingRequestRow {
            id: request_id,
            post_id,
            status: Some(RequestStatus::Pending.as_str().to_string()),
            result: None,
            requested_via: Some(requested_via.to_string()),
            created_at: Utc::now(),
            processed_at: None,
        });
        Ok(CreateRequestOutcome::Created { request_id })
    }

    async fn find_request(
        &self,
        post_id: Uuid,
    ) -> Result<Option<RankingRequestRow>, RepositoryError> {
        Ok(self.request(post_id))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Ranker
// ────────────────────────────────────────────────────────────────────────────

/// Scores each candidate by its position in the input (first gets the lowest score),
/// or fails every call.
pub struct StubRanker {
    pub fail: bool,
    pub seen: Mutex<Vec<RankingCandidate>>,
}

impl StubRanker {
    pub fn ok() -> Self {
        Self {
            fail: false,
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            seen: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl RankingClient for StubRanker {
    async fn rank(
        &self,
        _posting: &JobPosting,
        candidates: &[RankingCandidate],
    ) -> Result<Vec<RankedApplicant>, RankingError> {
        self.seen.lock().extend(candidates.iter().cloned());
        if self.fail {
            return Err(RankingError::Llm("model offline".to_string()));
        }
        Ok(candidates
            .iter()
            .enumerate()
            .map(|(idx, c)| RankedApplicant {
                applicant_id: c.applicant_id.clone(),
                applicant_name: c.applicant_name.clone(),
                score: idx as f64,
                note: format!("evaluated {}", c.applicant_name),
                key_strengths: vec![],
                development_areas: vec![],
                hiring_recommendation: "Consider".to_string(),
            })
            .collect())
    }
}
