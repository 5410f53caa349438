//! Strategy A: one bounded pool of applicant tasks.
//!
//! Each applicant task launches its (up to three) enrichments as separate tasks,
//! joins them, and publishes the finished record with a single store write.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::models::applicant::{ApplicantIdentity, ApplicantSet};
use crate::models::enrichment::{EnrichedRecord, SourceKind};
use crate::pipeline::collector::{collect, EnrichmentRequest};
use crate::pipeline::enricher::{enrich_isolated, EnricherSet};
use crate::pipeline::store::AggregateStore;
use crate::pipeline::{DispatchSummary, Dispatcher};

pub struct PerApplicantDispatcher {
    enrichers: EnricherSet,
    max_workers: usize,
    source_timeout: Duration,
}

impl PerApplicantDispatcher {
    pub fn new(enrichers: EnricherSet, max_workers: usize, source_timeout: Duration) -> Self {
        Self {
            enrichers,
            max_workers: max_workers.max(1),
            source_timeout,
        }
    }

    /// min(configured max, applicant count), never zero.
    pub fn pool_size(&self, applicants: usize) -> usize {
        self.max_workers.min(applicants).max(1)
    }
}

#[async_trait]
impl Dispatcher for PerApplicantDispatcher {
    fn name(&self) -> &'static str {
        "per_applicant"
    }

    async fn dispatch(
        &self,
        applicants: Arc<ApplicantSet>,
        store: Arc<AggregateStore>,
    ) -> DispatchSummary {
        let pool = self.pool_size(applicants.users.len());
        info!(
            applicants = applicants.users.len(),
            pool, "dispatching enrichment per applicant"
        );

        let permits = Arc::new(Semaphore::new(pool));
        let mut tasks = JoinSet::new();

        for identity in applicants.users.iter().cloned() {
            let permits = permits.clone();
            let applicants = applicants.clone();
            let store = store.clone();
            let enrichers = self.enrichers.clone();
            let timeout = self.source_timeout;

            tasks.spawn(async move {
                // The semaphore is never closed, so acquisition only fails on shutdown.
                let Ok(_permit) = permits.acquire_owned().await else {
                    return DispatchSummary::default();
                };
                process_applicant(identity, &applicants, &store, &enrichers, timeout).await
            });
        }

        let mut summary = DispatchSummary::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => summary.merge(outcome),
                Err(e) => error!("applicant task aborted: {e}"),
            }
        }
        summary
    }
}

async fn process_applicant(
    identity: ApplicantIdentity,
    applicants: &ApplicantSet,
    store: &AggregateStore,
    enrichers: &EnricherSet,
    timeout: Duration,
) -> DispatchSummary {
    let collected = match collect(&identity, &applicants.applications, &applicants.registrations)
    {
        Ok(collected) => collected,
        Err(e) => {
            warn!("skipping applicant: {e}");
            return DispatchSummary {
                skipped: 1,
                ..Default::default()
            };
        }
    };

    let (resume, linkedin, github) = tokio::join!(
        enrich_slot(enrichers, collected.request(SourceKind::Resume), timeout),
        enrich_slot(enrichers, collected.request(SourceKind::LinkedIn), timeout),
        enrich_slot(enrichers, collected.request(SourceKind::GitHub), timeout),
    );

    let mut record = collected.shell();
    let mut failures = 0;
    for slot in [resume, linkedin, github].into_iter().flatten() {
        match slot {
            Some(value) => {
                if let Err(rejected) = record.fill(value) {
                    warn!(applicant_id = %identity.id, "discarding enrichment result: {rejected:?}");
                }
            }
            None => failures += 1,
        }
    }

    store.upsert_shell(record);
    info!(applicant_id = %identity.id, "applicant processed");

    DispatchSummary {
        resolved: 1,
        skipped: 0,
        requests_issued: collected.requests.len(),
        enrichment_failures: failures,
    }
}

/// `None` when nothing was scheduled for the slot, `Some(None)` when it failed.
async fn enrich_slot(
    enrichers: &EnricherSet,
    request: Option<&EnrichmentRequest>,
    timeout: Duration,
) -> Option<Option<EnrichedRecord>> {
    let request = request?.clone();
    Some(enrich_isolated(enrichers.clone(), request, timeout).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::testing::{
        applicant_set, profile_only_and_resume_only, Behavior, StubEnricher,
    };

    fn all_succeeding() -> EnricherSet {
        EnricherSet::new()
            .with(StubEnricher::arc(SourceKind::Resume, Behavior::Succeed))
            .with(StubEnricher::arc(SourceKind::LinkedIn, Behavior::Succeed))
            .with(StubEnricher::arc(SourceKind::GitHub, Behavior::Succeed))
    }

    #[test]
    fn test_pool_size_is_clamped() {
        let dispatcher =
            PerApplicantDispatcher::new(EnricherSet::new(), 10, Duration::from_secs(1));
        assert_eq!(dispatcher.pool_size(3), 3);
        assert_eq!(dispatcher.pool_size(50), 10);
        assert_eq!(dispatcher.pool_size(0), 1);
    }

    #[tokio::test]
    async fn test_slots_follow_available_sources() {
        let (set, resume_only, profile_only) = profile_only_and_resume_only();
        let store = Arc::new(AggregateStore::new());
        let dispatcher = PerApplicantDispatcher::new(all_succeeding(), 4, Duration::from_secs(5));

        let summary = dispatcher.dispatch(Arc::new(set), store.clone()).await;
        assert_eq!(summary.resolved, 2);
        assert_eq!(summary.requests_issued, 2);
        assert_eq!(summary.enrichment_failures, 0);

        let snapshot = store.snapshot();
        assert_eq!(snapshot.len(), 2);
        let first = &snapshot[&resume_only];
        assert!(first.resume_info.is_some());
        assert!(first.linkedin_info.is_none() && first.github_info.is_none());
        let second = &snapshot[&profile_only];
        assert!(second.resume_info.is_none());
        assert!(second.github_info.is_some());
    }

    #[tokio::test]
    async fn test_failing_source_leaves_only_its_slot_empty() {
        let set = applicant_set(&[
            (Some("https://cdn.example.com/a.pdf"), Some("https://linkedin.com/in/a"), Some("https://github.com/a")),
            (Some("https://cdn.example.com/b.pdf"), None, Some("https://github.com/b")),
        ]);
        let enrichers = EnricherSet::new()
            .with(StubEnricher::arc(SourceKind::Resume, Behavior::Succeed))
            .with(StubEnricher::arc(SourceKind::LinkedIn, Behavior::Succeed))
            .with(StubEnricher::arc(SourceKind::GitHub, Behavior::Fail));
        let store = Arc::new(AggregateStore::new());
        let dispatcher = PerApplicantDispatcher::new(enrichers, 2, Duration::from_secs(5));

        let summary = dispatcher.dispatch(Arc::new(set), store.clone()).await;
        assert_eq!(summary.enrichment_failures, 2);

        for record in store.snapshot().values() {
            assert!(record.github_info.is_none());
            assert!(record.requested.contains(&SourceKind::GitHub));
            assert!(record.resume_info.is_some());
            assert_eq!(
                record.linkedin_info.is_some(),
                record.requested.contains(&SourceKind::LinkedIn)
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_source_does_not_block_the_run() {
        let set = applicant_set(&[
            (Some("https://cdn.example.com/a.pdf"), None, Some("https://github.com/a")),
            (None, None, Some("https://github.com/b")),
        ]);
        let enrichers = EnricherSet::new()
            .with(StubEnricher::arc(SourceKind::Resume, Behavior::Hang))
            .with(StubEnricher::arc(SourceKind::GitHub, Behavior::Succeed));
        let store = Arc::new(AggregateStore::new());
        let dispatcher = PerApplicantDispatcher::new(enrichers, 1, Duration::from_secs(10));

        let summary = dispatcher.dispatch(Arc::new(set), store.clone()).await;
        assert_eq!(summary.resolved, 2);
        assert_eq!(summary.enrichment_failures, 1);
        let snapshot = store.snapshot();
        assert!(snapshot.values().all(|r| r.github_info.is_some()));
        assert!(snapshot.values().all(|r| r.resume_info.is_none()));
    }

    #[tokio::test]
    async fn test_panicking_source_keeps_sibling_results() {
        let set = applicant_set(&[(
            Some("https://cdn.example.com/a.pdf"),
            None,
            Some("https://github.com/a"),
        )]);
        let enrichers = EnricherSet::new()
            .with(StubEnricher::arc(SourceKind::Resume, Behavior::Panic))
            .with(StubEnricher::arc(SourceKind::GitHub, Behavior::Succeed));
        let store = Arc::new(AggregateStore::new());
        let dispatcher = PerApplicantDispatcher::new(enrichers, 2, Duration::from_secs(5));

        let summary = dispatcher.dispatch(Arc::new(set), store.clone()).await;
        assert_eq!(summary.resolved, 1);
        assert_eq!(summary.enrichment_failures, 1);
        assert_eq!(store.len(), 1);
        let snapshot = store.snapshot();
        let record = snapshot.values().next().unwrap();
        assert!(record.resume_info.is_none());
        assert!(record.github_info.is_some());
    }

    #[tokio::test]
    async fn test_every_resolvable_applicant_appears_once() {
        let mut set = applicant_set(&[
            (None, None, None),
            (Some("https://cdn.example.com/c.pdf"), None, None),
            (None, Some("https://linkedin.com/in/d"), None),
        ]);
        set.users.push(ApplicantIdentity {
            id: uuid::Uuid::nil(),
            name: "Unresolvable".to_string(),
            post_id: uuid::Uuid::new_v4(),
        });
        let store = Arc::new(AggregateStore::new());
        let dispatcher = PerApplicantDispatcher::new(all_succeeding(), 8, Duration::from_secs(5));

        let summary = dispatcher.dispatch(Arc::new(set), store.clone()).await;
        assert_eq!(summary.resolved, 3);
        assert_eq!(summary.skipped, 1);
        assert_eq!(store.len(), 3);
        for record in store.snapshot().values() {
            assert!(record.filled_kinds().is_subset(&record.requested));
        }
    }
}
