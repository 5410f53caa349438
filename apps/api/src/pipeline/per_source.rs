//! Strategy B: per-kind worker pools fed by per-kind queues.
//!
//! Order of a dispatch:
//! 1. open one queue per kind and start that kind's workers
//! 2. a bounded resolution pool collects each applicant, writes its shell record,
//!    then enqueues one request per available source
//! 3. once resolution joins, every queue is closed
//! 4. workers drain their queue and exit on closure; the dispatch joins them and
//!    checks that each queue accounted for every request it accepted
//!
//! The shell is written before any enqueue so a worker can never complete against an
//! absent key.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::models::applicant::{ApplicantIdentity, ApplicantSet};
use crate::models::enrichment::SourceKind;
use crate::pipeline::collector::collect;
use crate::pipeline::enricher::{enrich_isolated, EnricherSet};
use crate::pipeline::queue::{Dequeued, QueueError, WorkQueue};
use crate::pipeline::store::{AggregateStore, WriteOutcome};
use crate::pipeline::{DispatchSummary, Dispatcher};

/// Workers per source kind. Each count is at least one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerCounts {
    pub resume: usize,
    pub linkedin: usize,
    pub github: usize,
}

impl Default for WorkerCounts {
    fn default() -> Self {
        Self {
            resume: 3,
            linkedin: 3,
            github: 3,
        }
    }
}

impl WorkerCounts {
    pub fn for_kind(&self, kind: SourceKind) -> usize {
        let count = match kind {
            SourceKind::Resume => self.resume,
            SourceKind::LinkedIn => self.linkedin,
            SourceKind::GitHub => self.github,
        };
        count.max(1)
    }
}

pub struct PerSourceDispatcher {
    enrichers: EnricherSet,
    resolution_workers: usize,
    workers: WorkerCounts,
    source_timeout: Duration,
    idle_timeout: Duration,
    active: RwLock<Vec<Arc<WorkQueue>>>,
}

impl PerSourceDispatcher {
    pub fn new(
        enrichers: EnricherSet,
        resolution_workers: usize,
        workers: WorkerCounts,
        source_timeout: Duration,
        idle_timeout: Duration,
    ) -> Self {
        Self {
            enrichers,
            resolution_workers: resolution_workers.max(1),
            workers,
            source_timeout,
            idle_timeout,
            active: RwLock::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Dispatcher for PerSourceDispatcher {
    fn name(&self) -> &'static str {
        "per_source"
    }

    async fn dispatch(
        &self,
        applicants: Arc<ApplicantSet>,
        store: Arc<AggregateStore>,
    ) -> DispatchSummary {
        let queues: BTreeMap<SourceKind, Arc<WorkQueue>> = SourceKind::ALL
            .into_iter()
            .map(|kind| (kind, Arc::new(WorkQueue::new(kind))))
            .collect();
        *self.active.write() = queues.values().cloned().collect();

        let mut workers = JoinSet::new();
        for (kind, queue) in &queues {
            for worker_id in 0..self.workers.for_kind(*kind) {
                workers.spawn(source_worker(
                    worker_id,
                    queue.clone(),
                    self.enrichers.clone(),
                    store.clone(),
                    self.source_timeout,
                    self.idle_timeout,
                ));
            }
        }

        let pool = self.resolution_workers.min(applicants.users.len()).max(1);
        info!(
            applicants = applicants.users.len(),
            pool,
            resume_workers = self.workers.for_kind(SourceKind::Resume),
            linkedin_workers = self.workers.for_kind(SourceKind::LinkedIn),
            github_workers = self.workers.for_kind(SourceKind::GitHub),
            "dispatching enrichment per source kind"
        );

        let permits = Arc::new(Semaphore::new(pool));
        let mut resolvers = JoinSet::new();
        for identity in applicants.users.iter().cloned() {
            let permits = permits.clone();
            let applicants = applicants.clone();
            let store = store.clone();
            let queues = queues.clone();
            resolvers.spawn(async move {
                let Ok(_permit) = permits.acquire_owned().await else {
                    return DispatchSummary::default();
                };
                resolve_and_enqueue(identity, &applicants, &store, &queues)
            });
        }

        let mut summary = DispatchSummary::default();
        while let Some(joined) = resolvers.join_next().await {
            match joined {
                Ok(outcome) => summary.merge(outcome),
                Err(e) => error!("resolution task aborted: {e}"),
            }
        }

        info!("applicant resolution complete, closing source queues");
        for queue in queues.values() {
            queue.close();
        }

        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(failures) => summary.enrichment_failures += failures,
                Err(e) => error!("source worker aborted: {e}"),
            }
        }

        for queue in queues.values() {
            if queue.is_drained() {
                info!(kind = %queue.kind(), processed = queue.enqueued(), "source queue drained");
            } else {
                error!(
                    kind = %queue.kind(),
                    pending = queue.pending(),
                    "source queue finished with unprocessed requests"
                );
            }
        }
        summary
    }

    fn pending(&self) -> BTreeMap<SourceKind, usize> {
        self.active
            .read()
            .iter()
            .map(|queue| (queue.kind(), queue.pending()))
            .collect()
    }
}

fn resolve_and_enqueue(
    identity: ApplicantIdentity,
    applicants: &ApplicantSet,
    store: &AggregateStore,
    queues: &BTreeMap<SourceKind, Arc<WorkQueue>>,
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

    store.upsert_shell(collected.shell());

    let mut issued = 0;
    for request in collected.requests {
        let Some(queue) = queues.get(&request.kind) else {
            continue;
        };
        match queue.push(request) {
            Ok(()) => issued += 1,
            // Queues close only after resolution joins.
            Err(QueueError::Closed(kind)) => {
                warn!(applicant_id = %identity.id, %kind, "queue already closed, request dropped")
            }
            Err(e) => error!(applicant_id = %identity.id, "enqueue failed: {e}"),
        }
    }
    debug!(applicant_id = %identity.id, issued, "applicant resolved");

    DispatchSummary {
        resolved: 1,
        skipped: 0,
        requests_issued: issued,
        enrichment_failures: 0,
    }
}

/// Drains one queue until it is closed and empty. Returns the number of failures.
async fn source_worker(
    worker_id: usize,
    queue: Arc<WorkQueue>,
    enrichers: EnricherSet,
    store: Arc<AggregateStore>,
    source_timeout: Duration,
    idle_timeout: Duration,
) -> usize {
    let kind = queue.kind();
    let mut failures = 0;
    loop {
        match queue.pop(idle_timeout).await {
            Dequeued::Request(request) => {
                let _done = queue.completion();
                let applicant_id = request.applicant_id;
                match enrich_isolated(enrichers.clone(), request, source_timeout).await {
                    Some(value) => {
                        if store.write_field(applicant_id, value) != WriteOutcome::Written {
                            failures += 1;
                        }
                    }
                    None => failures += 1,
                }
            }
            Dequeued::Idle => {
                debug!(%kind, worker_id, "source worker idle, queue still open");
            }
            Dequeued::Closed => break,
        }
    }
    debug!(%kind, worker_id, "source worker exiting");
    failures
}
