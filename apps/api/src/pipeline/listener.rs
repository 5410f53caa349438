//! Background listener over the `ranking_requests` table.
//!
//! Every polling interval it takes the pending requests oldest-first and processes
//! them one at a time: `pending → processing → completed | failed`. A failed request
//! never stops the loop. A stop signal is honoured between requests, so the rest of
//! the batch stays pending.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::models::ranking::RequestStatus;
use crate::pipeline::ports::{RepositoryError, RequestQueue};
use crate::pipeline::run::{RankingPipeline, RunError, RunOutcome};

/// Status and result document stored for a finished run.
pub fn outcome_document(result: &Result<RunOutcome, RunError>) -> (RequestStatus, Value) {
    match result {
        Ok(RunOutcome::Ranked(report)) => (RequestStatus::Completed, report.to_document()),
        Ok(RunOutcome::NoApplicants) => (
            RequestStatus::Completed,
            json!({ "message": "No applicants found" }),
        ),
        Err(RunError::PostingNotFound(_)) => {
            (RequestStatus::Failed, json!({ "error": "Job post not found" }))
        }
        Err(e) => (RequestStatus::Failed, json!({ "error": e.to_string() })),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ListenerStatus {
    pub running: bool,
    pub polling_interval_secs: u64,
    pub requests_completed: usize,
    pub requests_failed: usize,
    pub last_poll_at: Option<DateTime<Utc>>,
}

struct Running {
    stop: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

pub struct RequestListener {
    pipeline: Arc<RankingPipeline>,
    requests: Arc<dyn RequestQueue>,
    interval: Duration,
    running: Mutex<Option<Running>>,
    completed: AtomicUsize,
    failed: AtomicUsize,
    last_poll_at: Mutex<Option<DateTime<Utc>>>,
}

impl RequestListener {
    pub fn new(
        pipeline: Arc<RankingPipeline>,
        requests: Arc<dyn RequestQueue>,
        interval: Duration,
    ) -> Self {
        Self {
            pipeline,
            requests,
            interval,
            running: Mutex::new(None),
            completed: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
            last_poll_at: Mutex::new(None),
        }
    }

    /// Spawns the polling loop. Returns `false` if it was already running.
    pub fn start(self: &Arc<Self>) -> bool {
        let mut running = self.running.lock();
        if running.as_ref().is_some_and(|r| !r.handle.is_finished()) {
            return false;
        }
        let (stop, stop_rx) = watch::channel(false);
        let handle = tokio::spawn(self.clone().run_loop(stop_rx));
        *running = Some(Running { stop, handle });
        true
    }

    /// Signals the loop and waits for the request in flight, if any, to finish.
    /// Returns `false` if it was not running.
    pub async fn stop(&self) -> bool {
        let taken = self.running.lock().take();
        let Some(Running { stop, handle }) = taken else {
            return false;
        };
        let _ = stop.send(true);
        if let Err(e) = handle.await {
            error!("ranking listener task ended abnormally: {e}");
        }
        info!("ranking listener stopped");
        true
    }

    pub fn is_running(&self) -> bool {
        self.running
            .lock()
            .as_ref()
            .is_some_and(|r| !r.handle.is_finished())
    }

    pub fn status(&self) -> ListenerStatus {
        ListenerStatus {
            running: self.is_running(),
            polling_interval_secs: self.interval.as_secs(),
            requests_completed: self.completed.load(Ordering::Relaxed),
            requests_failed: self.failed.load(Ordering::Relaxed),
            last_poll_at: *self.last_poll_at.lock(),
        }
    }

    async fn run_loop(self: Arc<Self>, mut stop: watch::Receiver<bool>) {
        info!(interval_secs = self.interval.as_secs(), "ranking listener started");
        loop {
            if let Err(e) = self.poll(Some(&stop)).await {
                error!("ranking request poll failed: {e}");
            }
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                changed = stop.changed() => {
                    if changed.is_err() || *stop.borrow() {
                        break;
                    }
                }
            }
        }
    }

    /// Processes every currently pending request. Returns how many were handled.
    pub async fn poll_once(&self) -> Result<usize, RepositoryError> {
        self.poll(None).await
    }

    async fn poll(&self, stop: Option<&watch::Receiver<bool>>) -> Result<usize, RepositoryError> {
        *self.last_poll_at.lock() = Some(Utc::now());
        let pending = self.requests.pending_requests().await?;
        if !pending.is_empty() {
            info!(count = pending.len(), "pending ranking requests found");
        }

        let mut handled = 0;
        for request in &pending {
            if stop.is_some_and(|rx| *rx.borrow()) {
                info!(
                    remaining = pending.len() - handled,
                    "stop requested, leaving remaining requests pending"
                );
                break;
            }
            handled += 1;
            let post_id = request.post_id;
            if let Err(e) = self
                .requests
                .update_request_status(post_id, RequestStatus::Processing, None)
                .await
            {
                warn!(%post_id, "could not claim ranking request: {e}");
                continue;
            }

            let result = self.pipeline.process_posting(post_id).await;
            let (status, document) = outcome_document(&result);
            match &result {
                Ok(_) => {
                    self.completed.fetch_add(1, Ordering::Relaxed);
                    info!(%post_id, "ranking request completed");
                }
                Err(e) => {
                    self.failed.fetch_add(1, Ordering::Relaxed);
                    error!(%post_id, "ranking request failed: {e}");
                }
            }

            if let Err(e) = self
                .requests
                .update_request_status(post_id, status, Some(document))
                .await
            {
                error!(%post_id, "could not record ranking request outcome: {e}");
            }
        }
        Ok(handled)
    }
}
