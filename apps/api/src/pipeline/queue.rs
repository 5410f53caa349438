//! Per-kind work queue with explicit completion tracking.
//!
//! The submission side is closed by the orchestrator once every request for a run has
//! been enqueued. Workers exit when they observe the queue closed and empty; an idle
//! wait that elapses while the queue is still open only means "nothing yet".

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::models::enrichment::SourceKind;
use crate::pipeline::collector::EnrichmentRequest;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("{0} queue is closed for this run")]
    Closed(SourceKind),

    #[error("{request} request pushed onto the {queue} queue")]
    WrongKind {
        queue: SourceKind,
        request: SourceKind,
    },
}

/// What a worker got back from [`WorkQueue::pop`].
#[derive(Debug, PartialEq, Eq)]
pub enum Dequeued {
    Request(EnrichmentRequest),
    Idle,
    Closed,
}

pub struct WorkQueue {
    kind: SourceKind,
    sender: Mutex<Option<mpsc::UnboundedSender<EnrichmentRequest>>>,
    receiver: tokio::sync::Mutex<mpsc::UnboundedReceiver<EnrichmentRequest>>,
    enqueued: AtomicUsize,
    completed: AtomicUsize,
}

impl WorkQueue {
    pub fn new(kind: SourceKind) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            kind,
            sender: Mutex::new(Some(tx)),
            receiver: tokio::sync::Mutex::new(rx),
            enqueued: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
        }
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    pub fn push(&self, request: EnrichmentRequest) -> Result<(), QueueError> {
        if request.kind != self.kind {
            return Err(QueueError::WrongKind {
                queue: self.kind,
                request: request.kind,
            });
        }
        // Held across the send so `close` cannot interleave with an accepted push.
        let sender = self.sender.lock();
        let Some(tx) = sender.as_ref() else {
            return Err(QueueError::Closed(self.kind));
        };
        self.enqueued.fetch_add(1, Ordering::SeqCst);
        if tx.send(request).is_err() {
            self.enqueued.fetch_sub(1, Ordering::SeqCst);
            return Err(QueueError::Closed(self.kind));
        }
        Ok(())
    }

    /// Waits up to `idle` for the next request.
    pub async fn pop(&self, idle: Duration) -> Dequeued {
        let mut rx = self.receiver.lock().await;
        match tokio::time::timeout(idle, rx.recv()).await {
            Ok(Some(request)) => Dequeued::Request(request),
            Ok(None) => Dequeued::Closed,
            Err(_) => Dequeued::Idle,
        }
    }

    /// Marks one dequeued request as processed when the returned guard drops, so a
    /// panicking worker still accounts for the item it held.
    pub fn completion(&self) -> Completion<'_> {
        Completion { queue: self }
    }

    /// Stops accepting requests. Already queued requests are still delivered.
    pub fn close(&self) {
        self.sender.lock().take();
    }

    pub fn is_closed(&self) -> bool {
        self.sender.lock().is_none()
    }

    pub fn enqueued(&self) -> usize {
        self.enqueued.load(Ordering::SeqCst)
    }

    /// Requests enqueued but not yet processed.
    pub fn pending(&self) -> usize {
        self.enqueued()
            .saturating_sub(self.completed.load(Ordering::SeqCst))
    }

    /// True once the queue is closed and every enqueued request was processed.
    pub fn is_drained(&self) -> bool {
        self.is_closed() && self.pending() == 0
    }
}

pub struct Completion<'a> {
    queue: &'a WorkQueue,
}

impl Drop for Completion<'_> {
    fn drop(&mut self) {
        self.queue.completed.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn request(kind: SourceKind) -> EnrichmentRequest {
        EnrichmentRequest {
            applicant_id: Uuid::new_v4(),
            kind,
            source_url: "https://github.com/someone".to_string(),
        }
    }

    #[tokio::test]
    async fn test_fifo_delivery_and_completion_accounting() {
        let queue = WorkQueue::new(SourceKind::GitHub);
        let first = request(SourceKind::GitHub);
        let second = request(SourceKind::GitHub);
        queue.push(first.clone()).unwrap();
        queue.push(second.clone()).unwrap();
        assert_eq!(queue.pending(), 2);

        assert_eq!(
            queue.pop(Duration::from_millis(50)).await,
            Dequeued::Request(first)
        );
        drop(queue.completion());
        assert_eq!(queue.pending(), 1);

        assert_eq!(
            queue.pop(Duration::from_millis(50)).await,
            Dequeued::Request(second)
        );
        drop(queue.completion());
        assert_eq!(queue.pending(), 0);
        assert!(!queue.is_drained());

        queue.close();
        assert!(queue.is_drained());
        assert_eq!(queue.pop(Duration::from_millis(50)).await, Dequeued::Closed);
    }

    #[tokio::test]
    async fn test_push_after_close_is_rejected() {
        let queue = WorkQueue::new(SourceKind::Resume);
        queue.close();
        assert_eq!(
            queue.push(request(SourceKind::Resume)),
            Err(QueueError::Closed(SourceKind::Resume))
        );
        assert_eq!(queue.enqueued(), 0);
    }

    #[tokio::test]
    async fn test_close_still_delivers_queued_items() {
        let queue = WorkQueue::new(SourceKind::Resume);
        queue.push(request(SourceKind::Resume)).unwrap();
        queue.close();
        assert!(matches!(
            queue.pop(Duration::from_millis(50)).await,
            Dequeued::Request(_)
        ));
        assert_eq!(queue.pop(Duration::from_millis(50)).await, Dequeued::Closed);
    }

    #[tokio::test]
    async fn test_wrong_kind_is_rejected() {
        let queue = WorkQueue::new(SourceKind::LinkedIn);
        assert_eq!(
            queue.push(request(SourceKind::GitHub)),
            Err(QueueError::WrongKind {
                queue: SourceKind::LinkedIn,
                request: SourceKind::GitHub
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_empty_queue_reports_idle() {
        let queue = WorkQueue::new(SourceKind::LinkedIn);
        assert_eq!(queue.pop(Duration::from_secs(5)).await, Dequeued::Idle);
        assert!(!queue.is_closed());
    }
}
