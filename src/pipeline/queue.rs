//! Unbounded result queue with depth tracking and drain notification.
//!
//! Many schedulers hold a [`ResultSender`]; the pipeline consumer owns the
//! single [`ResultReceiver`]. Every received item must be acknowledged with
//! [`ResultReceiver::task_done`] so [`ResultSender::wait_drained`] can observe
//! the queue reaching zero unfinished items.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::Notify;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::monitor::{MonitorError, SampleResult};

#[derive(Debug, Default)]
struct QueueState {
    /// Items sent but not yet received.
    depth: AtomicUsize,
    /// Items sent but not yet acknowledged by the consumer.
    unfinished: AtomicUsize,
    drained: Notify,
}

/// Create a connected sender/receiver pair.
pub fn result_queue() -> (ResultSender, ResultReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    let state = Arc::new(QueueState::default());
    (
        ResultSender {
            tx,
            state: Arc::clone(&state),
        },
        ResultReceiver { rx, state },
    )
}

/// Producer side of the result queue. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ResultSender {
    tx: UnboundedSender<SampleResult>,
    state: Arc<QueueState>,
}

impl ResultSender {
    /// Enqueue one result.
    ///
    /// # Errors
    /// Returns `MonitorError::QueueClosed` if the receiver has been dropped.
    pub fn send(&self, result: SampleResult) -> Result<(), MonitorError> {
        self.state.depth.fetch_add(1, Ordering::SeqCst);
        self.state.unfinished.fetch_add(1, Ordering::SeqCst);
        if self.tx.send(result).is_err() {
            self.state.depth.fetch_sub(1, Ordering::SeqCst);
            self.finish_one();
            return Err(MonitorError::QueueClosed);
        }
        Ok(())
    }

    /// Number of items waiting to be received (best-effort).
    pub fn depth(&self) -> usize {
        self.state.depth.load(Ordering::SeqCst)
    }

    /// Number of items not yet fully processed.
    pub fn unfinished(&self) -> usize {
        self.state.unfinished.load(Ordering::SeqCst)
    }

    /// Wait until every enqueued item has been acknowledged.
    pub async fn wait_drained(&self) {
        loop {
            let notified = self.state.drained.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.unfinished() == 0 {
                return;
            }
            notified.await;
        }
    }

    fn finish_one(&self) {
        finish_one(&self.state);
    }
}

/// Consumer side of the result queue.
#[derive(Debug)]
pub struct ResultReceiver {
    rx: UnboundedReceiver<SampleResult>,
    state: Arc<QueueState>,
}

impl ResultReceiver {
    /// Receive the next item, or `None` once every sender is gone.
    pub async fn recv(&mut self) -> Option<SampleResult> {
        let item = self.rx.recv().await;
        if item.is_some() {
            self.state.depth.fetch_sub(1, Ordering::SeqCst);
        }
        item
    }

    /// Receive an item only if one is immediately available.
    pub fn try_recv(&mut self) -> Option<SampleResult> {
        let item = self.rx.try_recv().ok();
        if item.is_some() {
            self.state.depth.fetch_sub(1, Ordering::SeqCst);
        }
        item
    }

    /// Number of items waiting to be received (best-effort).
    pub fn depth(&self) -> usize {
        self.state.depth.load(Ordering::SeqCst)
    }

    /// Acknowledge one received item as fully processed.
    pub fn task_done(&self) {
        finish_one(&self.state);
    }
}

fn finish_one(state: &QueueState) {
    let previous = state
        .unfinished
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .unwrap_or(0);
    if previous <= 1 {
        state.drained.notify_waiters();
    }
}
