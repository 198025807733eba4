//! One-shot timeouts on the tokio runtime.
//!
//! Expired timeouts are reported through a channel so they are handled by the
//! daemon loop like any other event.

use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::host::TimeoutId;

pub struct TimerQueue {
    next_id: TimeoutId,
    tx: mpsc::UnboundedSender<TimeoutId>,
    pending: HashMap<TimeoutId, JoinHandle<()>>,
}

impl TimerQueue {
    pub fn new(tx: mpsc::UnboundedSender<TimeoutId>) -> Self {
        TimerQueue {
            next_id: 0,
            tx,
            pending: HashMap::new(),
        }
    }

    /// Must be called from within the tokio runtime.
    pub fn add(&mut self, delay: Duration) -> TimeoutId {
        self.next_id += 1;
        let id = self.next_id;
        let tx = self.tx.clone();

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(id);
        });
        self.pending.insert(id, handle);
        debug!("Timeout {} armed for {:?}", id, delay);

        id
    }

    pub fn cancel(&mut self, id: TimeoutId) {
        if let Some(handle) = self.pending.remove(&id) {
            handle.abort();
            debug!("Timeout {} cancelled", id);
        }
    }

    /// Record that a timeout was delivered. Returns `false` when it had been
    /// cancelled in the meantime and must be ignored.
    pub fn fired(&mut self, id: TimeoutId) -> bool {
        self.pending.remove(&id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_timeout_fires_once() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timers = TimerQueue::new(tx);

        let id = timers.add(Duration::from_millis(5));
        assert_eq!(rx.recv().await, Some(id));
        assert!(timers.fired(id));
        assert!(!timers.fired(id));
    }

    #[tokio::test]
    async fn test_cancelled_timeout_is_not_delivered() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timers = TimerQueue::new(tx);

        let cancelled = timers.add(Duration::from_millis(5));
        let kept = timers.add(Duration::from_millis(20));
        timers.cancel(cancelled);

        assert_eq!(rx.recv().await, Some(kept));
        assert!(!timers.fired(cancelled));
        assert!(timers.fired(kept));
    }
}
