//! Outbound event queue
//!
//! FIFO, unbounded, shared between event handlers (producers) and whichever
//! side flushes to the peer (consumer). Two consumer disciplines:
//! - `drain_all` for the per-tick synchronous flush
//! - `pop` for a dedicated writer task, suspending until an event arrives

use bot_bridge_core::EventRecord;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;
use tracing::trace;

#[derive(Debug, Default)]
struct Shared {
    items: Mutex<VecDeque<EventRecord>>,
    notify: Notify,
    closed: AtomicBool,
}

/// Handle to a bridge's outbound queue
///
/// Cloning yields another handle to the same queue.
#[derive(Debug, Clone, Default)]
pub struct OutboundQueue {
    shared: Arc<Shared>,
}

impl OutboundQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event. Never blocks; events offered after `close` are dropped.
    pub fn enqueue(&self, event: EventRecord) {
        if self.is_closed() {
            trace!("Queue closed, dropping {} event", event.name());
            return;
        }
        self.shared.items.lock().push_back(event);
        self.shared.notify.notify_one();
    }

    /// Remove and return everything queued, oldest first
    pub fn drain_all(&self) -> Vec<EventRecord> {
        self.shared.items.lock().drain(..).collect()
    }

    /// Wait for the next event
    ///
    /// Returns `None` once the queue is closed and empty, which is the
    /// writer task's signal to exit.
    pub async fn pop(&self) -> Option<EventRecord> {
        loop {
            let notified = self.shared.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(event) = self.shared.items.lock().pop_front() {
                return Some(event);
            }
            if self.is_closed() {
                return None;
            }

            notified.await;
        }
    }

    /// Stop accepting events and wake a pending `pop`
    ///
    /// Events already queued remain available to `pop` and `drain_all`.
    pub fn close(&self) {
        self.shared.closed.store(true, Ordering::Release);
        self.shared.notify.notify_waiters();
        self.shared.notify.notify_one();
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }

    pub fn len(&self) -> usize {
        self.shared.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn turn(n: u32) -> EventRecord {
        EventRecord::SkippedTurn { turn: n }
    }

    #[test]
    fn test_drain_preserves_insertion_order() {
        let queue = OutboundQueue::new();
        for n in 0..5 {
            queue.enqueue(turn(n));
        }

        let drained = queue.drain_all();
        assert_eq!(drained, (0..5).map(turn).collect::<Vec<_>>());
        assert!(queue.is_empty());
        assert!(queue.drain_all().is_empty());
    }

    #[test]
    fn test_enqueue_after_close_is_dropped() {
        let queue = OutboundQueue::new();
        queue.enqueue(turn(1));
        queue.close();
        queue.enqueue(turn(2));

        assert_eq!(queue.drain_all(), vec![turn(1)]);
    }

    #[tokio::test]
    async fn test_pop_waits_for_enqueue() {
        let queue = OutboundQueue::new();
        let consumer = queue.clone();
        let handle = tokio::spawn(async move { consumer.pop().await });

        tokio::task::yield_now().await;
        queue.enqueue(EventRecord::HitWall);

        let popped = tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("pop should complete")
            .unwrap();
        assert_eq!(popped, Some(EventRecord::HitWall));
    }

    #[tokio::test]
    async fn test_close_releases_pending_pop_after_backlog() {
        let queue = OutboundQueue::new();
        queue.enqueue(EventRecord::Death);
        queue.close();

        assert_eq!(queue.pop().await, Some(EventRecord::Death));
        assert_eq!(queue.pop().await, None);

        let waiting = OutboundQueue::new();
        let consumer = waiting.clone();
        let handle = tokio::spawn(async move { consumer.pop().await });
        tokio::task::yield_now().await;
        waiting.close();
        let popped = tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("closed queue should release pop")
            .unwrap();
        assert_eq!(popped, None);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_enqueue_and_pop_loses_nothing() {
        const COUNT: u32 = 2_000;
        let queue = OutboundQueue::new();

        let producer = queue.clone();
        let writer = std::thread::spawn(move || {
            for n in 0..COUNT {
                producer.enqueue(turn(n));
            }
            producer.close();
        });

        let mut received = Vec::with_capacity(COUNT as usize);
        while let Some(event) = queue.pop().await {
            received.push(event);
        }
        writer.join().unwrap();

        assert_eq!(received, (0..COUNT).map(turn).collect::<Vec<_>>());
    }
}
