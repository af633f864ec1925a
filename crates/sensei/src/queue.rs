// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Multi-producer / multi-consumer FIFO with bounded waits.
//!
//! Worker threads park on [`SynchronizedQueue::wait_for_data`] with a
//! deadline instead of blocking forever, so a shutdown flag flipped while
//! a worker sleeps is observed within one timeout period.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

/// Wakes a consumer that drains several queues at once.
///
/// A notifier attached via [`SynchronizedQueue::with_notifier`] is signalled
/// on every push in addition to the queue's own condition, so one thread can
/// sleep on data arriving in any of its input queues.
#[derive(Debug, Default)]
pub struct QueueNotifier {
    data_ready: Mutex<bool>,
    available: Condvar,
}

impl QueueNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self {
            data_ready: Mutex::new(false),
            available: Condvar::new(),
        }
    }

    fn notify(&self) {
        let mut ready = self.data_ready.lock();
        *ready = true;
        self.available.notify_all();
    }

    /// Wake the consumer without data, so it can observe a stop flag.
    pub fn notify_shutdown(&self) {
        self.notify();
    }

    /// Block until any attached queue receives data or the timeout elapses.
    ///
    /// A push that raced the caller's own empty-check leaves the ready flag
    /// set, so that wakeup is never lost; the flag is consumed on return.
    pub fn wait(&self, timeout: Duration) {
        let mut ready = self.data_ready.lock();
        if !*ready {
            self.available.wait_for(&mut ready, timeout);
        }
        *ready = false;
    }
}

/// Unbounded FIFO shared between threads.
///
/// Every push wakes all waiters; consumers re-check [`pop`](Self::pop)
/// after waking since another consumer may have drained the queue first.
#[derive(Debug)]
pub struct SynchronizedQueue<T> {
    items: Mutex<VecDeque<T>>,
    available: Condvar,
    notifier: Option<Arc<QueueNotifier>>,
}

impl<T> SynchronizedQueue<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
            available: Condvar::new(),
            notifier: None,
        }
    }

    /// Create a queue that also signals a shared notifier on every push.
    #[must_use]
    pub fn with_notifier(notifier: Arc<QueueNotifier>) -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
            available: Condvar::new(),
            notifier: Some(notifier),
        }
    }

    /// Append an item and wake every waiting consumer.
    pub fn push(&self, item: T) {
        self.items.lock().push_back(item);
        self.available.notify_all();
        if let Some(notifier) = &self.notifier {
            notifier.notify();
        }
    }

    /// Remove the oldest item, if any.
    pub fn pop(&self) -> Option<T> {
        self.items.lock().pop_front()
    }

    /// True when no items are queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    /// Block until data is available or the timeout elapses.
    ///
    /// Returns immediately when the queue is non-empty. A `true` return
    /// means data was available at wakeup; `false` means the deadline
    /// expired.
    pub fn wait_for_data(&self, timeout: Duration) -> bool {
        let mut items = self.items.lock();
        if !items.is_empty() {
            return true;
        }
        self.available.wait_for(&mut items, timeout);
        !items.is_empty()
    }
}

impl<T> Default for SynchronizedQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn test_fifo_order() {
        let queue = SynchronizedQueue::new();
        queue.push(1);
        queue.push(2);
        queue.push(3);
        assert_eq!(queue.pop(), Some(1));
        assert_eq!(queue.pop(), Some(2));
        assert_eq!(queue.pop(), Some(3));
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn test_wait_returns_early_when_data_is_present() {
        let queue = SynchronizedQueue::new();
        queue.push(42);
        let start = Instant::now();
        assert!(queue.wait_for_data(Duration::from_secs(5)));
        assert!(start.elapsed() < Duration::from_secs(1), "wait must not block");
    }

    #[test]
    fn test_wait_expires_on_empty_queue() {
        let queue: SynchronizedQueue<i32> = SynchronizedQueue::new();
        let start = Instant::now();
        assert!(!queue.wait_for_data(Duration::from_millis(50)));
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn test_push_wakes_waiting_consumer() {
        let queue = Arc::new(SynchronizedQueue::new());
        let consumer_queue = Arc::clone(&queue);
        let consumer = thread::spawn(move || {
            assert!(consumer_queue.wait_for_data(Duration::from_secs(5)));
            consumer_queue.pop()
        });
        thread::sleep(Duration::from_millis(20));
        queue.push(7);
        assert_eq!(consumer.join().expect("consumer thread"), Some(7));
    }

    #[test]
    fn test_shared_notifier_wakes_on_either_queue() {
        let notifier = Arc::new(QueueNotifier::new());
        let first = Arc::new(SynchronizedQueue::with_notifier(Arc::clone(&notifier)));
        let second: Arc<SynchronizedQueue<i32>> =
            Arc::new(SynchronizedQueue::with_notifier(Arc::clone(&notifier)));

        for queue in [&first, &second] {
            let producer_queue = Arc::clone(queue);
            let producer = thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                producer_queue.push(1);
            });
            let start = Instant::now();
            notifier.wait(Duration::from_secs(5));
            assert!(
                start.elapsed() < Duration::from_secs(1),
                "a push on either queue must wake the shared wait"
            );
            producer.join().expect("producer thread");
            assert_eq!(queue.pop(), Some(1));
        }
    }

    #[test]
    fn test_shared_notifier_never_loses_a_racing_push() {
        let notifier = Arc::new(QueueNotifier::new());
        let queue = Arc::new(SynchronizedQueue::with_notifier(Arc::clone(&notifier)));

        // Push before the wait: the pending flag makes the wait return
        // immediately instead of sleeping through the data.
        queue.push(7);
        let start = Instant::now();
        notifier.wait(Duration::from_secs(5));
        assert!(start.elapsed() < Duration::from_secs(1));
        assert_eq!(queue.pop(), Some(7));
    }

    #[test]
    fn test_shared_notifier_wait_expires_when_idle() {
        let notifier = QueueNotifier::new();
        let start = Instant::now();
        notifier.wait(Duration::from_millis(50));
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn test_multiple_producers_and_consumers() {
        const PER_PRODUCER: usize = 1000;
        let queue = Arc::new(SynchronizedQueue::new());

        let producers: Vec<_> = (0..4)
            .map(|p| {
                let q = Arc::clone(&queue);
                thread::spawn(move || {
                    for i in 0..PER_PRODUCER {
                        q.push(p * PER_PRODUCER + i);
                    }
                })
            })
            .collect();
        for producer in producers {
            producer.join().expect("producer thread");
        }

        let consumers: Vec<_> = (0..4)
            .map(|_| {
                let q = Arc::clone(&queue);
                thread::spawn(move || {
                    let mut collected = Vec::new();
                    while let Some(item) = q.pop() {
                        collected.push(item);
                    }
                    collected
                })
            })
            .collect();
        let total: usize = consumers
            .into_iter()
            .map(|c| c.join().expect("consumer thread").len())
            .sum();
        assert_eq!(total, 4 * PER_PRODUCER, "every pushed item must be popped once");
    }
}
