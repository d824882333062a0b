//! Drainable multi-producer multi-consumer queue.
//!
//! [`DrainableQueue`] is an in-memory FIFO with a one-way close. Once closed, writes are
//! rejected with [`ErrorKind::QueueClosed`] while readers keep draining the remaining items.
//! When the queue is both closed and empty every [`DrainableQueue::get`] call resolves to
//! [`Envelope::Stop`] immediately, so a consumer blocked on the queue can never outlive it.
//!
//! ```text
//!  put ──► [ Open ] ──close──► [ Closing ] ──last get──► [ Drained ]
//!                                 │ put = QueueClosed        │ get = Stop
//! ```
//!
//! All synchronization is internal. Consumers and producers share the queue through an
//! [`Arc`](std::sync::Arc) and never lock anything themselves.

use std::collections::VecDeque;
use std::fmt;
use std::pin::pin;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;
use tracing::{debug, info};

use crate::bail;
use crate::error::{ErrorKind, IngestResult};

/// Message envelope delivered by [`DrainableQueue::get`].
///
/// `Stop` is a distinguished value that can never be confused with a payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Envelope<T> {
    /// A payload owned by the consumer that dequeued it.
    Item(T),
    /// The queue is closed and drained, no more items will ever arrive.
    Stop,
}

impl<T> Envelope<T> {
    /// Returns `true` for the stop sentinel.
    pub fn is_stop(&self) -> bool {
        matches!(self, Envelope::Stop)
    }

    /// Returns the payload, or [`None`] for the stop sentinel.
    pub fn into_item(self) -> Option<T> {
        match self {
            Envelope::Item(item) => Some(item),
            Envelope::Stop => None,
        }
    }
}

/// Lifecycle state of a [`DrainableQueue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueState {
    /// Accepting writes.
    Open,
    /// Writes disabled, items may still be drained.
    Closing,
    /// Closed and empty. Terminal.
    Drained,
}

/// Control surface used to close a queue without knowing its item type.
pub trait Closeable: Send + Sync {
    /// Name of the queue, used for logging.
    fn name(&self) -> &str;

    /// Disables writes. Idempotent.
    fn close(&self);
}

#[derive(Debug)]
struct QueueInner<T> {
    items: VecDeque<T>,
    closed: bool,
}

/// In-memory FIFO queue with a one-way closed state.
pub struct DrainableQueue<T> {
    name: String,
    capacity: Option<usize>,
    inner: Mutex<QueueInner<T>>,
    items_available: Notify,
    space_available: Notify,
}

impl<T> DrainableQueue<T> {
    /// Creates a new unbounded queue.
    pub fn new(name: impl Into<String>) -> Self {
        Self::build(name.into(), None)
    }

    /// Creates a new queue holding at most `capacity` items.
    ///
    /// [`DrainableQueue::put`] suspends while the queue is full. A capacity of zero is treated
    /// as one.
    pub fn with_capacity(name: impl Into<String>, capacity: usize) -> Self {
        Self::build(name.into(), Some(capacity.max(1)))
    }

    fn build(name: String, capacity: Option<usize>) -> Self {
        Self {
            name,
            capacity,
            inner: Mutex::new(QueueInner {
                items: VecDeque::new(),
                closed: false,
            }),
            items_available: Notify::new(),
            space_available: Notify::new(),
        }
    }

    /// Returns the name of the queue.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the configured capacity, if the queue is bounded.
    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Returns the current lifecycle state.
    pub fn state(&self) -> QueueState {
        let inner = self.lock();
        match (inner.closed, inner.items.is_empty()) {
            (false, _) => QueueState::Open,
            (true, false) => QueueState::Closing,
            (true, true) => QueueState::Drained,
        }
    }

    /// Returns the number of queued items.
    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    /// Returns `true` if no items are queued.
    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }

    /// Returns `true` once the queue has been closed.
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Enqueues `item`.
    ///
    /// Fails with [`ErrorKind::QueueClosed`] if the queue is closed, including when it gets
    /// closed while waiting for space in a bounded queue. The item is never silently dropped.
    pub async fn put(&self, item: T) -> IngestResult<()> {
        let mut item = Some(item);

        loop {
            let mut space = pin!(self.space_available.notified());
            space.as_mut().enable();

            {
                let mut inner = self.lock();
                if inner.closed {
                    bail!(
                        ErrorKind::QueueClosed,
                        "The queue is closed to new writes",
                        format!("queue `{}`", self.name)
                    );
                }

                if self.has_space(&inner, 1)
                    && let Some(item) = item.take()
                {
                    inner.items.push_back(item);
                    drop(inner);
                    self.items_available.notify_one();

                    return Ok(());
                }
            }

            space.await;
        }
    }

    /// Enqueues every item of `items`, returning how many were enqueued.
    ///
    /// On an unbounded queue the batch is inserted atomically: either all items are enqueued
    /// or, if the queue is closed, none are. On a bounded queue items are enqueued one by one
    /// and a close in the middle of the batch fails the remaining items.
    pub async fn put_many<I>(&self, items: I) -> IngestResult<usize>
    where
        I: IntoIterator<Item = T>,
    {
        if self.capacity.is_some() {
            let mut count = 0;
            for item in items {
                self.put(item).await?;
                count += 1;
            }

            return Ok(count);
        }

        let count = {
            let mut inner = self.lock();
            if inner.closed {
                bail!(
                    ErrorKind::QueueClosed,
                    "The queue is closed to new writes",
                    format!("queue `{}`", self.name)
                );
            }

            let before = inner.items.len();
            inner.items.extend(items);
            inner.items.len() - before
        };

        for _ in 0..count {
            self.items_available.notify_one();
        }

        Ok(count)
    }

    /// Dequeues the next item, waiting until one is available.
    ///
    /// Resolves to [`Envelope::Stop`] without waiting once the queue is closed and empty. The
    /// returned future is cancel safe: an item is only removed when the future completes.
    pub async fn get(&self) -> Envelope<T> {
        loop {
            let mut available = pin!(self.items_available.notified());
            available.as_mut().enable();

            if let Some(envelope) = self.try_get() {
                return envelope;
            }

            available.await;
        }
    }

    /// Dequeues the next item without waiting.
    ///
    /// Returns [`None`] when the queue is open and empty.
    pub fn try_get(&self) -> Option<Envelope<T>> {
        let mut inner = self.lock();

        if let Some(item) = inner.items.pop_front() {
            drop(inner);
            self.space_available.notify_one();

            return Some(Envelope::Item(item));
        }

        if inner.closed {
            return Some(Envelope::Stop);
        }

        None
    }

    /// Transitions the queue from open to closing. Idempotent.
    ///
    /// Every blocked reader and writer is woken up so it can observe the new state.
    pub fn close(&self) {
        let remaining = {
            let mut inner = self.lock();
            if inner.closed {
                debug!(queue = %self.name, "queue already closed");
                return;
            }

            inner.closed = true;
            inner.items.len()
        };

        info!(queue = %self.name, remaining, "queue closed to new writes");

        self.items_available.notify_waiters();
        self.space_available.notify_waiters();
    }

    fn has_space(&self, inner: &QueueInner<T>, additional: usize) -> bool {
        self.capacity
            .is_none_or(|capacity| inner.items.len() + additional <= capacity)
    }

    fn lock(&self) -> MutexGuard<'_, QueueInner<T>> {
        // The critical sections never panic while mutating, so a poisoned lock still guards
        // consistent data.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> Closeable for DrainableQueue<T>
where
    T: Send,
{
    fn name(&self) -> &str {
        DrainableQueue::name(self)
    }

    fn close(&self) {
        DrainableQueue::close(self)
    }
}

impl<T> fmt::Debug for DrainableQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.lock();
        f.debug_struct("DrainableQueue")
            .field("name", &self.name)
            .field("capacity", &self.capacity)
            .field("len", &inner.items.len())
            .field("closed", &inner.closed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::task::JoinSet;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_items_are_delivered_in_fifo_order() {
        let queue = DrainableQueue::new("test");
        queue.put(1).await.unwrap();
        queue.put(2).await.unwrap();
        queue.put_many([3, 4]).await.unwrap();

        for expected in 1..=4 {
            assert_eq!(queue.get().await, Envelope::Item(expected));
        }
        assert_eq!(queue.try_get(), None);
    }

    #[tokio::test]
    async fn test_put_after_close_fails_with_queue_closed() {
        let queue = DrainableQueue::new("test");
        queue.close();

        let err = queue.put(1).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::QueueClosed);

        let err = queue.put_many([1, 2]).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::QueueClosed);
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_get_on_closed_empty_queue_returns_stop_immediately() {
        let queue = DrainableQueue::<u32>::new("test");
        queue.close();

        assert_eq!(queue.state(), QueueState::Drained);
        let envelope = timeout(Duration::from_millis(50), queue.get())
            .await
            .expect("get must not block on a drained queue");
        assert!(envelope.is_stop());

        // Stop is returned for every call, not just the first one.
        assert!(queue.get().await.is_stop());
    }

    #[tokio::test]
    async fn test_closing_queue_still_drains_items() {
        let queue = DrainableQueue::new("test");
        queue.put_many(["a", "b"]).await.unwrap();
        queue.close();
        queue.close();

        assert_eq!(queue.state(), QueueState::Closing);
        assert_eq!(queue.get().await, Envelope::Item("a"));
        assert_eq!(queue.get().await, Envelope::Item("b"));
        assert_eq!(queue.state(), QueueState::Drained);
        assert_eq!(queue.get().await, Envelope::Stop);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_close_wakes_blocked_consumers() {
        let queue = Arc::new(DrainableQueue::<u32>::new("test"));

        let mut consumers = JoinSet::new();
        for _ in 0..3 {
            let queue = queue.clone();
            consumers.spawn(async move { queue.get().await });
        }

        tokio::time::sleep(Duration::from_millis(20)).await;
        queue.close();

        let envelopes = timeout(Duration::from_secs(1), consumers.join_all())
            .await
            .expect("blocked consumers must wake up on close");
        assert!(envelopes.iter().all(Envelope::is_stop));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_consumers_dequeue_each_item_exactly_once() {
        const ITEMS: u32 = 1_000;
        const CONSUMERS: usize = 4;

        let queue = Arc::new(DrainableQueue::new("test"));
        queue.put_many(0..ITEMS).await.unwrap();
        queue.close();

        let mut consumers = JoinSet::new();
        for _ in 0..CONSUMERS {
            let queue = queue.clone();
            consumers.spawn(async move {
                let mut received = Vec::new();
                loop {
                    match queue.get().await {
                        Envelope::Item(item) => received.push(item),
                        Envelope::Stop => return (received, true),
                    }
                }
            });
        }

        let results = consumers.join_all().await;
        assert_eq!(results.len(), CONSUMERS);
        assert!(results.iter().all(|(_, stopped)| *stopped));

        let received: Vec<u32> = results.into_iter().flat_map(|(items, _)| items).collect();
        assert_eq!(received.len(), ITEMS as usize);
        let unique: HashSet<u32> = received.into_iter().collect();
        assert_eq!(unique.len(), ITEMS as usize);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_producers_and_consumers() {
        let queue = Arc::new(DrainableQueue::new("test"));

        let mut consumers = JoinSet::new();
        for _ in 0..3 {
            let queue = queue.clone();
            consumers.spawn(async move {
                let mut count = 0usize;
                while let Envelope::Item(_) = queue.get().await {
                    count += 1;
                }
                count
            });
        }

        let mut producers = JoinSet::new();
        for producer in 0..4u32 {
            let queue = queue.clone();
            producers.spawn(async move {
                for item in 0..250u32 {
                    queue.put(producer * 1_000 + item).await.unwrap();
                }
            });
        }
        producers.join_all().await;
        queue.close();

        let counts = timeout(Duration::from_secs(5), consumers.join_all())
            .await
            .unwrap();
        assert_eq!(counts.into_iter().sum::<usize>(), 1_000);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_bounded_put_waits_for_space() {
        let queue = Arc::new(DrainableQueue::with_capacity("test", 1));
        queue.put(1).await.unwrap();

        let producer = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.put(2).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!producer.is_finished());
        assert_eq!(queue.len(), 1);

        assert_eq!(queue.get().await, Envelope::Item(1));
        timeout(Duration::from_secs(1), producer)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(queue.get().await, Envelope::Item(2));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_bounded_put_fails_when_closed_while_waiting() {
        let queue = Arc::new(DrainableQueue::with_capacity("test", 1));
        queue.put(1).await.unwrap();

        let producer = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.put(2).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        queue.close();

        let err = timeout(Duration::from_secs(1), producer)
            .await
            .unwrap()
            .unwrap()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::QueueClosed);
        assert_eq!(queue.get().await, Envelope::Item(1));
        assert!(queue.get().await.is_stop());
    }
}
