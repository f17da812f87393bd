//! Fixed-capacity MPMC queue of owned work items.
//!
//! Thin wrapper over `crossbeam::queue::ArrayQueue`: push and pop are
//! linearizable and never block. A pushed value is moved into the queue
//! and moved out to exactly one popper, so no item can be seen by two
//! consumers or released twice.

use crossbeam::queue::ArrayQueue;
use crossbeam::utils::Backoff;
use std::num::NonZeroUsize;

pub struct BoundedQueue<T> {
    inner: ArrayQueue<T>,
}

impl<T> BoundedQueue<T> {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            inner: ArrayQueue::new(capacity.get()),
        }
    }

    /// Hands `item` back when the queue is full.
    pub fn try_push(&self, item: T) -> Result<(), T> {
        self.inner.push(item)
    }

    pub fn try_pop(&self) -> Option<T> {
        self.inner.pop()
    }

    /// Retries `try_push`, snoozing between attempts, for as long as
    /// `keep_trying` holds. On success returns how many times the queue was
    /// found full; otherwise hands the item back.
    pub fn push_with_backoff(&self, item: T, keep_trying: impl Fn() -> bool) -> Result<u64, T> {
        let backoff = Backoff::new();
        let mut pending = item;
        let mut full_hits = 0;
        loop {
            match self.inner.push(pending) {
                Ok(()) => return Ok(full_hits),
                Err(rejected) => {
                    if !keep_trying() {
                        return Err(rejected);
                    }
                    pending = rejected;
                    full_hits += 1;
                    backoff.snooze();
                }
            }
        }
    }

    /// Best effort only: a concurrent push may land right after this
    /// returns `true`.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn capacity(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[test]
    fn test_fifo_order_single_thread() {
        let queue = BoundedQueue::new(capacity(4));
        for i in 0..4 {
            assert!(queue.try_push(i).is_ok());
        }
        assert_eq!(queue.len(), 4);
        assert_eq!((0..4).map(|_| queue.try_pop().unwrap()).collect::<Vec<_>>(), vec![0, 1, 2, 3]);
        assert!(queue.is_empty());
        assert_eq!(queue.try_pop(), None);
    }

    #[test]
    fn test_full_queue_returns_item() {
        let queue = BoundedQueue::new(capacity(1));
        assert!(queue.try_push("first".to_string()).is_ok());
        assert_eq!(queue.try_push("second".to_string()), Err("second".to_string()));
        assert_eq!(queue.capacity(), 1);
    }

    #[test]
    fn test_push_with_backoff_waits_for_consumer() {
        let queue = BoundedQueue::new(capacity(1));
        queue.try_push(0u64).unwrap();

        std::thread::scope(|scope| {
            scope.spawn(|| {
                std::thread::sleep(std::time::Duration::from_millis(20));
                assert_eq!(queue.try_pop(), Some(0));
            });
            let full_hits = queue.push_with_backoff(1, || true).unwrap();
            assert!(full_hits > 0);
        });

        assert_eq!(queue.try_pop(), Some(1));
    }

    #[test]
    fn test_push_with_backoff_gives_up() {
        let queue = BoundedQueue::new(capacity(1));
        queue.try_push(1).unwrap();
        assert_eq!(queue.push_with_backoff(2, || false), Err(2));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_every_item_popped_exactly_once() {
        const ITEMS: u64 = 20_000;

        for cap in [1, 2, 7, 64] {
            let queue = BoundedQueue::new(capacity(cap));
            let done = AtomicBool::new(false);

            let popped: Vec<Vec<u64>> = std::thread::scope(|scope| {
                let consumers: Vec<_> = (0..4)
                    .map(|_| {
                        scope.spawn(|| {
                            let mut seen = Vec::new();
                            loop {
                                if let Some(item) = queue.try_pop() {
                                    seen.push(item);
                                } else if done.load(Ordering::Acquire) && queue.is_empty() {
                                    break;
                                } else {
                                    std::thread::yield_now();
                                }
                            }
                            seen
                        })
                    })
                    .collect();

                for i in 0..ITEMS {
                    queue.push_with_backoff(i, || true).unwrap();
                }
                done.store(true, Ordering::Release);

                consumers.into_iter().map(|h| h.join().unwrap()).collect()
            });

            let all: Vec<u64> = popped.into_iter().flatten().collect();
            assert_eq!(all.len() as u64, ITEMS, "capacity {}", cap);
            let unique: HashSet<u64> = all.iter().copied().collect();
            assert_eq!(unique.len() as u64, ITEMS, "duplicates at capacity {}", cap);
        }
    }
}
