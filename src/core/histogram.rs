//! Concurrent age histograms.
//!
//! [`AtomicArrayHistogram`] covers the bounded domain `0..=MAX_AGE` with
//! one relaxed atomic per slot. [`KeyedHistogram`] accepts any key and
//! only serializes increments that target the same key; its shards keep
//! first inserts from blocking other keys. [`Histogram`]
//! picks one of them from a [`HistogramStrategy`].

use crate::domain::model::{HistogramEntry, HistogramSnapshot, HistogramStrategy, MAX_AGE};
use crate::domain::ports::AgeHistogram;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

pub struct AtomicArrayHistogram {
    slots: Box<[AtomicU64]>,
}

impl AtomicArrayHistogram {
    pub fn new() -> Self {
        Self {
            slots: (0..=MAX_AGE).map(|_| AtomicU64::new(0)).collect(),
        }
    }
}

impl Default for AtomicArrayHistogram {
    fn default() -> Self {
        Self::new()
    }
}

impl AgeHistogram for AtomicArrayHistogram {
    /// # Panics
    ///
    /// When `age > MAX_AGE`. Callers filter with `age_bucket` first.
    fn increment(&self, age: u32) {
        // 各格互相獨立，Relaxed 即可
        self.slots[age as usize].fetch_add(1, Ordering::Relaxed);
    }

    /// May run alongside increments; each slot is read once and never
    /// goes down.
    fn snapshot(&self) -> HistogramSnapshot {
        let entries = self
            .slots
            .iter()
            .enumerate()
            .map(|(age, slot)| HistogramEntry {
                age: age as u32,
                count: slot.load(Ordering::Relaxed),
            })
            .collect();
        HistogramSnapshot::from_entries(entries)
    }
}

/// One lock per shard; every age in `0..=MAX_AGE` lands in its own shard.
const SHARD_COUNT: usize = (MAX_AGE as usize + 1).next_power_of_two();

type Shard = RwLock<HashMap<u32, AtomicU64>>;

/// Sharded map of per-key counters.
///
/// Existing keys are bumped under their shard's read lock and serialized
/// by the key's atomic. A new key takes only its own shard's write lock,
/// so an insert never holds up keys that live in other shards.
pub struct KeyedHistogram {
    shards: Box<[Shard]>,
}

impl KeyedHistogram {
    pub fn new() -> Self {
        Self {
            shards: (0..SHARD_COUNT).map(|_| RwLock::new(HashMap::new())).collect(),
        }
    }

    fn shard(&self, key: u32) -> &Shard {
        &self.shards[key as usize & (SHARD_COUNT - 1)]
    }
}

impl Default for KeyedHistogram {
    fn default() -> Self {
        Self::new()
    }
}

impl AgeHistogram for KeyedHistogram {
    fn increment(&self, age: u32) {
        let shard = self.shard(age);
        if let Some(counter) = shard.read().get(&age) {
            counter.fetch_add(1, Ordering::Relaxed);
            return;
        }

        // 另一個執行緒可能已經先插入，entry 會沿用既有計數器
        shard
            .write()
            .entry(age)
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(1, Ordering::Relaxed);
    }

    /// Meant for after all increments have finished.
    fn snapshot(&self) -> HistogramSnapshot {
        let entries = self
            .shards
            .iter()
            .flat_map(|shard| {
                shard
                    .read()
                    .iter()
                    .map(|(&age, counter)| HistogramEntry {
                        age,
                        count: counter.load(Ordering::Relaxed),
                    })
                    .collect::<Vec<_>>()
            })
            .collect();
        HistogramSnapshot::from_entries(entries)
    }
}

pub enum Histogram {
    Array(AtomicArrayHistogram),
    Keyed(KeyedHistogram),
}

impl Histogram {
    pub fn for_strategy(strategy: HistogramStrategy) -> Self {
        match strategy {
            HistogramStrategy::Array => Self::Array(AtomicArrayHistogram::new()),
            HistogramStrategy::Map => Self::Keyed(KeyedHistogram::new()),
        }
    }

    pub fn strategy(&self) -> HistogramStrategy {
        match self {
            Self::Array(_) => HistogramStrategy::Array,
            Self::Keyed(_) => HistogramStrategy::Map,
        }
    }
}

impl AgeHistogram for Histogram {
    fn increment(&self, age: u32) {
        match self {
            Self::Array(h) => h.increment(age),
            Self::Keyed(h) => h.increment(age),
        }
    }

    fn snapshot(&self) -> HistogramSnapshot {
        match self {
            Self::Array(h) => h.snapshot(),
            Self::Keyed(h) => h.snapshot(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hammer(histogram: &dyn AgeHistogram, threads: u32, per_thread: u32) {
        std::thread::scope(|scope| {
            for t in 0..threads {
                scope.spawn(move || {
                    for i in 0..per_thread {
                        histogram.increment((t + i) % (MAX_AGE + 1));
                    }
                });
            }
        });
    }

    #[test]
    fn test_array_counts_increments() {
        let histogram = AtomicArrayHistogram::new();
        histogram.increment(0);
        histogram.increment(18);
        histogram.increment(18);
        histogram.increment(MAX_AGE);

        let snapshot = histogram.snapshot();
        assert_eq!(snapshot.count(0), 1);
        assert_eq!(snapshot.count(18), 2);
        assert_eq!(snapshot.count(MAX_AGE), 1);
        assert_eq!(snapshot.len(), 3);
    }

    #[test]
    #[should_panic]
    fn test_array_rejects_out_of_domain_age() {
        AtomicArrayHistogram::new().increment(MAX_AGE + 1);
    }

    #[test]
    fn test_keyed_accepts_unbounded_keys() {
        let histogram = KeyedHistogram::new();
        histogram.increment(500);
        histogram.increment(500);
        histogram.increment(3);

        let snapshot = histogram.snapshot();
        assert_eq!(snapshot.entries(), &[
            HistogramEntry { age: 3, count: 1 },
            HistogramEntry { age: 500, count: 2 },
        ]);
    }

    #[test]
    fn test_no_lost_updates_under_contention() {
        for strategy in [HistogramStrategy::Array, HistogramStrategy::Map] {
            let histogram = Histogram::for_strategy(strategy);
            hammer(&histogram, 8, 10_000);
            assert_eq!(histogram.snapshot().total(), 80_000, "strategy {}", strategy);
        }
    }

    #[test]
    fn test_same_key_contention() {
        let histogram = KeyedHistogram::new();
        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    for _ in 0..5_000 {
                        histogram.increment(42);
                    }
                });
            }
        });
        assert_eq!(histogram.snapshot().entries(), &[HistogramEntry { age: 42, count: 40_000 }]);
    }

    #[test]
    fn test_insert_does_not_block_other_keys() {
        let histogram = KeyedHistogram::new();
        histogram.increment(5);

        // 模擬年齡 7 正在插入：持有其分片的寫鎖
        let inserting = histogram.shard(7).write();
        let (done_tx, done_rx) = std::sync::mpsc::channel();

        std::thread::scope(|scope| {
            scope.spawn(|| {
                histogram.increment(5);
                histogram.increment(9);
                let _ = done_tx.send(());
            });

            let finished = done_rx.recv_timeout(std::time::Duration::from_secs(5));
            drop(inserting);
            assert!(finished.is_ok(), "increments to other keys waited on the insert");
        });

        let snapshot = histogram.snapshot();
        assert_eq!(snapshot.count(5), 2);
        assert_eq!(snapshot.count(9), 1);
    }

    #[test]
    fn test_keys_past_shard_count_share_shards_correctly() {
        let histogram = KeyedHistogram::new();
        let wrapped = 3 + SHARD_COUNT as u32;
        histogram.increment(3);
        histogram.increment(wrapped);
        histogram.increment(wrapped);

        let snapshot = histogram.snapshot();
        assert_eq!(snapshot.count(3), 1);
        assert_eq!(snapshot.count(wrapped), 2);
    }

    #[test]
    fn test_strategies_agree() {
        let array = Histogram::for_strategy(HistogramStrategy::Array);
        let keyed = Histogram::for_strategy(HistogramStrategy::Map);
        assert_eq!(array.strategy(), HistogramStrategy::Array);
        assert_eq!(keyed.strategy(), HistogramStrategy::Map);

        hammer(&array, 4, 1_000);
        hammer(&keyed, 4, 1_000);
        assert_eq!(array.snapshot(), keyed.snapshot());
    }
}
