//! One producer thread, a fixed pool of consumer threads, a bounded queue
//! between them and a shared histogram at the end.
//!
//! ```text
//! Idle ──run()──▶ Running ──producer signals──▶ Draining ──all joined──▶ Done
//! ```
//!
//! A consumer leaves its loop only when the termination signal is set
//! *and* the queue is empty. The producer finishes every push before it
//! sets the signal (release), so a consumer that sees it (acquire) also
//! sees every item that will ever be queued.

use crate::core::age::{age_bucket, AgeCalculator};
use crate::core::histogram::Histogram;
use crate::core::queue::BoundedQueue;
use crate::domain::model::{CivilDate, LineCounters, PipelineState, RunSummary, WorkItem};
use crate::domain::ports::{AgeHistogram, ConfigProvider, LineSource, Pipeline};
use crate::utils::error::{HistogramError, Result};
use crossbeam::utils::Backoff;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use std::thread;
use std::time::Instant;

/// Set once by the producer, read by every consumer.
#[derive(Debug, Default)]
pub struct TerminationSignal {
    done: AtomicBool,
}

impl TerminationSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` only for the call that actually flipped the flag.
    pub fn signal(&self) -> bool {
        !self.done.swap(true, Ordering::AcqRel)
    }

    pub fn is_signaled(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }
}

#[derive(Debug, Default)]
struct ProducerReport {
    lines_read: u64,
    full_hits: u64,
    source_error: Option<String>,
}

/// Signals termination when the producer returns or unwinds, so a
/// panicking producer cannot leave consumers spinning.
struct ProductionGuard<'a> {
    signal: &'a TerminationSignal,
    state: &'a AtomicU8,
}

impl Drop for ProductionGuard<'_> {
    fn drop(&mut self) {
        if self.signal.signal() {
            let _ = self.state.compare_exchange(
                PipelineState::Running.as_u8(),
                PipelineState::Draining.as_u8(),
                Ordering::AcqRel,
                Ordering::Acquire,
            );
        }
    }
}

/// Counts live consumers; the producer stops pushing once it hits zero.
struct ConsumerGuard<'a> {
    live: &'a AtomicUsize,
}

impl Drop for ConsumerGuard<'_> {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::AcqRel);
    }
}

pub struct HistogramPipeline<S: LineSource, C: ConfigProvider> {
    source: S,
    config: C,
    calculator: AgeCalculator,
    state: AtomicU8,
    // 管線只執行一次，訊號與管線同生命週期
    signal: TerminationSignal,
}

impl<S: LineSource, C: ConfigProvider> HistogramPipeline<S, C> {
    pub fn new(source: S, config: C, reference_date: CivilDate) -> Self {
        Self {
            source,
            config,
            calculator: AgeCalculator::new(reference_date),
            state: AtomicU8::new(PipelineState::Idle.as_u8()),
            signal: TerminationSignal::new(),
        }
    }

    /// Set by the producer once it stops, whether it finished or failed.
    pub fn termination_signal(&self) -> &TerminationSignal {
        &self.signal
    }

    pub fn state(&self) -> PipelineState {
        PipelineState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: PipelineState) {
        self.state.store(state.as_u8(), Ordering::Release);
    }

    fn produce(
        &self,
        queue: &BoundedQueue<WorkItem>,
        signal: &TerminationSignal,
        live_consumers: &AtomicUsize,
    ) -> ProducerReport {
        let _guard = ProductionGuard {
            signal,
            state: &self.state,
        };
        let mut report = ProducerReport::default();

        let lines = match self.source.open() {
            Ok(lines) => lines,
            Err(e) => {
                // 診斷訊息由呼叫端輸出一次
                tracing::debug!("Producer could not open input: {}", e);
                report.source_error = Some(e.user_friendly_message());
                return report;
            }
        };
        tracing::debug!("Producer reading from {}", self.source.describe());

        for (idx, line) in lines.enumerate() {
            let line_no = idx as u64 + 1;
            let text = match line {
                Ok(text) => text,
                Err(e) => {
                    tracing::debug!("Read error at line {} of {}: {}", line_no, self.source.describe(), e);
                    report.source_error = Some(format!("read error at line {}: {}", line_no, e));
                    break;
                }
            };

            let item = WorkItem::new(line_no, text);
            match queue.push_with_backoff(item, || live_consumers.load(Ordering::Acquire) > 0) {
                Ok(full_hits) => {
                    report.full_hits += full_hits;
                    report.lines_read += 1;
                }
                Err(item) => {
                    tracing::error!("❌ No consumer left, dropping input from line {}", item.line_no);
                    break;
                }
            }
        }

        tracing::debug!(
            "Producer finished: {} lines, queue full {} times",
            report.lines_read,
            report.full_hits
        );
        report
    }

    fn consume(
        &self,
        queue: &BoundedQueue<WorkItem>,
        signal: &TerminationSignal,
        histogram: &Histogram,
        live_consumers: &AtomicUsize,
    ) -> LineCounters {
        let _guard = ConsumerGuard {
            live: live_consumers,
        };
        let backoff = Backoff::new();
        let mut counters = LineCounters::default();

        loop {
            if let Some(item) = queue.try_pop() {
                self.process(item, histogram, &mut counters);
                backoff.reset();
                continue;
            }
            // 只有「已結束」且「佇列為空」同時成立才能離開
            if signal.is_signaled() && queue.is_empty() {
                break;
            }
            backoff.snooze();
        }

        counters
    }

    fn process(&self, item: WorkItem, histogram: &Histogram, counters: &mut LineCounters) {
        let Some(text) = self.config.date_field().extract(&item.text) else {
            tracing::trace!("Line {}: date column missing", item.line_no);
            counters.malformed += 1;
            return;
        };
        if text.is_empty() {
            counters.blank += 1;
            return;
        }

        match self.calculator.age_of(text) {
            Ok(age) => match age_bucket(age) {
                Some(bucket) => {
                    histogram.increment(bucket);
                    counters.accepted += 1;
                }
                None => {
                    tracing::trace!("Line {}: age {:.3} outside histogram", item.line_no, age);
                    counters.out_of_range += 1;
                }
            },
            Err(e) => {
                tracing::trace!("Line {}: {}", item.line_no, e);
                counters.malformed += 1;
            }
        }
    }

    fn execute(
        &self,
        workers: usize,
        queue: &BoundedQueue<WorkItem>,
        histogram: &Histogram,
    ) -> Result<(ProducerReport, LineCounters)> {
        let signal = &self.signal;
        let live_consumers = AtomicUsize::new(workers);

        thread::scope(|scope| {
            let mut consumers = Vec::with_capacity(workers);
            for id in 0..workers {
                let spawned = thread::Builder::new()
                    .name(format!("age-consumer-{}", id))
                    .spawn_scoped(scope, || self.consume(queue, signal, histogram, &live_consumers));
                match spawned {
                    Ok(handle) => consumers.push(handle),
                    Err(e) => {
                        // 讓已啟動的消費者能結束
                        live_consumers.fetch_sub(workers - id, Ordering::AcqRel);
                        signal.signal();
                        return Err(HistogramError::WorkerFailed {
                            worker: format!("age-consumer-{}", id),
                            message: e.to_string(),
                        });
                    }
                }
            }

            let producer = thread::Builder::new()
                .name("age-producer".to_string())
                .spawn_scoped(scope, || self.produce(queue, signal, &live_consumers))
                .map_err(|e| {
                    signal.signal();
                    HistogramError::WorkerFailed {
                        worker: "age-producer".to_string(),
                        message: e.to_string(),
                    }
                });

            let mut failure = None;
            let report = match producer.map(|handle| handle.join()) {
                Ok(Ok(report)) => report,
                Ok(Err(panic)) => {
                    failure = Some(worker_panicked("age-producer", panic));
                    ProducerReport::default()
                }
                Err(e) => {
                    failure = Some(e);
                    ProducerReport::default()
                }
            };

            let mut counters = LineCounters::default();
            for (id, handle) in consumers.into_iter().enumerate() {
                match handle.join() {
                    Ok(local) => counters.merge(&local),
                    Err(panic) => {
                        let err = worker_panicked(&format!("age-consumer-{}", id), panic);
                        failure.get_or_insert(err);
                    }
                }
            }

            match failure {
                Some(err) => Err(err),
                None => Ok((report, counters)),
            }
        })
    }
}

fn worker_panicked(worker: &str, panic: Box<dyn std::any::Any + Send>) -> HistogramError {
    let message = if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    };
    tracing::error!(panic_msg = %message, "Worker {} panicked", worker);
    HistogramError::WorkerFailed {
        worker: worker.to_string(),
        message,
    }
}

impl<S: LineSource, C: ConfigProvider> Pipeline for HistogramPipeline<S, C> {
    fn run(&self) -> Result<RunSummary> {
        let workers = self.config.workers();
        if workers == 0 {
            return Err(HistogramError::InvalidConfigValueError {
                field: "workers".to_string(),
                value: "0".to_string(),
                reason: "At least one consumer is required".to_string(),
            });
        }
        let capacity = NonZeroUsize::new(self.config.queue_capacity()).ok_or_else(|| {
            HistogramError::InvalidConfigValueError {
                field: "queue_capacity".to_string(),
                value: "0".to_string(),
                reason: "Queue capacity must be at least 1".to_string(),
            }
        })?;

        if self
            .state
            .compare_exchange(
                PipelineState::Idle.as_u8(),
                PipelineState::Running.as_u8(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            return Err(HistogramError::ConfigError {
                message: format!("pipeline already started (state: {:?})", self.state()),
            });
        }

        let strategy = self.config.strategy();
        let queue = BoundedQueue::new(capacity);
        let histogram = Histogram::for_strategy(strategy);
        let started = Instant::now();

        tracing::info!(
            "🚀 Processing {} with {} consumers, queue capacity {}, {} strategy",
            self.source.describe(),
            workers,
            capacity,
            strategy
        );

        let outcome = self.execute(workers, &queue, &histogram);
        self.set_state(PipelineState::Done);
        let (report, counters) = outcome?;

        // 所有消費者都已 join，快照不再變動
        let summary = RunSummary {
            reference_date: self.calculator.reference_date(),
            strategy: strategy.to_string(),
            workers,
            queue_capacity: capacity.get(),
            lines_read: report.lines_read,
            counters,
            source_error: report.source_error,
            elapsed: started.elapsed(),
            histogram: histogram.snapshot(),
        };

        tracing::info!(
            "✅ {} lines read: {} accepted, {} malformed, {} out of range, {} blank in {:?}",
            summary.lines_read,
            summary.counters.accepted,
            summary.counters.malformed,
            summary.counters.out_of_range,
            summary.counters.blank,
            summary.elapsed
        );
        Ok(summary)
    }
}
