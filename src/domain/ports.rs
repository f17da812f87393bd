use crate::domain::model::{DateField, HistogramSnapshot, HistogramStrategy, RunSummary};
use crate::utils::error::Result;

/// Where the producer reads its lines from.
pub trait LineSource: Send + Sync {
    type Lines: Iterator<Item = std::io::Result<String>>;

    fn open(&self) -> Result<Self::Lines>;

    /// Human readable name for diagnostics.
    fn describe(&self) -> String;
}

/// Thread-safe accumulation of occurrence counts per integer age.
pub trait AgeHistogram: Send + Sync {
    fn increment(&self, age: u32);

    fn snapshot(&self) -> HistogramSnapshot;
}

pub trait ConfigProvider: Send + Sync {
    fn workers(&self) -> usize;
    fn queue_capacity(&self) -> usize;
    fn strategy(&self) -> HistogramStrategy;
    fn date_field(&self) -> DateField;
}

pub trait Pipeline: Send + Sync {
    fn run(&self) -> Result<RunSummary>;
}
