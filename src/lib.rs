pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use crate::config::CliConfig;

pub use crate::adapters::{FileSource, MemorySource};
pub use crate::config::{PipelineSettings, RunSettings, TomlConfig};
pub use crate::core::age::{compute_age, today_local, AgeCalculator};
pub use crate::core::calendar::{days_from_civil, parse_iso_date};
pub use crate::core::histogram::{AtomicArrayHistogram, Histogram, KeyedHistogram};
pub use crate::core::pipeline::{HistogramPipeline, TerminationSignal};
pub use crate::core::queue::BoundedQueue;
pub use crate::core::report::ReportFormat;
pub use crate::core::{engine::HistogramEngine, Pipeline};
pub use crate::domain::model::{CivilDate, HistogramSnapshot, HistogramStrategy, RunSummary};
pub use crate::utils::error::{HistogramError, Result};
