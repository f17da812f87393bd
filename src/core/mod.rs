pub mod age;
pub mod calendar;
pub mod engine;
pub mod histogram;
pub mod pipeline;
pub mod queue;
pub mod report;

pub use crate::domain::model::{CivilDate, HistogramSnapshot, RunSummary, WorkItem};
pub use crate::domain::ports::{AgeHistogram, ConfigProvider, LineSource, Pipeline};
pub use crate::utils::error::Result;
