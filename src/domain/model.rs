use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Oldest age kept by the bounded histogram domain `[0, MAX_AGE]`.
pub const MAX_AGE: u32 = 130;

/// A proleptic Gregorian calendar date. Month and day are not checked
/// against real month lengths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CivilDate {
    pub year: i64,
    pub month: u32,
    pub day: u32,
}

impl CivilDate {
    pub const fn new(year: i64, month: u32, day: u32) -> Self {
        Self { year, month, day }
    }
}

impl fmt::Display for CivilDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

/// Aggregation strategy, chosen once when the pipeline is built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum HistogramStrategy {
    /// Fixed array of atomic counters for ages `0..=MAX_AGE`.
    #[default]
    Array,
    /// Map with per-key exclusion, unbounded keys.
    Map,
}

impl HistogramStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Array => "array",
            Self::Map => "map",
        }
    }
}

impl fmt::Display for HistogramStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which part of an input line holds the birth date.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DateField {
    #[default]
    WholeLine,
    Column { index: usize, delimiter: char },
}

impl DateField {
    /// Reduces a raw line to its date text, trimmed. `None` when the
    /// column does not exist.
    pub fn extract<'a>(&self, line: &'a str) -> Option<&'a str> {
        match *self {
            Self::WholeLine => Some(line.trim()),
            Self::Column { index, delimiter } => line.split(delimiter).nth(index).map(str::trim),
        }
    }
}

/// One input line travelling from the producer to exactly one consumer.
#[derive(Debug, PartialEq, Eq)]
pub struct WorkItem {
    pub line_no: u64,
    pub text: String,
}

impl WorkItem {
    pub fn new(line_no: u64, text: String) -> Self {
        Self { line_no, text }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistogramEntry {
    pub age: u32,
    pub count: u64,
}

/// Age buckets with a non-zero count, in ascending age order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HistogramSnapshot {
    entries: Vec<HistogramEntry>,
}

impl HistogramSnapshot {
    pub fn from_entries(mut entries: Vec<HistogramEntry>) -> Self {
        entries.retain(|e| e.count > 0);
        entries.sort_unstable_by_key(|e| e.age);
        Self { entries }
    }

    pub fn entries(&self) -> &[HistogramEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &HistogramEntry> {
        self.entries.iter()
    }

    pub fn count(&self, age: u32) -> u64 {
        self.entries
            .binary_search_by_key(&age, |e| e.age)
            .map(|idx| self.entries[idx].count)
            .unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.entries.iter().map(|e| e.count).sum()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineState {
    Idle,
    Running,
    Draining,
    Done,
}

impl PipelineState {
    pub(crate) fn as_u8(self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Running => 1,
            Self::Draining => 2,
            Self::Done => 3,
        }
    }

    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Idle,
            1 => Self::Running,
            2 => Self::Draining,
            _ => Self::Done,
        }
    }
}

/// How each consumer disposed of the lines it popped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineCounters {
    pub accepted: u64,
    pub blank: u64,
    pub malformed: u64,
    pub out_of_range: u64,
}

impl LineCounters {
    pub fn processed(&self) -> u64 {
        self.accepted + self.blank + self.malformed + self.out_of_range
    }

    pub fn merge(&mut self, other: &LineCounters) {
        self.accepted += other.accepted;
        self.blank += other.blank;
        self.malformed += other.malformed;
        self.out_of_range += other.out_of_range;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub reference_date: CivilDate,
    pub strategy: String,
    pub workers: usize,
    pub queue_capacity: usize,
    pub lines_read: u64,
    #[serde(flatten)]
    pub counters: LineCounters,
    pub source_error: Option<String>,
    #[serde(with = "duration_millis")]
    pub elapsed: Duration,
    pub histogram: HistogramSnapshot,
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
