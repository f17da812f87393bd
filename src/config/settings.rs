use crate::config::toml_config::TomlConfig;
use crate::core::calendar::parse_iso_date;
use crate::core::report::ReportFormat;
use crate::domain::model::{CivilDate, DateField, HistogramStrategy};
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{HistogramError, Result};
use crate::utils::validation::{
    validate_path, validate_positive_number, validate_range, validate_single_char, Validate,
};
use std::num::NonZeroUsize;
use std::path::PathBuf;

pub const DEFAULT_QUEUE_CAPACITY: usize = 131_072;
pub const MAX_WORKERS: usize = 1024;
pub const DEFAULT_DELIMITER: char = ',';

pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}

/// Settings the pipeline itself consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineSettings {
    pub workers: usize,
    pub queue_capacity: usize,
    pub strategy: HistogramStrategy,
    pub date_field: DateField,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            strategy: HistogramStrategy::default(),
            date_field: DateField::default(),
        }
    }
}

impl ConfigProvider for PipelineSettings {
    fn workers(&self) -> usize {
        self.workers
    }

    fn queue_capacity(&self) -> usize {
        self.queue_capacity
    }

    fn strategy(&self) -> HistogramStrategy {
        self.strategy
    }

    fn date_field(&self) -> DateField {
        self.date_field
    }
}

impl Validate for PipelineSettings {
    fn validate(&self) -> Result<()> {
        validate_range("workers", self.workers, 1, MAX_WORKERS)?;
        validate_positive_number("queue_capacity", self.queue_capacity, 1)?;
        Ok(())
    }
}

/// Values given on the command line; `None` falls through to the TOML
/// file and then to the defaults.
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub workers: Option<usize>,
    pub queue_capacity: Option<usize>,
    pub strategy: Option<HistogramStrategy>,
    pub format: Option<ReportFormat>,
    pub output: Option<PathBuf>,
    pub date_column: Option<usize>,
    pub delimiter: Option<String>,
    pub reference_date: Option<String>,
    pub monitor: bool,
}

/// Everything one run needs, after merging CLI, TOML and defaults.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub pipeline: PipelineSettings,
    pub format: ReportFormat,
    pub output_path: Option<PathBuf>,
    pub reference_date: Option<CivilDate>,
    pub monitor: bool,
}

impl RunSettings {
    pub fn resolve(overrides: &SettingsOverrides, file: Option<&TomlConfig>) -> Result<Self> {
        let fallback = TomlConfig::default();
        let file = file.unwrap_or(&fallback);

        let delimiter = match overrides.delimiter.as_deref().or(file.input.delimiter.as_deref()) {
            Some(value) => validate_single_char("delimiter", value)?,
            None => DEFAULT_DELIMITER,
        };
        let date_field = match overrides.date_column.or(file.input.date_column) {
            Some(index) => DateField::Column { index, delimiter },
            None => DateField::WholeLine,
        };

        let pipeline = PipelineSettings {
            workers: overrides
                .workers
                .or(file.pipeline.workers)
                .unwrap_or_else(default_workers),
            queue_capacity: overrides
                .queue_capacity
                .or(file.pipeline.queue_capacity)
                .unwrap_or(DEFAULT_QUEUE_CAPACITY),
            strategy: overrides.strategy.or(file.pipeline.strategy).unwrap_or_default(),
            date_field,
        };
        pipeline.validate()?;

        let reference_date = overrides
            .reference_date
            .as_deref()
            .or(file.input.reference_date.as_deref())
            .map(|text| {
                parse_iso_date(text).map_err(|_| HistogramError::InvalidConfigValueError {
                    field: "reference_date".to_string(),
                    value: text.to_string(),
                    reason: "Expected YYYY-MM-DD".to_string(),
                })
            })
            .transpose()?;

        let output_path = overrides
            .output
            .clone()
            .or_else(|| file.output.path.as_ref().map(PathBuf::from));
        if let Some(path) = &output_path {
            validate_path("output", &path.to_string_lossy())?;
        }

        let settings = Self {
            pipeline,
            format: overrides.format.or(file.output.format).unwrap_or_default(),
            output_path,
            reference_date,
            monitor: overrides.monitor || file.monitoring_enabled(),
        };
        tracing::debug!("Resolved settings: {:?}", settings);
        Ok(settings)
    }
}
