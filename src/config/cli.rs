use crate::config::settings::{RunSettings, SettingsOverrides};
use crate::config::toml_config::TomlConfig;
use crate::core::report::ReportFormat;
use crate::domain::model::HistogramStrategy;
use crate::utils::error::Result;
use crate::utils::validation::Validate;
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "age-histogram")]
#[command(about = "Concurrent histogram of ages computed from birth dates")]
pub struct CliConfig {
    /// Input file with one YYYY-MM-DD birth date per line
    pub input: Option<PathBuf>,

    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Number of consumer threads (default: available parallelism)
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Capacity of the queue between reader and consumers
    #[arg(long)]
    pub queue_capacity: Option<usize>,

    #[arg(long, value_enum)]
    pub strategy: Option<HistogramStrategy>,

    #[arg(long, value_enum)]
    pub format: Option<ReportFormat>,

    /// Write the report to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Take the date from this 0-based column instead of the whole line
    #[arg(long)]
    pub date_column: Option<usize>,

    /// Column delimiter used with --date-column
    #[arg(long)]
    pub delimiter: Option<String>,

    /// Compute ages at this date instead of today (YYYY-MM-DD)
    #[arg(long)]
    pub reference_date: Option<String>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub log_json: bool,

    #[arg(long, help = "Log CPU and memory usage")]
    pub monitor: bool,
}

impl CliConfig {
    pub fn overrides(&self) -> SettingsOverrides {
        SettingsOverrides {
            workers: self.workers,
            queue_capacity: self.queue_capacity,
            strategy: self.strategy,
            format: self.format,
            output: self.output.clone(),
            date_column: self.date_column,
            delimiter: self.delimiter.clone(),
            reference_date: self.reference_date.clone(),
            monitor: self.monitor,
        }
    }

    /// Loads the optional TOML file and merges it under the flags.
    pub fn load_settings(&self) -> Result<RunSettings> {
        let file = match &self.config {
            Some(path) => {
                tracing::info!("📁 Loading configuration from: {}", path.display());
                let file = TomlConfig::from_file(path)?;
                file.validate()?;
                Some(file)
            }
            None => None,
        };
        RunSettings::resolve(&self.overrides(), file.as_ref())
    }
}
