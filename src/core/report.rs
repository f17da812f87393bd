use crate::domain::model::RunSummary;
use crate::utils::error::Result;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// `La edad {age} tiene {count} ocurrencias`, one line per bucket
    #[default]
    Text,
    /// `age,count` header followed by one row per bucket
    Csv,
    /// The whole run summary
    Json,
}

pub fn write_report<W: Write>(summary: &RunSummary, format: ReportFormat, mut writer: W) -> Result<()> {
    match format {
        ReportFormat::Text => {
            for entry in summary.histogram.iter() {
                writeln!(writer, "La edad {} tiene {} ocurrencias", entry.age, entry.count)?;
            }
        }
        ReportFormat::Csv => {
            let mut csv_writer = csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(&mut writer);
            csv_writer.write_record(["age", "count"])?;
            for entry in summary.histogram.iter() {
                csv_writer.serialize(entry)?;
            }
            csv_writer.flush()?;
        }
        ReportFormat::Json => {
            serde_json::to_writer_pretty(&mut writer, summary)?;
            writeln!(writer)?;
        }
    }
    writer.flush()?;
    Ok(())
}

/// Writes to `path` when given, otherwise to stdout.
pub fn emit(summary: &RunSummary, format: ReportFormat, path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            let file = BufWriter::new(File::create(path)?);
            write_report(summary, format, file)?;
            tracing::info!("📁 Report saved to: {}", path.display());
        }
        None => {
            let stdout = std::io::stdout();
            write_report(summary, format, stdout.lock())?;
        }
    }
    Ok(())
}
