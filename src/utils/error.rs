use thiserror::Error;

#[derive(Error, Debug)]
pub enum HistogramError {
    #[error("Invalid date format, expected YYYY-MM-DD: {text:?}")]
    DateFormat { text: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV processing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Cannot open input '{path}': {source}")]
    SourceUnavailable {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Worker '{worker}' failed: {message}")]
    WorkerFailed { worker: String, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl HistogramError {
    pub fn date_format(text: impl Into<String>) -> Self {
        Self::DateFormat { text: text.into() }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // 單行錯誤與來源錯誤都不中斷整批處理
            Self::DateFormat { .. } | Self::SourceUnavailable { .. } => ErrorSeverity::Low,
            Self::Io(_) | Self::Csv(_) | Self::Serialization(_) => ErrorSeverity::Medium,
            Self::ConfigError { .. }
            | Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. } => ErrorSeverity::High,
            Self::WorkerFailed { .. } => ErrorSeverity::Critical,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::DateFormat { text } => format!("'{}' is not a YYYY-MM-DD date", text),
            Self::SourceUnavailable { path, .. } => format!("No se pudo abrir: {}", path),
            Self::InvalidConfigValueError { field, value, .. } => {
                format!("Invalid value '{}' for {}", value, field)
            }
            Self::ConfigValidationError { field, .. } => format!("Invalid configuration: {}", field),
            Self::WorkerFailed { worker, .. } => format!("Worker {} stopped unexpectedly", worker),
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::DateFormat { .. } => "Write birth dates as YYYY-MM-DD, one per line",
            Self::SourceUnavailable { .. } => "Check that the input path exists and is readable",
            Self::Io(_) => "Check file permissions and available disk space",
            Self::Csv(_) | Self::Serialization(_) => "Try another --format or output location",
            Self::ConfigError { .. } | Self::ConfigValidationError { .. } => {
                "Review the TOML configuration file and command line flags"
            }
            Self::InvalidConfigValueError { .. } => "Run with --help to see accepted values",
            Self::WorkerFailed { .. } => "Re-run with --verbose and report the log output",
        }
    }
}

pub type Result<T> = std::result::Result<T, HistogramError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_errors_are_low_severity() {
        let err = HistogramError::SourceUnavailable {
            path: "missing.txt".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        };
        assert_eq!(err.severity(), ErrorSeverity::Low);
        assert_eq!(err.user_friendly_message(), "No se pudo abrir: missing.txt");
    }

    #[test]
    fn test_config_errors_are_high_severity() {
        let err = HistogramError::InvalidConfigValueError {
            field: "workers".to_string(),
            value: "0".to_string(),
            reason: "Value must be at least 1".to_string(),
        };
        assert_eq!(err.severity(), ErrorSeverity::High);
        assert!(err.to_string().contains("workers"));
    }
}
