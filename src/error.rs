/*!
 * Error handling for SmartFlow report runs
 *
 * Provides detailed error types with context and suggestions. Every fatal
 * condition in a run ends up here and is surfaced to the user as a single
 * message through [`SmartFlowError::user_message`].
 */

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;
use serde::{Serialize, Deserialize};

/// SmartFlow library result type
pub type Result<T> = std::result::Result<T, SmartFlowError>;

/// Error types with context and suggestions
#[derive(Error, Debug)]
pub enum SmartFlowError {
    /// File I/O errors with context
    #[error("I/O error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
        context: ErrorContext,
    },

    /// CSV parsing errors with location information
    #[error("CSV parsing error at line {line:?}: {message}")]
    CsvParse {
        message: String,
        line: Option<usize>,
        context: ErrorContext,
    },

    /// Workbook (xlsx/xls/ods) read errors
    #[error("Workbook error: {message}")]
    Workbook {
        message: String,
        path: Option<PathBuf>,
    },

    /// One or more required input columns are absent
    #[error("Missing required column(s): {}", missing.join(", "))]
    Schema {
        missing: Vec<String>,
        found: Vec<String>,
    },

    /// Input file with an extension we cannot read
    #[error("Unsupported input file '{path}'")]
    UnsupportedInput {
        path: PathBuf,
        extension: Option<String>,
    },

    /// Workbook without any worksheet to read
    #[error("No worksheet found in '{path}'")]
    NoWorksheet {
        path: PathBuf,
    },

    /// File not found with suggestions
    #[error("File not found: {path}")]
    FileNotFound {
        path: PathBuf,
        suggestion: String,
    },

    /// Configuration and rule profile errors
    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        suggestion: Option<String>,
    },

    /// Export errors
    #[error("Export error: {message}")]
    Export {
        message: String,
        format: ExportFormat,
        suggestion: Option<String>,
    },
}

/// Error context providing additional information
#[derive(Debug, Default, Clone)]
pub struct ErrorContext {
    pub file_path: Option<PathBuf>,
    pub line_number: Option<usize>,
}

/// Output artifact format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Xlsx,
    Csv,
    Json,
}

impl ExportFormat {
    /// File extension used for this format
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Xlsx => "xlsx",
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportFormat::Xlsx => write!(f, "XLSX"),
            ExportFormat::Csv => write!(f, "CSV"),
            ExportFormat::Json => write!(f, "JSON"),
        }
    }
}

impl SmartFlowError {
    /// Create a file not found error with helpful suggestion
    pub fn file_not_found_with_suggestion(path: PathBuf) -> Self {
        let suggestion = format!(
            "Check if the file exists at '{}'. Export the billing report from the clinic system as .xlsx or .csv \
            and make sure you have read permissions.",
            path.display()
        );

        Self::FileNotFound { path, suggestion }
    }

    /// Create a schema error listing every missing column
    pub fn missing_columns(missing: Vec<String>, found: &[String]) -> Self {
        Self::Schema {
            missing,
            found: found.to_vec(),
        }
    }

    /// Create an unsupported input error from a path
    pub fn unsupported_input(path: PathBuf) -> Self {
        let extension = path.extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_string());
        Self::UnsupportedInput { path, extension }
    }

    /// Create an export error without a suggestion
    pub fn export(format: ExportFormat, message: impl Into<String>) -> Self {
        Self::Export {
            message: message.into(),
            format,
            suggestion: None,
        }
    }

    /// Get a user-friendly error message with suggestions
    pub fn user_message(&self) -> String {
        match self {
            Self::FileNotFound { suggestion, .. } => {
                format!("{}\n\nSuggestion: {}", self, suggestion)
            }
            Self::Schema { found, .. } => {
                format!(
                    "{}\n\nColumns found in the file: {}\nColumn names are case-sensitive.",
                    self,
                    if found.is_empty() { "(none)".to_string() } else { found.join(", ") }
                )
            }
            Self::UnsupportedInput { extension, .. } => {
                format!(
                    "{}\n\nSupported inputs: .xlsx, .xlsm, .xls, .ods, .csv (got {})",
                    self,
                    extension.as_deref().unwrap_or("no extension")
                )
            }
            Self::Configuration { suggestion: Some(sug), .. }
            | Self::Export { suggestion: Some(sug), .. } => {
                format!("{}\n\nSuggestion: {}", self, sug)
            }
            _ => self.to_string(),
        }
    }
}

// Convenience conversions
impl From<std::io::Error> for SmartFlowError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: err.to_string(),
            source: err,
            context: ErrorContext::default(),
        }
    }
}

impl From<csv::Error> for SmartFlowError {
    fn from(err: csv::Error) -> Self {
        let line = err.position().map(|pos| pos.line() as usize);

        Self::CsvParse {
            message: err.to_string(),
            line,
            context: ErrorContext::default(),
        }
    }
}

impl From<calamine::Error> for SmartFlowError {
    fn from(err: calamine::Error) -> Self {
        Self::Workbook {
            message: err.to_string(),
            path: None,
        }
    }
}

impl From<rust_xlsxwriter::XlsxError> for SmartFlowError {
    fn from(err: rust_xlsxwriter::XlsxError) -> Self {
        Self::Export {
            message: err.to_string(),
            format: ExportFormat::Xlsx,
            suggestion: Some("Check that sheet names are unique and at most 31 characters.".to_string()),
        }
    }
}

impl From<serde_json::Error> for SmartFlowError {
    fn from(err: serde_json::Error) -> Self {
        Self::Export {
            message: err.to_string(),
            format: ExportFormat::Json,
            suggestion: Some("Check if the data is serializable to JSON.".to_string()),
        }
    }
}

impl From<config::ConfigError> for SmartFlowError {
    fn from(err: config::ConfigError) -> Self {
        Self::Configuration {
            message: err.to_string(),
            suggestion: Some("Check the config file and SMARTFLOW_* environment variables".to_string()),
        }
    }
}
