use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use crate::logging::RunLog;

/// Status of one processing attempt
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessingStatus {
    Success,
    PartialSuccess,
    Warning,
    Pending,
    Skip,
    Error,
}

impl ProcessingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingStatus::Success => "SUCCESS",
            ProcessingStatus::PartialSuccess => "PARTIAL_SUCCESS",
            ProcessingStatus::Warning => "WARNING",
            ProcessingStatus::Pending => "PENDING",
            ProcessingStatus::Skip => "SKIP",
            ProcessingStatus::Error => "ERROR",
        }
    }

    /// True for statuses a caller may proceed on
    pub fn ok(&self) -> bool {
        matches!(
            self,
            ProcessingStatus::Success | ProcessingStatus::PartialSuccess | ProcessingStatus::Warning
        )
    }
}

impl fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Classification of a processing failure
///
/// Control flow keys off `ProcessingStatus`; the kind exists for recovery
/// directive selection and notification enrichment.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    FileNotFound,
    FileReadError,
    FileNotValid,
    MissingFields,
    DataProcessingError,
    UnsupportedDataType,
    HashComparisonError,
    DataCorruption,
    SchemaMismatch,
    InvalidJson,
    InvalidSchemaStructure,
    ParquetSaveError,
    None,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::FileNotFound => "file_not_found",
            ErrorKind::FileReadError => "file_read_error",
            ErrorKind::FileNotValid => "file_not_valid",
            ErrorKind::MissingFields => "missing_fields",
            ErrorKind::DataProcessingError => "data_processing_error",
            ErrorKind::UnsupportedDataType => "unsupported_data_type",
            ErrorKind::HashComparisonError => "hash_comparison_error",
            ErrorKind::DataCorruption => "data_corruption",
            ErrorKind::SchemaMismatch => "schema_mismatch",
            ErrorKind::InvalidJson => "invalid_json",
            ErrorKind::InvalidSchemaStructure => "invalid_schema_structure",
            ErrorKind::ParquetSaveError => "parquet_save_error",
            ErrorKind::None => "none",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Uniform result value returned by every pipeline stage
///
/// Schema validation, per-source collection, healing, and notification all
/// speak this type, so the orchestrator never needs to know which kind of
/// stage produced a given result. Treated as an immutable value once
/// returned: a "final" report is produced by composing or replacing, never
/// by mutating in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingReport {
    pub status: ProcessingStatus,
    /// Opaque payload (a table, a mapping, or nothing); forwarded, never
    /// interpreted by the recovery core
    pub data: Option<Value>,
    pub error_kind: ErrorKind,
    pub error_message: String,
    /// Diagnostic key/value pairs; always carries a `"log"` entry with the
    /// stage's human-readable narrative
    pub metadata: BTreeMap<String, Value>,
}

impl ProcessingReport {
    fn new(status: ProcessingStatus, error_kind: ErrorKind, error_message: String) -> Self {
        let mut metadata = BTreeMap::new();
        metadata.insert("log".to_string(), Value::String(String::new()));
        Self {
            status,
            data: None,
            error_kind,
            error_message,
            metadata,
        }
    }

    pub fn success(data: Option<Value>) -> Self {
        let mut report = Self::new(ProcessingStatus::Success, ErrorKind::None, String::new());
        report.data = data;
        report
    }

    pub fn partial_success(data: Option<Value>, message: impl Into<String>) -> Self {
        let mut report = Self::new(
            ProcessingStatus::PartialSuccess,
            ErrorKind::None,
            message.into(),
        );
        report.data = data;
        report
    }

    pub fn warning(data: Option<Value>, message: impl Into<String>) -> Self {
        let mut report = Self::new(ProcessingStatus::Warning, ErrorKind::None, message.into());
        report.data = data;
        report
    }

    pub fn pending() -> Self {
        Self::new(ProcessingStatus::Pending, ErrorKind::None, String::new())
    }

    pub fn skip(message: impl Into<String>) -> Self {
        Self::new(ProcessingStatus::Skip, ErrorKind::None, message.into())
    }

    pub fn error(error_kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::new(ProcessingStatus::Error, error_kind, message.into())
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Render the stage narrative into the `"log"` metadata entry
    pub fn with_log(mut self, log: &RunLog) -> Self {
        self.metadata
            .insert("log".to_string(), Value::String(log.render()));
        self
    }

    pub fn log_text(&self) -> &str {
        self.metadata
            .get("log")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    pub fn is_success(&self) -> bool {
        self.status == ProcessingStatus::Success
    }

    pub fn is_error(&self) -> bool {
        self.status == ProcessingStatus::Error
    }

    /// True for SUCCESS, PARTIAL_SUCCESS and WARNING
    pub fn ok(&self) -> bool {
        self.status.ok()
    }
}
