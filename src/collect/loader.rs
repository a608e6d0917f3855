use serde_json::Value;
use std::fmt;
use std::fs;
use std::path::Path;

use crate::integrity::Checksum;
use crate::logging::RunLog;
use crate::report::{ErrorKind, ProcessingReport};

/// Table file formats the pipeline recognizes
///
/// Selection is by file extension only. JSON is the native format; the
/// spreadsheet and parquet parsers live outside this crate, so those
/// formats are recognized but reported as unsupported here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Json,
    Parquet,
    Xlsx,
    Xlsb,
}

impl TableFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "json" => Some(TableFormat::Json),
            "parquet" => Some(TableFormat::Parquet),
            "xlsx" => Some(TableFormat::Xlsx),
            "xlsb" => Some(TableFormat::Xlsb),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TableFormat::Json => "json",
            TableFormat::Parquet => "parquet",
            TableFormat::Xlsx => "xlsx",
            TableFormat::Xlsb => "xlsb",
        }
    }

    pub fn has_parser(&self) -> bool {
        matches!(self, TableFormat::Json)
    }
}

impl fmt::Display for TableFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Loads one table file into an array of row objects
pub struct TableLoader;

impl TableLoader {
    pub fn load<P: AsRef<Path>>(path: P) -> ProcessingReport {
        let path = path.as_ref();
        let mut log = RunLog::new("TableLoader");

        let format = match TableFormat::from_path(path) {
            Some(format) => format,
            None => {
                let message = format!(
                    "unrecognized table extension on {} (known: json, parquet, xlsx, xlsb)",
                    path.display()
                );
                log.error(&message);
                return ProcessingReport::error(ErrorKind::UnsupportedDataType, message)
                    .with_log(&log);
            }
        };
        if !format.has_parser() {
            let message = format!(
                "no parser available for {format} tables: {}",
                path.display()
            );
            log.error(&message);
            return ProcessingReport::error(ErrorKind::UnsupportedDataType, message)
                .with_log(&log);
        }

        if !path.exists() {
            let message = format!("table file not found: {}", path.display());
            log.error(&message);
            return ProcessingReport::error(ErrorKind::FileNotFound, message).with_log(&log);
        }

        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                let message = format!("failed to read table {}: {}", path.display(), e);
                log.error(&message);
                return ProcessingReport::error(ErrorKind::FileReadError, message).with_log(&log);
            }
        };

        let rows: Value = match serde_json::from_str(&contents) {
            Ok(rows) => rows,
            Err(e) => {
                let message = format!("table {} is not valid JSON: {}", path.display(), e);
                log.error(&message);
                return ProcessingReport::error(ErrorKind::InvalidJson, message).with_log(&log);
            }
        };

        let Some(row_slice) = rows.as_array() else {
            let message = format!(
                "table {} must be a JSON array of row objects",
                path.display()
            );
            log.error(&message);
            return ProcessingReport::error(ErrorKind::FileNotValid, message).with_log(&log);
        };
        if let Some(position) = row_slice.iter().position(|row| !row.is_object()) {
            let message = format!(
                "table {}: row {position} is not an object",
                path.display()
            );
            log.error(&message);
            return ProcessingReport::error(ErrorKind::FileNotValid, message).with_log(&log);
        }

        let row_count = row_slice.len();
        log.info(format!("loaded {row_count} rows from {}", path.display()));

        let mut report = ProcessingReport::success(Some(rows))
            .with_metadata("rows", Value::from(row_count))
            .with_metadata("path", Value::String(path.display().to_string()));
        match Checksum::from_file(path) {
            Ok(checksum) => {
                report = report.with_metadata("sha256", Value::String(checksum.value));
            }
            Err(e) => log.warn(format!("could not hash {}: {}", path.display(), e)),
        }
        report.with_log(&log)
    }
}
