use serde_json::Value;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::loader::TableLoader;
use crate::annotation::PathAnnotation;
use crate::logging::RunLog;
use crate::report::{ErrorKind, ProcessingReport};
use crate::schema::SourceSpec;

/// Contract every source processor exposes to the orchestrator
///
/// `process` takes no arguments and never fails with `Err`: expected
/// failure modes come back as ERROR reports.
pub trait DataCollector {
    fn source_name(&self) -> &str;
    fn process(&self) -> ProcessingReport;
}

/// Collector for fixed reference tables addressed by a direct file path
pub struct StaticSourceCollector {
    name: String,
    spec: SourceSpec,
    annotated_path: Option<PathBuf>,
}

impl StaticSourceCollector {
    pub fn new(name: impl Into<String>, spec: SourceSpec, annotation: &PathAnnotation) -> Self {
        let name = name.into();
        let annotated_path = annotation.path_for(&name).map(Path::to_path_buf);
        Self {
            name,
            spec,
            annotated_path,
        }
    }

    fn resolved_path(&self) -> &Path {
        self.annotated_path.as_deref().unwrap_or(&self.spec.path)
    }
}

impl DataCollector for StaticSourceCollector {
    fn source_name(&self) -> &str {
        &self.name
    }

    fn process(&self) -> ProcessingReport {
        let mut log = RunLog::new(format!("DataCollector:{}", self.name));
        let path = self.resolved_path();
        if self.annotated_path.is_some() {
            log.info(format!("using annotated path {}", path.display()));
        }
        log.info(format!("collecting static source from {}", path.display()));

        let loaded = TableLoader::load(path);
        if !loaded.ok() {
            return forward_failure(log, loaded);
        }

        let rows = table_rows(&loaded);
        if rows.is_empty() {
            let message = format!("source '{}' table is empty", self.name);
            log.warn(&message);
            let mut report = ProcessingReport::warning(loaded.data.clone(), message);
            copy_metadata(&loaded, &mut report);
            return report.with_log(&log);
        }

        let missing = missing_declared_columns(&self.spec, &rows[0]);
        if !missing.is_empty() {
            let message = format!(
                "source '{}': declared columns missing from table: {}",
                self.name,
                missing.join(", ")
            );
            log.error(&message);
            return ProcessingReport::error(ErrorKind::SchemaMismatch, message).with_log(&log);
        }

        log.info(format!("collected {} rows", rows.len()));
        let mut report = ProcessingReport::success(loaded.data.clone());
        copy_metadata(&loaded, &mut report);
        report.with_log(&log)
    }
}

/// Collector for rolling production exports discovered by name prefix
/// and extension inside the source directory
pub struct DynamicSourceCollector {
    name: String,
    spec: SourceSpec,
    annotated_path: Option<PathBuf>,
}

impl DynamicSourceCollector {
    pub fn new(name: impl Into<String>, spec: SourceSpec, annotation: &PathAnnotation) -> Self {
        let name = name.into();
        let annotated_path = annotation.path_for(&name).map(Path::to_path_buf);
        Self {
            name,
            spec,
            annotated_path,
        }
    }

    /// Newest matching export, by lexicographic file name (exports carry
    /// date-stamped names)
    fn discover(&self, log: &mut RunLog) -> Result<PathBuf, ProcessingReport> {
        let (Some(prefix), Some(extension)) =
            (self.spec.name_start.as_deref(), self.spec.extension.as_deref())
        else {
            let message = format!(
                "source '{}' has no discovery configuration (name_start/extension)",
                self.name
            );
            log.error(&message);
            return Err(ProcessingReport::error(
                ErrorKind::DataProcessingError,
                message,
            ));
        };
        let suffix = format!(".{}", extension.trim_start_matches('.'));

        let entries = match fs::read_dir(&self.spec.path) {
            Ok(entries) => entries,
            Err(e) => {
                let (kind, what) = if e.kind() == io::ErrorKind::NotFound {
                    (ErrorKind::FileNotFound, "not found")
                } else {
                    (ErrorKind::FileReadError, "not readable")
                };
                let message = format!(
                    "source directory {} {what}: {e}",
                    self.spec.path.display()
                );
                log.error(&message);
                return Err(ProcessingReport::error(kind, message));
            }
        };

        let mut candidates: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| name.starts_with(prefix) && name.ends_with(&suffix))
            .collect();
        candidates.sort();

        match candidates.last() {
            Some(chosen) => {
                log.info(format!(
                    "{} file(s) match {prefix}*{suffix}; picking {chosen}",
                    candidates.len()
                ));
                Ok(self.spec.path.join(chosen))
            }
            None => {
                let message = format!(
                    "no file matching {prefix}*{suffix} in {}",
                    self.spec.path.display()
                );
                log.error(&message);
                Err(ProcessingReport::error(ErrorKind::FileNotFound, message))
            }
        }
    }
}

impl DataCollector for DynamicSourceCollector {
    fn source_name(&self) -> &str {
        &self.name
    }

    fn process(&self) -> ProcessingReport {
        let mut log = RunLog::new(format!("DataCollector:{}", self.name));

        let path = match &self.annotated_path {
            Some(path) => {
                log.info(format!("using annotated path {}", path.display()));
                path.clone()
            }
            None => match self.discover(&mut log) {
                Ok(path) => path,
                Err(report) => return report.with_log(&log),
            },
        };
        if let Some(sheet) = self.spec.sheet_name.as_deref() {
            log.debug(format!("sheet '{sheet}' declared for spreadsheet exports"));
        }

        let loaded = TableLoader::load(&path);
        if !loaded.ok() {
            return forward_failure(log, loaded);
        }

        let rows = table_rows(&loaded);
        if rows.is_empty() {
            let message = format!("source '{}' export is empty", self.name);
            log.warn(&message);
            let mut report = ProcessingReport::warning(loaded.data.clone(), message);
            copy_metadata(&loaded, &mut report);
            return report.with_log(&log);
        }

        if let Some(required) = self.spec.required_fields.as_deref() {
            for (index, row) in rows.iter().enumerate() {
                let absent: Vec<&str> = required
                    .iter()
                    .map(String::as_str)
                    .filter(|field| row.get(*field).is_none())
                    .collect();
                if !absent.is_empty() {
                    let message = format!(
                        "source '{}': row {index} of {} is missing required fields: {}",
                        self.name,
                        path.display(),
                        absent.join(", ")
                    );
                    log.error(&message);
                    return ProcessingReport::error(ErrorKind::MissingFields, message)
                        .with_log(&log);
                }
            }
        }

        log.info(format!("collected {} rows", rows.len()));
        let mut report = ProcessingReport::success(loaded.data.clone());
        copy_metadata(&loaded, &mut report);
        report.with_log(&log)
    }
}

fn table_rows(report: &ProcessingReport) -> &[Value] {
    report
        .data
        .as_ref()
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

fn missing_declared_columns<'a>(spec: &'a SourceSpec, first_row: &Value) -> Vec<&'a str> {
    spec.dtypes
        .keys()
        .map(String::as_str)
        .filter(|column| first_row.get(*column).is_none())
        .collect()
}

fn copy_metadata(from: &ProcessingReport, into: &mut ProcessingReport) {
    for (key, value) in &from.metadata {
        if key != "log" {
            into.metadata.insert(key.clone(), value.clone());
        }
    }
}

fn forward_failure(mut log: RunLog, loaded: ProcessingReport) -> ProcessingReport {
    log.error(&loaded.error_message);
    let mut report = ProcessingReport::error(loaded.error_kind, loaded.error_message.clone());
    copy_metadata(&loaded, &mut report);
    report.with_log(&log)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn static_spec(path: PathBuf) -> SourceSpec {
        let mut dtypes = BTreeMap::new();
        dtypes.insert("mold".to_string(), crate::schema::Dtype::Str);
        dtypes.insert("cavities".to_string(), crate::schema::Dtype::Int);
        SourceSpec {
            path,
            dtypes,
            name_start: None,
            extension: None,
            sheet_name: None,
            required_fields: None,
        }
    }

    fn dynamic_spec(dir: PathBuf) -> SourceSpec {
        let mut dtypes = BTreeMap::new();
        dtypes.insert("machine".to_string(), crate::schema::Dtype::Str);
        dtypes.insert("output".to_string(), crate::schema::Dtype::Int);
        SourceSpec {
            path: dir,
            dtypes,
            name_start: Some("shift_".to_string()),
            extension: Some(".json".to_string()),
            sheet_name: Some("Production".to_string()),
            required_fields: Some(vec!["machine".to_string(), "output".to_string()]),
        }
    }

    #[test]
    fn test_static_collection_succeeds() {
        let dir = TempDir::new().unwrap();
        let table = dir.path().join("molds.json");
        fs::write(&table, json!([{"mold": "M-104", "cavities": 4}]).to_string()).unwrap();

        let collector =
            StaticSourceCollector::new("moldsDB", static_spec(table), &PathAnnotation::new());
        let report = collector.process();
        assert!(report.is_success(), "{}", report.error_message);
        assert_eq!(report.metadata["rows"], json!(1));
        assert_eq!(collector.source_name(), "moldsDB");
    }

    #[test]
    fn test_annotation_overrides_schema_path() {
        let dir = TempDir::new().unwrap();
        let moved = dir.path().join("molds_moved.json");
        fs::write(&moved, json!([{"mold": "M-104", "cavities": 4}]).to_string()).unwrap();

        let mut annotation = PathAnnotation::new();
        annotation.insert("moldsDB", moved.clone());
        let spec = static_spec(dir.path().join("molds.json"));

        let report = StaticSourceCollector::new("moldsDB", spec, &annotation).process();
        assert!(report.is_success());
        assert!(report.log_text().contains("using annotated path"));
    }

    #[test]
    fn test_static_missing_declared_column_is_schema_mismatch() {
        let dir = TempDir::new().unwrap();
        let table = dir.path().join("molds.json");
        fs::write(&table, json!([{"mold": "M-104"}]).to_string()).unwrap();

        let report =
            StaticSourceCollector::new("moldsDB", static_spec(table), &PathAnnotation::new())
                .process();
        assert_eq!(report.error_kind, ErrorKind::SchemaMismatch);
        assert!(report.error_message.contains("cavities"));
    }

    #[test]
    fn test_empty_table_is_a_warning() {
        let dir = TempDir::new().unwrap();
        let table = dir.path().join("molds.json");
        fs::write(&table, "[]").unwrap();

        let report =
            StaticSourceCollector::new("moldsDB", static_spec(table), &PathAnnotation::new())
                .process();
        assert!(report.ok());
        assert!(!report.is_success());
        assert!(report.error_message.contains("empty"));
    }

    #[test]
    fn test_dynamic_discovery_picks_newest_export() {
        let dir = TempDir::new().unwrap();
        let rows = json!([{"machine": "IM-03", "output": 1180}]).to_string();
        fs::write(dir.path().join("shift_20260823.json"), &rows).unwrap();
        fs::write(dir.path().join("shift_20260824.json"), &rows).unwrap();
        fs::write(dir.path().join("orders_20260824.json"), &rows).unwrap();

        let collector = DynamicSourceCollector::new(
            "shiftDB",
            dynamic_spec(dir.path().to_path_buf()),
            &PathAnnotation::new(),
        );
        let report = collector.process();
        assert!(report.is_success(), "{}", report.error_message);
        assert!(report.metadata["path"]
            .as_str()
            .unwrap()
            .ends_with("shift_20260824.json"));
        assert!(report.log_text().contains("2 file(s) match"));
    }

    #[test]
    fn test_dynamic_no_match_is_file_not_found() {
        let dir = TempDir::new().unwrap();
        let report = DynamicSourceCollector::new(
            "shiftDB",
            dynamic_spec(dir.path().to_path_buf()),
            &PathAnnotation::new(),
        )
        .process();
        assert_eq!(report.error_kind, ErrorKind::FileNotFound);
        assert!(report.error_message.contains("shift_*.json"));
    }

    #[test]
    fn test_dynamic_missing_required_field_names_the_row() {
        let dir = TempDir::new().unwrap();
        let rows = json!([
            {"machine": "IM-03", "output": 1180},
            {"machine": "IM-04"}
        ]);
        fs::write(dir.path().join("shift_20260824.json"), rows.to_string()).unwrap();

        let report = DynamicSourceCollector::new(
            "shiftDB",
            dynamic_spec(dir.path().to_path_buf()),
            &PathAnnotation::new(),
        )
        .process();
        assert_eq!(report.error_kind, ErrorKind::MissingFields);
        assert!(report.error_message.contains("row 1"));
        assert!(report.error_message.contains("output"));
    }
}
