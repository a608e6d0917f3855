use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

use super::model::{DataSchema, Dtype, SourceKind};
use crate::logging::RunLog;
use crate::report::{ErrorKind, ProcessingReport};

const REQUIRED_TOP_LEVEL_KEYS: [&str; 2] = ["staticDB", "dynamicDB"];
const REQUIRED_SOURCE_KEYS: [&str; 2] = ["path", "dtypes"];
const REQUIRED_DYNAMIC_KEYS: [&str; 3] = ["name_start", "sheet_name", "required_fields"];
const KNOWN_SOURCE_KEYS: [&str; 7] = [
    "path",
    "dtypes",
    "name_start",
    "extension",
    "file_extension",
    "sheet_name",
    "required_fields",
];

/// Validates the schema document against the source contract
///
/// Hard errors (missing required keys, non-object values, unknown dtype
/// tags, required fields absent from dtypes) produce an ERROR report;
/// cosmetic issues (unrecognized keys, empty or duplicated required
/// fields) only downgrade the report to WARNING, which callers may
/// proceed on.
pub struct SchemaValidator {
    schema_path: PathBuf,
}

impl SchemaValidator {
    pub fn new<P: AsRef<Path>>(schema_path: P) -> Self {
        Self {
            schema_path: schema_path.as_ref().to_path_buf(),
        }
    }

    pub fn schema_path(&self) -> &Path {
        &self.schema_path
    }

    /// Validate the schema file and return the document as report data
    pub fn validate(&self) -> ProcessingReport {
        let mut log = RunLog::new("SchemaValidator");
        log.info(format!("validating schema {}", self.schema_path.display()));

        if !self.schema_path.exists() {
            let message = format!("schema file not found: {}", self.schema_path.display());
            log.error(&message);
            return ProcessingReport::error(ErrorKind::FileNotFound, message).with_log(&log);
        }

        let contents = match fs::read_to_string(&self.schema_path) {
            Ok(contents) => contents,
            Err(e) => {
                let message = format!(
                    "failed to read schema {}: {}",
                    self.schema_path.display(),
                    e
                );
                log.error(&message);
                return ProcessingReport::error(ErrorKind::FileReadError, message).with_log(&log);
            }
        };

        let document: Value = match serde_json::from_str(&contents) {
            Ok(document) => document,
            Err(e) => {
                let message = format!("schema is not valid JSON: {e}");
                log.error(&message);
                return ProcessingReport::error(ErrorKind::InvalidJson, message).with_log(&log);
            }
        };

        let Some(root) = document.as_object() else {
            let message = "schema top level must be a JSON object".to_string();
            log.error(&message);
            return ProcessingReport::error(ErrorKind::InvalidSchemaStructure, message)
                .with_log(&log);
        };

        let mut errors: Vec<(ErrorKind, String)> = Vec::new();
        let mut warnings: Vec<String> = Vec::new();

        let missing_keys: Vec<&str> = REQUIRED_TOP_LEVEL_KEYS
            .iter()
            .copied()
            .filter(|key| !root.contains_key(*key))
            .collect();
        if !missing_keys.is_empty() {
            errors.push((
                ErrorKind::MissingFields,
                format!(
                    "schema is missing required top-level keys: {}",
                    missing_keys.join(", ")
                ),
            ));
        }

        for key in root.keys() {
            if !REQUIRED_TOP_LEVEL_KEYS.contains(&key.as_str()) {
                warnings.push(format!("unrecognized top-level key '{key}'"));
            }
        }

        for kind in SourceKind::ALL {
            let Some(category) = root.get(kind.as_str()) else {
                continue;
            };
            match category.as_object() {
                Some(entries) => {
                    for (name, entry) in entries {
                        validate_source(kind, name, entry, &mut errors, &mut warnings);
                    }
                }
                None => errors.push((
                    ErrorKind::InvalidSchemaStructure,
                    format!("'{kind}' must be an object keyed by source name"),
                )),
            }
        }

        if errors.is_empty() {
            // Guard the typed view later phases rely on
            if let Err(e) = DataSchema::from_value(&document) {
                errors.push((
                    ErrorKind::InvalidSchemaStructure,
                    format!("schema failed typed decoding: {e}"),
                ));
            }
        }

        if !errors.is_empty() {
            let error_kind = errors[0].0;
            let message = errors
                .iter()
                .map(|(_, text)| text.as_str())
                .collect::<Vec<_>>()
                .join("; ");
            log.error(format!("schema validation failed: {message}"));
            return ProcessingReport::error(error_kind, message)
                .with_metadata("error_count", Value::from(errors.len()))
                .with_log(&log);
        }

        let static_sources = count_sources(root, SourceKind::Static);
        let dynamic_sources = count_sources(root, SourceKind::Dynamic);
        log.info(format!(
            "schema valid: {static_sources} static and {dynamic_sources} dynamic sources"
        ));

        if !warnings.is_empty() {
            for warning in &warnings {
                log.warn(warning);
            }
            let message = warnings.join("; ");
            return ProcessingReport::warning(Some(document), message)
                .with_metadata("static_sources", Value::from(static_sources))
                .with_metadata("dynamic_sources", Value::from(dynamic_sources))
                .with_metadata(
                    "warnings",
                    Value::Array(warnings.into_iter().map(Value::String).collect()),
                )
                .with_log(&log);
        }

        ProcessingReport::success(Some(document))
            .with_metadata("static_sources", Value::from(static_sources))
            .with_metadata("dynamic_sources", Value::from(dynamic_sources))
            .with_log(&log)
    }
}

fn count_sources(root: &Map<String, Value>, kind: SourceKind) -> usize {
    root.get(kind.as_str())
        .and_then(Value::as_object)
        .map(Map::len)
        .unwrap_or(0)
}

fn validate_source(
    kind: SourceKind,
    name: &str,
    entry: &Value,
    errors: &mut Vec<(ErrorKind, String)>,
    warnings: &mut Vec<String>,
) {
    let Some(fields) = entry.as_object() else {
        errors.push((
            ErrorKind::InvalidSchemaStructure,
            format!("source '{name}' in {kind} must be an object"),
        ));
        return;
    };

    let mut missing: Vec<&str> = REQUIRED_SOURCE_KEYS
        .iter()
        .copied()
        .filter(|key| !fields.contains_key(*key))
        .collect();
    if kind == SourceKind::Dynamic {
        missing.extend(
            REQUIRED_DYNAMIC_KEYS
                .iter()
                .copied()
                .filter(|key| !fields.contains_key(*key)),
        );
        if !fields.contains_key("extension") && !fields.contains_key("file_extension") {
            missing.push("extension");
        }
    }
    if !missing.is_empty() {
        errors.push((
            ErrorKind::MissingFields,
            format!(
                "source '{name}' in {kind} is missing required keys: {}",
                missing.join(", ")
            ),
        ));
    }

    for key in fields.keys() {
        if !KNOWN_SOURCE_KEYS.contains(&key.as_str()) {
            warnings.push(format!("unrecognized key '{key}' in source '{name}'"));
        }
    }

    if let Some(path) = fields.get("path") {
        if !path.is_string() {
            errors.push((
                ErrorKind::InvalidSchemaStructure,
                format!("source '{name}': 'path' must be a string"),
            ));
        }
    }

    for key in ["name_start", "extension", "file_extension", "sheet_name"] {
        if let Some(value) = fields.get(key) {
            if !value.is_string() {
                errors.push((
                    ErrorKind::InvalidSchemaStructure,
                    format!("source '{name}': '{key}' must be a string"),
                ));
            }
        }
    }

    let declared_columns = match fields.get("dtypes") {
        Some(Value::Object(dtypes)) => {
            for (column, tag) in dtypes {
                match tag.as_str() {
                    Some(tag) if Dtype::parse(tag).is_some() => {}
                    Some(tag) => errors.push((
                        ErrorKind::InvalidSchemaStructure,
                        format!(
                            "source '{name}': unknown dtype tag '{tag}' for column \
                             '{column}' (allowed: {})",
                            Dtype::ALLOWED.join(", ")
                        ),
                    )),
                    None => errors.push((
                        ErrorKind::InvalidSchemaStructure,
                        format!("source '{name}': dtype for column '{column}' must be a string"),
                    )),
                }
            }
            Some(dtypes)
        }
        Some(_) => {
            errors.push((
                ErrorKind::InvalidSchemaStructure,
                format!("source '{name}': 'dtypes' must be an object"),
            ));
            None
        }
        None => None,
    };

    match fields.get("required_fields") {
        Some(Value::Array(entries)) => {
            if entries.is_empty() {
                warnings.push(format!("source '{name}': 'required_fields' is empty"));
            }
            let mut seen: Vec<&str> = Vec::new();
            for value in entries {
                let Some(field) = value.as_str() else {
                    errors.push((
                        ErrorKind::InvalidSchemaStructure,
                        format!("source '{name}': 'required_fields' entries must be strings"),
                    ));
                    continue;
                };
                if seen.contains(&field) {
                    warnings.push(format!(
                        "source '{name}': duplicate required field '{field}'"
                    ));
                } else {
                    seen.push(field);
                }
                if let Some(dtypes) = declared_columns {
                    if !dtypes.contains_key(field) {
                        errors.push((
                            ErrorKind::InvalidSchemaStructure,
                            format!(
                                "source '{name}': required field '{field}' is not declared \
                                 in dtypes"
                            ),
                        ));
                    }
                }
            }
        }
        Some(_) => errors.push((
            ErrorKind::InvalidSchemaStructure,
            format!("source '{name}': 'required_fields' must be an array"),
        )),
        None => {}
    }
}
