use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

use super::decision::{DecisionStatus, RecoveryAction, RecoveryDecision, RecoveryScale};
use crate::annotation::BackupAnnotation;
use crate::collect::TableLoader;
use crate::error::FabricaError;
use crate::integrity::Checksum;
use crate::logging::RunLog;
use crate::report::{ErrorKind, ProcessingReport};
use crate::schema::SchemaValidator;

/// The designated backup artifact a healer may roll back to
///
/// Existence checks swallow filesystem access errors: an unreadable
/// backup is handled exactly like an absent one. `restore` is called at
/// most once per heal, however many directives are eligible.
pub trait BackupSource {
    fn describe(&self) -> String;
    fn exists(&self) -> bool;
    fn restore(&self) -> ProcessingReport;
}

/// Attempts automatic LOCAL-scale recovery from a backup artifact
///
/// The healer acts only on (LOCAL, ROLLBACK_TO_BACKUP, PENDING)
/// directives; everything else passes through untouched so the notifier
/// downstream sees the complete decision set. It never reports a success
/// it did not achieve: unless the backup restores cleanly, the original
/// failed outcome stays authoritative. It also never fails with `Err`;
/// every internal problem resolves the eligible directives to ERROR.
pub struct LocalHealer<S: BackupSource> {
    label: String,
    directives: Vec<RecoveryDecision>,
    outcome: ProcessingReport,
    backup: S,
}

impl<S: BackupSource> LocalHealer<S> {
    pub fn new(
        label: impl Into<String>,
        directives: Vec<RecoveryDecision>,
        outcome: ProcessingReport,
        backup: S,
    ) -> Self {
        Self {
            label: label.into(),
            directives,
            outcome,
            backup,
        }
    }

    fn is_eligible(directive: &RecoveryDecision) -> bool {
        directive.scale == RecoveryScale::Local
            && directive.action == RecoveryAction::RollbackToBackup
            && directive.is_pending()
    }

    /// Pure eligibility partition: every directive comes back as an
    /// independent copy tagged with whether this healer may act on it now
    fn classify(directives: &[RecoveryDecision]) -> Vec<(bool, RecoveryDecision)> {
        directives
            .iter()
            .map(|directive| (Self::is_eligible(directive), directive.clone()))
            .collect()
    }

    /// Run the heal attempt
    ///
    /// Returns all directives (eligible ones resolved) and the
    /// authoritative outcome: either the restored backup data with
    /// status SUCCESS, or the unchanged original failure.
    pub fn heal(self) -> (Vec<RecoveryDecision>, ProcessingReport) {
        let mut log = RunLog::new(format!("LocalHealer:{}", self.label));
        let mut classified = Self::classify(&self.directives);
        let eligible_count = classified.iter().filter(|(eligible, _)| *eligible).count();

        if eligible_count == 0 {
            log.info("no LOCAL rollback directives pending; nothing to heal");
            let directives = classified.into_iter().map(|(_, d)| d).collect();
            return (directives, self.outcome);
        }

        log.info(format!(
            "{eligible_count} directive(s) eligible; rolling back to {}",
            self.backup.describe()
        ));

        if !self.backup.exists() {
            log.error(format!("backup unavailable: {}", self.backup.describe()));
            let directives = resolve_eligible(&mut classified, DecisionStatus::Error);
            return (directives, self.outcome);
        }

        // One restore attempt, shared by every eligible directive
        let restored = self.backup.restore();
        if restored.is_success() {
            log.info("backup restored and re-validated; adopting recovered data");
            let directives = resolve_eligible(&mut classified, DecisionStatus::Success);
            (directives, restored.with_log(&log))
        } else {
            log.error(format!(
                "backup restore failed ({}): {}",
                restored.error_kind, restored.error_message
            ));
            let directives = resolve_eligible(&mut classified, DecisionStatus::Error);
            (directives, self.outcome)
        }
    }
}

fn resolve_eligible(
    classified: &mut Vec<(bool, RecoveryDecision)>,
    status: DecisionStatus,
) -> Vec<RecoveryDecision> {
    for (eligible, directive) in classified.iter_mut() {
        if *eligible {
            directive.resolve(status);
        }
    }
    std::mem::take(classified)
        .into_iter()
        .map(|(_, directive)| directive)
        .collect()
}

/// Backup variant for the schema phase: a schema-shaped JSON file that
/// is re-validated through the normal schema validator
pub struct SchemaBackup {
    path: PathBuf,
}

impl SchemaBackup {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl BackupSource for SchemaBackup {
    fn describe(&self) -> String {
        format!("backup schema {}", self.path.display())
    }

    fn exists(&self) -> bool {
        fs::metadata(&self.path)
            .map(|meta| meta.is_file())
            .unwrap_or(false)
    }

    fn restore(&self) -> ProcessingReport {
        SchemaValidator::new(&self.path).validate()
    }
}

/// Backup variant for the collection phase: a backup annotation naming
/// one rollback table per source, optionally checksummed
pub struct SourceBackup {
    annotation_path: PathBuf,
    source: String,
    required_fields: Option<Vec<String>>,
}

impl SourceBackup {
    pub fn new<P: AsRef<Path>>(annotation_path: P, source: impl Into<String>) -> Self {
        Self {
            annotation_path: annotation_path.as_ref().to_path_buf(),
            source: source.into(),
            required_fields: None,
        }
    }

    /// Re-validate these fields on every restored row
    pub fn with_required_fields(mut self, fields: Vec<String>) -> Self {
        self.required_fields = Some(fields);
        self
    }
}

impl BackupSource for SourceBackup {
    fn describe(&self) -> String {
        format!(
            "backup annotation {} (source '{}')",
            self.annotation_path.display(),
            self.source
        )
    }

    fn exists(&self) -> bool {
        fs::metadata(&self.annotation_path)
            .map(|meta| meta.is_file())
            .unwrap_or(false)
    }

    fn restore(&self) -> ProcessingReport {
        let annotation = match BackupAnnotation::load(&self.annotation_path) {
            Ok(annotation) => annotation,
            Err(FabricaError::Json(e)) => {
                return ProcessingReport::error(
                    ErrorKind::InvalidJson,
                    format!("backup annotation is not valid JSON: {e}"),
                );
            }
            Err(e) => {
                return ProcessingReport::error(
                    ErrorKind::FileReadError,
                    format!("backup annotation unreadable: {e}"),
                );
            }
        };

        let Some(backup_path) = annotation.backup_path_for(&self.source) else {
            return ProcessingReport::error(
                ErrorKind::FileNotFound,
                format!("no backup recorded for source '{}'", self.source),
            );
        };

        if let Some(expected) = annotation.checksum_for(&self.source) {
            match Checksum::from_file(backup_path) {
                Ok(checksum) if checksum.matches_hex(expected) => {}
                Ok(checksum) => {
                    return ProcessingReport::error(
                        ErrorKind::DataCorruption,
                        format!(
                            "backup for '{}' does not match its recorded checksum \
                             (expected {expected}, computed {})",
                            self.source, checksum.value
                        ),
                    );
                }
                Err(e) => {
                    return ProcessingReport::error(
                        ErrorKind::HashComparisonError,
                        format!("could not verify backup for '{}': {e}", self.source),
                    );
                }
            }
        }

        let loaded = TableLoader::load(backup_path);
        if !loaded.is_success() {
            return loaded;
        }

        if let Some(required) = self.required_fields.as_deref() {
            let rows = loaded
                .data
                .as_ref()
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or_default();
            for (index, row) in rows.iter().enumerate() {
                let absent: Vec<&str> = required
                    .iter()
                    .map(String::as_str)
                    .filter(|field| row.get(*field).is_none())
                    .collect();
                if !absent.is_empty() {
                    return ProcessingReport::error(
                        ErrorKind::MissingFields,
                        format!(
                            "backup for '{}': row {index} is missing required fields: {}",
                            self.source,
                            absent.join(", ")
                        ),
                    );
                }
            }
        }

        loaded.with_metadata(
            "restored_from",
            Value::String(backup_path.display().to_string()),
        )
    }
}
