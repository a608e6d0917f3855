//! Static reference tables for notification enrichment
//!
//! The catalogs describe error kinds and recovery actions for human
//! consumption. Lookups feed the manual-review notifier; nothing in the
//! pipeline branches on catalog contents, and the tables expose no
//! mutation API.

use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::recovery::decision::RecoveryAction;
use crate::report::ErrorKind;

/// Operational severity of an error kind
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Catalog entry describing one error kind
#[derive(Debug, Clone, Serialize)]
pub struct ErrorInfo {
    pub kind: ErrorKind,
    pub severity: Severity,
    pub description: &'static str,
    pub probable_causes: Vec<&'static str>,
    /// Occurrences of this kind before ops should escalate
    pub escalation_threshold: u32,
}

/// Catalog entry describing one recovery action
#[derive(Debug, Clone, Serialize)]
pub struct RecoveryActionInfo {
    pub action: RecoveryAction,
    pub cost: Severity,
    pub description: &'static str,
    pub prerequisites: Vec<&'static str>,
}

static ERROR_CATALOG: Lazy<BTreeMap<ErrorKind, ErrorInfo>> = Lazy::new(|| {
    let entries = [
        ErrorInfo {
            kind: ErrorKind::FileNotFound,
            severity: Severity::High,
            description: "A required input file is missing from its configured location",
            probable_causes: vec![
                "upstream export did not run",
                "path annotation points at a moved file",
                "network share not mounted",
            ],
            escalation_threshold: 2,
        },
        ErrorInfo {
            kind: ErrorKind::FileReadError,
            severity: Severity::High,
            description: "An input file exists but could not be read",
            probable_causes: vec!["permission denied", "file locked by another process"],
            escalation_threshold: 2,
        },
        ErrorInfo {
            kind: ErrorKind::FileNotValid,
            severity: Severity::Medium,
            description: "An input file was read but its contents are not usable",
            probable_causes: vec!["truncated export", "wrong file dropped into the inbox"],
            escalation_threshold: 3,
        },
        ErrorInfo {
            kind: ErrorKind::MissingFields,
            severity: Severity::High,
            description: "Required fields are absent from a document or table",
            probable_causes: vec![
                "schema edited by hand",
                "source system changed its export layout",
            ],
            escalation_threshold: 2,
        },
        ErrorInfo {
            kind: ErrorKind::DataProcessingError,
            severity: Severity::Medium,
            description: "A processing step failed on otherwise readable data",
            probable_causes: vec!["unexpected value range", "malformed row"],
            escalation_threshold: 3,
        },
        ErrorInfo {
            kind: ErrorKind::UnsupportedDataType,
            severity: Severity::Medium,
            description: "A table file uses a format this pipeline cannot parse",
            probable_causes: vec!["extension renamed", "new export format rolled out"],
            escalation_threshold: 3,
        },
        ErrorInfo {
            kind: ErrorKind::HashComparisonError,
            severity: Severity::High,
            description: "An integrity checksum could not be computed or compared",
            probable_causes: vec!["file unreadable during hashing", "checksum record malformed"],
            escalation_threshold: 2,
        },
        ErrorInfo {
            kind: ErrorKind::DataCorruption,
            severity: Severity::Critical,
            description: "File contents do not match their recorded checksum",
            probable_causes: vec!["partial copy", "storage fault", "concurrent overwrite"],
            escalation_threshold: 1,
        },
        ErrorInfo {
            kind: ErrorKind::SchemaMismatch,
            severity: Severity::High,
            description: "Collected data does not match the declared schema",
            probable_causes: vec!["schema out of date", "source columns renamed"],
            escalation_threshold: 2,
        },
        ErrorInfo {
            kind: ErrorKind::InvalidJson,
            severity: Severity::High,
            description: "A JSON document failed to parse",
            probable_causes: vec!["hand edit left trailing comma", "interrupted write"],
            escalation_threshold: 2,
        },
        ErrorInfo {
            kind: ErrorKind::InvalidSchemaStructure,
            severity: Severity::Critical,
            description: "The schema document parsed but violates the schema contract",
            probable_causes: vec![
                "unknown dtype tag",
                "required_fields names a column missing from dtypes",
                "source entry is not an object",
            ],
            escalation_threshold: 1,
        },
        ErrorInfo {
            kind: ErrorKind::ParquetSaveError,
            severity: Severity::Medium,
            description: "Writing a processed table to disk failed",
            probable_causes: vec!["disk full", "output directory removed"],
            escalation_threshold: 3,
        },
    ];
    entries.into_iter().map(|info| (info.kind, info)).collect()
});

static RECOVERY_ACTION_CATALOG: Lazy<BTreeMap<RecoveryAction, RecoveryActionInfo>> =
    Lazy::new(|| {
        let entries = [
            RecoveryActionInfo {
                action: RecoveryAction::RetryProcessing,
                cost: Severity::Low,
                description: "Run the failed processing step again unchanged",
                prerequisites: vec!["retry budget not exhausted"],
            },
            RecoveryActionInfo {
                action: RecoveryAction::RollbackToBackup,
                cost: Severity::Medium,
                description: "Reload and re-validate the designated backup artifact",
                prerequisites: vec!["backup artifact present and readable"],
            },
            RecoveryActionInfo {
                action: RecoveryAction::TriggerManualReview,
                cost: Severity::High,
                description: "Escalate to a human with full failure context",
                prerequisites: vec![],
            },
        ];
        entries
            .into_iter()
            .map(|info| (info.action, info))
            .collect()
    });

/// Look up the catalog entry for an error kind, if one exists
pub fn error_info(kind: ErrorKind) -> Option<&'static ErrorInfo> {
    ERROR_CATALOG.get(&kind)
}

/// Look up the catalog entry for a recovery action, if one exists
pub fn action_info(action: RecoveryAction) -> Option<&'static RecoveryActionInfo> {
    RECOVERY_ACTION_CATALOG.get(&action)
}
