use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::annotation::PathAnnotation;
use crate::recovery::RecoveryDecision;
use crate::report::{ErrorKind, ProcessingStatus};

/// Aggregate outcome of one pipeline run
///
/// Built up incrementally while the phases execute and immutable once
/// `DataPipeline::run` returns. `recovery_actions` keeps the final
/// directive trail per component key; a component escalated to manual
/// review holds the notifier's directive set, which supersedes the
/// healer-only snapshot recorded before escalation.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineResult {
    pub status: ProcessingStatus,
    pub error_kind: ErrorKind,
    pub error_message: String,
    pub recovery_actions: BTreeMap<String, Vec<RecoveryDecision>>,
    /// Validated (or healed) schema document
    pub schema_data: Option<Value>,
    pub path_annotation: PathAnnotation,
    /// Per-source payloads; populated for every source that succeeded,
    /// even when the run as a whole failed. After an ERROR run this is an
    /// audit artifact: gate downstream consumption on `is_success`
    pub collected_data: BTreeMap<String, Value>,
    /// Run diagnostics; always carries a `"log"` entry with the full
    /// phase-by-phase narrative
    pub metadata: BTreeMap<String, Value>,
}

impl PipelineResult {
    pub fn new() -> Self {
        let mut metadata = BTreeMap::new();
        metadata.insert("log".to_string(), Value::String(String::new()));
        Self {
            status: ProcessingStatus::Pending,
            error_kind: ErrorKind::None,
            error_message: String::new(),
            recovery_actions: BTreeMap::new(),
            schema_data: None,
            path_annotation: PathAnnotation::new(),
            collected_data: BTreeMap::new(),
            metadata,
        }
    }

    /// Record (or supersede) the directive trail for a component key
    pub fn record_directives(
        &mut self,
        component: impl Into<String>,
        directives: Vec<RecoveryDecision>,
    ) {
        self.recovery_actions.insert(component.into(), directives);
    }

    /// Mark the run failed; earlier failure details are overwritten, so
    /// the fields always describe the most recent unrecovered failure
    pub fn fail(&mut self, error_kind: ErrorKind, error_message: impl Into<String>) {
        self.status = ProcessingStatus::Error;
        self.error_kind = error_kind;
        self.error_message = error_message.into();
    }

    pub fn is_success(&self) -> bool {
        self.status == ProcessingStatus::Success
    }

    pub fn is_error(&self) -> bool {
        self.status == ProcessingStatus::Error
    }

    pub fn log_text(&self) -> &str {
        self.metadata
            .get("log")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }
}

impl Default for PipelineResult {
    fn default() -> Self {
        Self::new()
    }
}
