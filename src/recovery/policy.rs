//! Static recovery policy: what can be tried for which failure
//!
//! The table decouples "what can be tried" (ops-reviewable data below)
//! from "who tries it" (the healer and notifier). Extending coverage to a
//! new error kind or component means adding a table entry, never a branch
//! in healer code.

use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use super::decision::{RecoveryAction, RecoveryDecision, RecoveryPriority, RecoveryScale};
use crate::report::ErrorKind;

/// Pipeline component a policy entry applies to
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Component {
    SchemaValidator,
    DataCollector,
}

impl Component {
    pub fn as_str(&self) -> &'static str {
        match self {
            Component::SchemaValidator => "SchemaValidator",
            Component::DataCollector => "DataCollector",
        }
    }

    /// Key under which this component's directives are recorded
    ///
    /// Collector keys carry the source name so per-source recovery trails
    /// never collide.
    pub fn key(&self, source: Option<&str>) -> String {
        match source {
            Some(source) => format!("{}:{}", self.as_str(), source),
            None => self.as_str().to_string(),
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Retry budget carried into policy lookups
#[derive(Debug, Clone, Copy, Default)]
pub struct RetryContext {
    pub retry_count: u32,
    pub max_retries: u32,
}

impl RetryContext {
    pub fn new(retry_count: u32, max_retries: u32) -> Self {
        Self {
            retry_count,
            max_retries,
        }
    }

    pub fn budget_exhausted(&self) -> bool {
        self.retry_count >= self.max_retries
    }
}

fn directive(
    priority: RecoveryPriority,
    scale: RecoveryScale,
    action: RecoveryAction,
) -> RecoveryDecision {
    RecoveryDecision::new(priority, scale, action)
}

fn local_rollback(priority: RecoveryPriority) -> RecoveryDecision {
    directive(priority, RecoveryScale::Local, RecoveryAction::RollbackToBackup)
}

fn local_retry(priority: RecoveryPriority) -> RecoveryDecision {
    directive(priority, RecoveryScale::Local, RecoveryAction::RetryProcessing)
}

fn global_review(priority: RecoveryPriority) -> RecoveryDecision {
    directive(
        priority,
        RecoveryScale::Global,
        RecoveryAction::TriggerManualReview,
    )
}

/// Ordered directives per (component, error kind)
///
/// LOCAL rollback entries come first so a healed rollback is always the
/// leading directive in the recorded trail.
static RECOVERY_POLICY: Lazy<BTreeMap<(Component, ErrorKind), Vec<RecoveryDecision>>> =
    Lazy::new(|| {
        use Component::{DataCollector, SchemaValidator};
        use RecoveryPriority::{Critical, High, Low, Medium};

        let mut table = BTreeMap::new();

        table.insert(
            (SchemaValidator, ErrorKind::FileNotFound),
            vec![local_rollback(High), global_review(High)],
        );
        table.insert(
            (SchemaValidator, ErrorKind::FileReadError),
            vec![local_rollback(High), local_retry(Medium), global_review(High)],
        );
        table.insert(
            (SchemaValidator, ErrorKind::InvalidJson),
            vec![local_rollback(High), global_review(High)],
        );
        table.insert(
            (SchemaValidator, ErrorKind::MissingFields),
            vec![local_rollback(High), global_review(Critical)],
        );
        table.insert(
            (SchemaValidator, ErrorKind::InvalidSchemaStructure),
            vec![local_rollback(Critical), global_review(Critical)],
        );

        table.insert(
            (DataCollector, ErrorKind::FileNotFound),
            vec![local_rollback(Medium), global_review(High)],
        );
        table.insert(
            (DataCollector, ErrorKind::FileReadError),
            vec![local_rollback(Medium), local_retry(Low), global_review(Medium)],
        );
        table.insert(
            (DataCollector, ErrorKind::FileNotValid),
            vec![local_rollback(Medium), global_review(Medium)],
        );
        table.insert(
            (DataCollector, ErrorKind::InvalidJson),
            vec![local_rollback(Medium), global_review(Medium)],
        );
        table.insert(
            (DataCollector, ErrorKind::MissingFields),
            vec![local_rollback(Medium), global_review(High)],
        );
        table.insert(
            (DataCollector, ErrorKind::SchemaMismatch),
            vec![local_rollback(Medium), global_review(High)],
        );
        table.insert(
            (DataCollector, ErrorKind::UnsupportedDataType),
            vec![local_rollback(Medium), global_review(Medium)],
        );
        table.insert(
            (DataCollector, ErrorKind::DataProcessingError),
            vec![local_retry(Low), global_review(Medium)],
        );
        table.insert(
            (DataCollector, ErrorKind::HashComparisonError),
            vec![local_rollback(High), global_review(High)],
        );
        table.insert(
            (DataCollector, ErrorKind::DataCorruption),
            vec![local_rollback(High), global_review(Critical)],
        );

        table
    });

/// Fetch the directives for a failure occurrence
///
/// Always returns a freshly constructed list, never a view into the
/// static table, so callers may resolve directive statuses freely. An
/// unknown (component, kind) pair yields an empty list; that is a valid,
/// silent outcome, not an error. A spent retry budget filters
/// RETRY_PROCESSING directives out of the result.
pub fn recovery_actions_for(
    component: Component,
    error_kind: ErrorKind,
    context: Option<&RetryContext>,
) -> Vec<RecoveryDecision> {
    let Some(directives) = RECOVERY_POLICY.get(&(component, error_kind)) else {
        return Vec::new();
    };
    let retries_spent = context.map(RetryContext::budget_exhausted).unwrap_or(false);
    directives
        .iter()
        .filter(|d| !(retries_spent && d.action == RecoveryAction::RetryProcessing))
        .cloned()
        .collect()
}
