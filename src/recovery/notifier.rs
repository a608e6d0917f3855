use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::decision::{
    DecisionStatus, RecoveryAction, RecoveryDecision, RecoveryPriority, RecoveryScale,
};
use crate::catalog::{self, ErrorInfo, RecoveryActionInfo};
use crate::error::{FabricaError, FabricaResult};
use crate::logging::RunLog;
use crate::report::{ErrorKind, ProcessingReport, ProcessingStatus};

/// Durable record handed to operators when automatic recovery gave up
///
/// One payload covers every manual-review directive of a failure, so a
/// single unrecovered failure produces a single record however many
/// directives escalated it.
#[derive(Debug, Serialize)]
pub struct NotificationPayload {
    pub timestamp: DateTime<Utc>,
    pub component: String,
    pub requires_immediate_attention: bool,
    pub outcome: OutcomeSummary,
    pub directives: Vec<DirectiveEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_details: Option<&'static ErrorInfo>,
}

/// The failed outcome that triggered escalation, flattened for operators
#[derive(Debug, Serialize)]
pub struct OutcomeSummary {
    pub status: ProcessingStatus,
    pub error_kind: ErrorKind,
    pub error_message: String,
    pub metadata: BTreeMap<String, Value>,
}

#[derive(Debug, Serialize)]
pub struct DirectiveEntry {
    pub priority: RecoveryPriority,
    pub scale: RecoveryScale,
    pub action: RecoveryAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_details: Option<&'static RecoveryActionInfo>,
}

/// Delivery target for manual-review notifications
pub trait NotificationChannel {
    fn name(&self) -> &str;
    fn deliver(&self, payload: &NotificationPayload) -> FabricaResult<()>;
}

/// Baseline channel: one pretty-printed JSON snapshot file per failure
///
/// Each delivery overwrites the target path, so callers hand every
/// failure its own timestamped path.
pub struct FileChannel {
    path: PathBuf,
}

impl FileChannel {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl NotificationChannel for FileChannel {
    fn name(&self) -> &str {
        "file"
    }

    fn deliver(&self, payload: &NotificationPayload) -> FabricaResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(payload)?;
        fs::write(&self.path, json)?;
        Ok(())
    }
}

/// GLOBAL-scale escalation: records the failure for human review
///
/// Acts only on (GLOBAL, TRIGGER_MANUAL_REVIEW, PENDING) directives and
/// passes everything else through untouched. Delivery counts as a
/// success when at least one channel accepted the payload; only a total
/// delivery failure resolves the eligible directives to ERROR. Like the
/// healer, it never returns `Err`: escalation problems must not mask
/// the failure being escalated.
pub struct ManualReviewNotifier {
    component: String,
    directives: Vec<RecoveryDecision>,
    outcome: ProcessingReport,
    channels: Vec<Box<dyn NotificationChannel>>,
}

impl ManualReviewNotifier {
    pub fn new(
        component: impl Into<String>,
        directives: Vec<RecoveryDecision>,
        outcome: ProcessingReport,
    ) -> Self {
        Self {
            component: component.into(),
            directives,
            outcome,
            channels: Vec::new(),
        }
    }

    pub fn with_channel(mut self, channel: Box<dyn NotificationChannel>) -> Self {
        self.channels.push(channel);
        self
    }

    fn is_eligible(directive: &RecoveryDecision) -> bool {
        directive.scale == RecoveryScale::Global
            && directive.action == RecoveryAction::TriggerManualReview
            && directive.is_pending()
    }

    fn build_payload(&self, eligible: &[&RecoveryDecision]) -> NotificationPayload {
        let requires_immediate_attention = eligible
            .iter()
            .any(|directive| directive.priority.is_immediate());
        let directives = eligible
            .iter()
            .map(|directive| DirectiveEntry {
                priority: directive.priority,
                scale: directive.scale,
                action: directive.action,
                action_details: catalog::action_info(directive.action),
            })
            .collect();
        NotificationPayload {
            timestamp: Utc::now(),
            component: self.component.clone(),
            requires_immediate_attention,
            outcome: OutcomeSummary {
                status: self.outcome.status,
                error_kind: self.outcome.error_kind,
                error_message: self.outcome.error_message.clone(),
                metadata: self.outcome.metadata.clone(),
            },
            directives,
            error_details: catalog::error_info(self.outcome.error_kind),
        }
    }

    /// Deliver the notification and resolve the eligible directives
    ///
    /// Returns all directives plus a report describing the delivery
    /// itself, never the failure being reported.
    pub fn notify(mut self) -> (Vec<RecoveryDecision>, ProcessingReport) {
        let mut log = RunLog::new(format!("ManualReviewNotifier:{}", self.component));
        let eligible: Vec<&RecoveryDecision> = self
            .directives
            .iter()
            .filter(|directive| Self::is_eligible(directive))
            .collect();

        if eligible.is_empty() {
            log.info("no manual-review directives pending; nothing to deliver");
            let report =
                ProcessingReport::skip("no manual-review directives pending").with_log(&log);
            return (self.directives, report);
        }

        let payload = self.build_payload(&eligible);
        log.info(format!(
            "escalating '{}' ({}) across {} channel(s), immediate attention: {}",
            self.component,
            payload.outcome.error_kind,
            self.channels.len(),
            payload.requires_immediate_attention
        ));

        let mut delivered: Vec<String> = Vec::new();
        let mut failed: Vec<String> = Vec::new();
        for channel in &self.channels {
            match channel.deliver(&payload) {
                Ok(()) => {
                    log.info(format!("channel '{}' accepted the notification", channel.name()));
                    delivered.push(channel.name().to_string());
                }
                Err(e) => {
                    log.error(format!("channel '{}' failed: {e}", channel.name()));
                    failed.push(channel.name().to_string());
                }
            }
        }

        let status = if delivered.is_empty() {
            DecisionStatus::Error
        } else {
            DecisionStatus::Success
        };
        for directive in self.directives.iter_mut() {
            if Self::is_eligible(directive) {
                directive.resolve(status);
            }
        }

        let report = if delivered.is_empty() {
            let summary = FabricaError::NotificationDeliveryFailed(format!(
                "all {} channel(s) failed for '{}'",
                failed.len(),
                self.component
            ));
            ProcessingReport::error(ErrorKind::DataProcessingError, summary.to_string())
        } else {
            ProcessingReport::success(None)
        };
        let report = report
            .with_metadata("channels_succeeded", Value::from(delivered))
            .with_metadata("channels_failed", Value::from(failed))
            .with_log(&log);
        (self.directives, report)
    }
}
