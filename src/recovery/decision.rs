use serde::{Deserialize, Serialize};
use std::fmt;

/// Urgency of a recovery directive
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecoveryPriority {
    Low,
    Medium,
    High,
    Critical,
}

impl RecoveryPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecoveryPriority::Low => "LOW",
            RecoveryPriority::Medium => "MEDIUM",
            RecoveryPriority::High => "HIGH",
            RecoveryPriority::Critical => "CRITICAL",
        }
    }

    /// True for priorities that demand immediate operator attention
    pub fn is_immediate(&self) -> bool {
        matches!(self, RecoveryPriority::High | RecoveryPriority::Critical)
    }
}

impl fmt::Display for RecoveryPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Who is allowed to act on a directive
///
/// LOCAL directives are handled in-process by a healer; GLOBAL directives
/// are a hand-off to humans through the manual-review notifier.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecoveryScale {
    Local,
    Global,
}

impl RecoveryScale {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecoveryScale::Local => "LOCAL",
            RecoveryScale::Global => "GLOBAL",
        }
    }
}

impl fmt::Display for RecoveryScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What a directive asks to be done
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecoveryAction {
    RetryProcessing,
    RollbackToBackup,
    TriggerManualReview,
}

impl RecoveryAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecoveryAction::RetryProcessing => "RETRY_PROCESSING",
            RecoveryAction::RollbackToBackup => "ROLLBACK_TO_BACKUP",
            RecoveryAction::TriggerManualReview => "TRIGGER_MANUAL_REVIEW",
        }
    }
}

impl fmt::Display for RecoveryAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Resolution state of a directive
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum DecisionStatus {
    Pending,
    Success,
    Error,
}

impl DecisionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionStatus::Pending => "PENDING",
            DecisionStatus::Success => "SUCCESS",
            DecisionStatus::Error => "ERROR",
        }
    }
}

impl fmt::Display for DecisionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One concrete, independently-trackable recovery attempt
///
/// Created fresh per error occurrence by the policy lookup. The status
/// starts PENDING and is resolved at most once, by whichever healer or
/// notifier is authorized for the directive's (scale, action) pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecoveryDecision {
    pub priority: RecoveryPriority,
    pub scale: RecoveryScale,
    pub action: RecoveryAction,
    pub status: DecisionStatus,
}

impl RecoveryDecision {
    pub fn new(priority: RecoveryPriority, scale: RecoveryScale, action: RecoveryAction) -> Self {
        Self {
            priority,
            scale,
            action,
            status: DecisionStatus::Pending,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == DecisionStatus::Pending
    }

    /// Set the resolution; already-resolved directives are left untouched
    pub fn resolve(&mut self, status: DecisionStatus) {
        if self.is_pending() {
            self.status = status;
        }
    }

    /// One-line outcome summary for composed error messages
    pub fn summary(&self) -> String {
        format!(
            "{} ({} {}) -> {}",
            self.action, self.scale, self.priority, self.status
        )
    }
}
