//! Two-tier recovery for failed pipeline stages
//!
//! A failed stage outcome is matched against the frozen recovery policy,
//! which yields an ordered list of [`RecoveryDecision`] directives. The
//! LOCAL tier ([`LocalHealer`]) tries to restore from a backup artifact
//! without human involvement; if it cannot, the GLOBAL tier
//! ([`ManualReviewNotifier`]) records the failure durably for operators.
//! Both tiers resolve the directives they acted on and leave the rest
//! untouched, so the final directive set documents exactly what was
//! attempted and how it went.
//!
//! # Example
//! ```no_run
//! use fabrica::recovery::{
//!     recovery_actions_for, Component, FileChannel, LocalHealer, ManualReviewNotifier,
//!     SchemaBackup,
//! };
//! use fabrica::report::{ErrorKind, ProcessingReport};
//!
//! let outcome = ProcessingReport::error(ErrorKind::MissingFields, "schema is missing staticDB");
//! let directives = recovery_actions_for(Component::SchemaValidator, outcome.error_kind, None);
//!
//! let healer = LocalHealer::new(
//!     Component::SchemaValidator.key(None),
//!     directives,
//!     outcome,
//!     SchemaBackup::new("/data/backup/schema.json"),
//! );
//! let (directives, outcome) = healer.heal();
//!
//! if !outcome.is_success() {
//!     let notifier = ManualReviewNotifier::new(
//!         Component::SchemaValidator.key(None),
//!         directives,
//!         outcome,
//!     )
//!     .with_channel(Box::new(FileChannel::new(
//!         "/data/notifications/20260825_120000_SchemaValidator.log",
//!     )));
//!     let (_directives, _delivery) = notifier.notify();
//! }
//! ```

pub mod decision;
pub mod healer;
pub mod notifier;
pub mod policy;

// Re-export main types
pub use decision::{
    DecisionStatus, RecoveryAction, RecoveryDecision, RecoveryPriority, RecoveryScale,
};
pub use healer::{BackupSource, LocalHealer, SchemaBackup, SourceBackup};
pub use notifier::{
    FileChannel, ManualReviewNotifier, NotificationChannel, NotificationPayload,
};
pub use policy::{recovery_actions_for, Component, RetryContext};
