//! Batch pipeline orchestration with two-tier failure recovery
//!
//! A run walks three phases (schema validation, annotation load, source
//! collection) and finishes in `DONE` or `ABORTED`. Every failable stage
//! reports through the shared outcome type, and every stage failure goes
//! through the same recovery protocol: local healing first, manual-review
//! escalation when healing could not restore the data.
//!
//! # Example
//! ```no_run
//! use fabrica::config::PipelineConfig;
//! use fabrica::pipeline::DataPipeline;
//!
//! # fn main() -> fabrica::error::FabricaResult<()> {
//! let config = PipelineConfig::builder()
//!     .schema_path("/data/schema.json")
//!     .schema_backup_path("/data/backup/schema.json")
//!     .annotation_path("/data/annotation.json")
//!     .backup_annotation_path("/data/backup/annotation.json")
//!     .notifications_dir("/data/notifications")
//!     .build()?;
//!
//! let result = DataPipeline::new(config).run();
//! if result.is_error() {
//!     eprintln!("{}: {}", result.error_kind, result.error_message);
//!     for (component, directives) in &result.recovery_actions {
//!         for directive in directives {
//!             eprintln!("  {component}: {}", directive.summary());
//!         }
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod orchestrator;
pub mod phase;
pub mod result;

// Re-export main types
pub use orchestrator::DataPipeline;
pub use phase::PipelinePhase;
pub use result::PipelineResult;
