//! Self-healing batch pipeline for injection-molding production data
//!
//! The crate validates a schema document describing the plant's data
//! sources, collects every source it names, and recovers from stage
//! failures in two tiers: a local healer rolls back to backup artifacts
//! automatically, and failures it cannot repair are escalated to humans
//! through durable manual-review notifications. Every stage speaks the
//! same [`report::ProcessingReport`] contract, so the orchestrator never
//! cares which kind of stage produced a result.
//!
//! Entry point: build a [`config::PipelineConfig`], hand it to
//! [`pipeline::DataPipeline`], inspect the returned
//! [`pipeline::PipelineResult`]. The result carries the collected
//! payloads, the full recovery-directive trail per component, and a
//! run narrative under `metadata["log"]`.

pub mod annotation;
pub mod catalog;
pub mod collect;
pub mod config;
pub mod error;
pub mod integrity;
pub mod logging;
pub mod pipeline;
pub mod recovery;
pub mod report;
pub mod schema;

pub use config::PipelineConfig;
pub use error::{FabricaError, FabricaResult};
pub use pipeline::{DataPipeline, PipelinePhase, PipelineResult};
pub use report::{ErrorKind, ProcessingReport, ProcessingStatus};
