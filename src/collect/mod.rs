//! Multi-source data collection
//!
//! Collectors are the leaf producers of processing reports for the
//! collection phase. The orchestrator resolves each schema source to a
//! collector through `CollectorFactory` and consumes only the
//! `DataCollector` contract.

pub mod collector;
pub mod factory;
pub mod loader;

pub use collector::{DataCollector, DynamicSourceCollector, StaticSourceCollector};
pub use factory::CollectorFactory;
pub use loader::{TableFormat, TableLoader};
