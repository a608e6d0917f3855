//! Schema document model and validation
//!
//! The schema declares every data source the collection phase will visit:
//! static reference tables under `staticDB` and discovered production
//! exports under `dynamicDB`.

pub mod model;
pub mod validator;

pub use model::{DataSchema, Dtype, SourceKind, SourceSpec};
pub use validator::SchemaValidator;
