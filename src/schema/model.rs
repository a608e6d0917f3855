use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use crate::error::FabricaResult;

/// Category of a data source
///
/// Closed set: resolution to a concrete collector happens once through
/// `collect::CollectorFactory`, never by string comparison at call sites.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum SourceKind {
    /// Fixed reference tables addressed by a direct file path
    #[serde(rename = "staticDB")]
    Static,
    /// Rolling production exports discovered by name prefix and extension
    #[serde(rename = "dynamicDB")]
    Dynamic,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Static => "staticDB",
            SourceKind::Dynamic => "dynamicDB",
        }
    }

    /// Both kinds, in schema iteration order
    pub const ALL: [SourceKind; 2] = [SourceKind::Static, SourceKind::Dynamic];
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Column type tags allowed in a schema's `dtypes` mapping
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Dtype {
    Str,
    Int,
    Float,
    Bool,
    Datetime,
    Category,
}

impl Dtype {
    pub const ALLOWED: [&'static str; 6] = ["str", "int", "float", "bool", "datetime", "category"];

    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "str" => Some(Dtype::Str),
            "int" => Some(Dtype::Int),
            "float" => Some(Dtype::Float),
            "bool" => Some(Dtype::Bool),
            "datetime" => Some(Dtype::Datetime),
            "category" => Some(Dtype::Category),
            _ => None,
        }
    }
}

/// One source entry of the schema document
///
/// `path` is a table file for static sources and a directory to scan for
/// dynamic ones. The discovery fields (`name_start`, `extension`,
/// `sheet_name`, `required_fields`) are mandatory for dynamic sources and
/// ignored for static ones.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceSpec {
    pub path: PathBuf,
    pub dtypes: BTreeMap<String, Dtype>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_start: Option<String>,
    #[serde(default, alias = "file_extension", skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sheet_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_fields: Option<Vec<String>>,
}

/// Validated shape of the schema document
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DataSchema {
    #[serde(rename = "staticDB")]
    pub static_db: BTreeMap<String, SourceSpec>,
    #[serde(rename = "dynamicDB")]
    pub dynamic_db: BTreeMap<String, SourceSpec>,
}

impl DataSchema {
    /// Typed view over a schema document the validator already accepted
    pub fn from_value(value: &Value) -> FabricaResult<Self> {
        Ok(serde_json::from_value(value.clone())?)
    }

    /// All sources in deterministic iteration order: static first, then
    /// dynamic, each alphabetically
    pub fn sources(&self) -> impl Iterator<Item = (SourceKind, &String, &SourceSpec)> {
        self.static_db
            .iter()
            .map(|(name, spec)| (SourceKind::Static, name, spec))
            .chain(
                self.dynamic_db
                    .iter()
                    .map(|(name, spec)| (SourceKind::Dynamic, name, spec)),
            )
    }

    pub fn source_count(&self) -> usize {
        self.static_db.len() + self.dynamic_db.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_source_kind_wire_names() {
        assert_eq!(SourceKind::Static.as_str(), "staticDB");
        assert_eq!(
            serde_json::to_string(&SourceKind::Dynamic).unwrap(),
            "\"dynamicDB\""
        );
    }

    #[test]
    fn test_dtype_allow_list() {
        for tag in Dtype::ALLOWED {
            assert!(Dtype::parse(tag).is_some(), "tag {tag} should parse");
        }
        assert!(Dtype::parse("int64").is_none());
        assert!(Dtype::parse("").is_none());
    }

    #[test]
    fn test_extension_alias_accepted() {
        let spec: SourceSpec = serde_json::from_value(json!({
            "path": "/data/shifts",
            "dtypes": {"machine": "str"},
            "name_start": "shift_",
            "file_extension": ".json",
            "sheet_name": "Production",
            "required_fields": ["machine"]
        }))
        .unwrap();
        assert_eq!(spec.extension.as_deref(), Some(".json"));
    }

    #[test]
    fn test_sources_iterate_static_then_dynamic() {
        let schema: DataSchema = serde_json::from_value(json!({
            "staticDB": {
                "moldsDB": {"path": "/data/molds.json", "dtypes": {"mold": "str"}}
            },
            "dynamicDB": {
                "shiftDB": {
                    "path": "/data/shifts",
                    "dtypes": {"machine": "str"},
                    "name_start": "shift_",
                    "extension": ".json",
                    "sheet_name": "Production",
                    "required_fields": ["machine"]
                }
            }
        }))
        .unwrap();

        let order: Vec<(SourceKind, &str)> = schema
            .sources()
            .map(|(kind, name, _)| (kind, name.as_str()))
            .collect();
        assert_eq!(
            order,
            vec![
                (SourceKind::Static, "moldsDB"),
                (SourceKind::Dynamic, "shiftDB")
            ]
        );
        assert_eq!(schema.source_count(), 2);
    }
}
