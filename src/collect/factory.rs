use super::collector::{DataCollector, DynamicSourceCollector, StaticSourceCollector};
use crate::annotation::PathAnnotation;
use crate::schema::{SourceKind, SourceSpec};

/// Factory resolving a source kind to its collector implementation
///
/// Resolution happens once, at construction time; call sites hold a
/// `Box<dyn DataCollector>` and never branch on the kind again.
pub struct CollectorFactory;

impl CollectorFactory {
    pub fn create(
        kind: SourceKind,
        name: &str,
        spec: &SourceSpec,
        annotation: &PathAnnotation,
    ) -> Box<dyn DataCollector> {
        match kind {
            SourceKind::Static => {
                Box::new(StaticSourceCollector::new(name, spec.clone(), annotation))
            }
            SourceKind::Dynamic => {
                Box::new(DynamicSourceCollector::new(name, spec.clone(), annotation))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;
    use std::fs;
    use tempfile::TempDir;

    fn spec_for(dir: &TempDir, kind: SourceKind) -> SourceSpec {
        let mut dtypes = BTreeMap::new();
        dtypes.insert("machine".to_string(), crate::schema::Dtype::Str);
        match kind {
            SourceKind::Static => SourceSpec {
                path: dir.path().join("machines.json"),
                dtypes,
                name_start: None,
                extension: None,
                sheet_name: None,
                required_fields: None,
            },
            SourceKind::Dynamic => SourceSpec {
                path: dir.path().to_path_buf(),
                dtypes,
                name_start: Some("shift_".to_string()),
                extension: Some(".json".to_string()),
                sheet_name: Some("Production".to_string()),
                required_fields: Some(vec!["machine".to_string()]),
            },
        }
    }

    #[test]
    fn test_create_static_collector() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("machines.json"),
            json!([{"machine": "IM-03"}]).to_string(),
        )
        .unwrap();

        let spec = spec_for(&dir, SourceKind::Static);
        let collector = CollectorFactory::create(
            SourceKind::Static,
            "machinesDB",
            &spec,
            &PathAnnotation::new(),
        );
        assert_eq!(collector.source_name(), "machinesDB");
        assert!(collector.process().is_success());
    }

    #[test]
    fn test_create_dynamic_collector() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("shift_20260824.json"),
            json!([{"machine": "IM-03"}]).to_string(),
        )
        .unwrap();

        let spec = spec_for(&dir, SourceKind::Dynamic);
        let collector = CollectorFactory::create(
            SourceKind::Dynamic,
            "shiftDB",
            &spec,
            &PathAnnotation::new(),
        );
        assert_eq!(collector.source_name(), "shiftDB");
        assert!(collector.process().is_success());
    }
}
