use fabrica::annotation::BackupAnnotation;
use fabrica::integrity::Checksum;
use fabrica::recovery::{DecisionStatus, RecoveryAction, RecoveryScale};
use fabrica::{DataPipeline, ErrorKind, PipelineConfig};
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn config_for(dir: &TempDir) -> PipelineConfig {
    PipelineConfig::builder()
        .schema_path(dir.path().join("schema.json"))
        .schema_backup_path(dir.path().join("backup").join("schema.json"))
        .annotation_path(dir.path().join("annotation.json"))
        .backup_annotation_path(dir.path().join("backup").join("annotation.json"))
        .notifications_dir(dir.path().join("notifications"))
        .build()
        .unwrap()
}

fn write_json(path: &Path, value: &Value) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, serde_json::to_string_pretty(value).unwrap()).unwrap();
}

fn notification_files(dir: &TempDir) -> Vec<PathBuf> {
    let notifications = dir.path().join("notifications");
    if !notifications.exists() {
        return Vec::new();
    }
    let mut files: Vec<PathBuf> = fs::read_dir(notifications)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect();
    files.sort();
    files
}

/// Test the complete workflow: schema validation, annotation bootstrap,
/// static and dynamic source collection
#[test]
fn test_complete_pipeline_run() {
    let dir = TempDir::new().unwrap();

    // Setup: static table plus a directory of date-stamped shift exports
    let molds = dir.path().join("molds.json");
    write_json(
        &molds,
        &json!([
            {"mold": "M-104", "cavities": 8},
            {"mold": "M-205", "cavities": 16}
        ]),
    );

    let shifts = dir.path().join("shifts");
    write_json(
        &shifts.join("shift_20260810.json"),
        &json!([{"machine": "IM-03", "output": 900}]),
    );
    write_json(
        &shifts.join("shift_20260824.json"),
        &json!([{"machine": "IM-03", "output": 1200}]),
    );

    write_json(
        &dir.path().join("schema.json"),
        &json!({
            "staticDB": {
                "moldsDB": {
                    "path": molds.to_string_lossy(),
                    "dtypes": {"mold": "str", "cavities": "int"}
                }
            },
            "dynamicDB": {
                "shiftDB": {
                    "path": shifts.to_string_lossy(),
                    "dtypes": {"machine": "str", "output": "int"},
                    "name_start": "shift_",
                    "extension": ".json",
                    "sheet_name": "Production",
                    "required_fields": ["machine", "output"]
                }
            }
        }),
    );

    let result = DataPipeline::new(config_for(&dir)).run();

    assert!(result.is_success(), "{}", result.error_message);
    assert_eq!(result.error_kind, ErrorKind::None);
    assert_eq!(result.collected_data.len(), 2);
    assert_eq!(
        result.collected_data["moldsDB"].as_array().unwrap().len(),
        2
    );
    // Discovery must pick the newest date-stamped export
    assert_eq!(
        result.collected_data["shiftDB"],
        json!([{"machine": "IM-03", "output": 1200}])
    );
    assert!(result.recovery_actions.is_empty());
    assert!(notification_files(&dir).is_empty());
    assert_eq!(result.metadata["final_phase"], json!("DONE"));
    assert!(result.log_text().contains("SOURCE_COLLECTION"));
}

/// Test that a schema missing a required top-level key aborts the run
/// and leaves a manual-review notification on disk
#[test]
fn test_missing_schema_key_escalates_to_manual_review() {
    let dir = TempDir::new().unwrap();

    // Schema without staticDB; no backup schema exists either
    write_json(
        &dir.path().join("schema.json"),
        &json!({
            "dynamicDB": {}
        }),
    );

    let result = DataPipeline::new(config_for(&dir)).run();

    assert!(result.is_error());
    assert_eq!(result.error_kind, ErrorKind::MissingFields);
    assert!(result.error_message.contains("SchemaValidator"));
    assert_eq!(result.metadata["final_phase"], json!("ABORTED"));
    assert!(result.collected_data.is_empty());

    // The healer could not roll back, the notifier recorded the failure
    let trail = &result.recovery_actions["SchemaValidator"];
    assert_eq!(trail[0].action, RecoveryAction::RollbackToBackup);
    assert_eq!(trail[0].status, DecisionStatus::Error);
    assert_eq!(trail[1].action, RecoveryAction::TriggerManualReview);
    assert_eq!(trail[1].status, DecisionStatus::Success);

    let files = notification_files(&dir);
    assert_eq!(files.len(), 1);
    assert!(files[0]
        .file_name()
        .unwrap()
        .to_string_lossy()
        .ends_with("_SchemaValidator.log"));

    let written = fs::read_to_string(&files[0]).unwrap();
    assert!(written.contains("missing_fields"));
    let payload: Value = serde_json::from_str(&written).unwrap();
    assert_eq!(payload["requires_immediate_attention"], json!(true));
    assert_eq!(payload["component"], json!("SchemaValidator"));
}

/// Test that a valid backup schema heals a failed validation and the run
/// continues without any notification
#[test]
fn test_backup_schema_heals_validation_failure() {
    let dir = TempDir::new().unwrap();

    // Live schema is corrupt; backup schema is valid and its table exists
    fs::write(dir.path().join("schema.json"), "{\"staticDB\": ").unwrap();

    let molds = dir.path().join("molds.json");
    write_json(&molds, &json!([{"mold": "M-104", "cavities": 8}]));
    write_json(
        &dir.path().join("backup").join("schema.json"),
        &json!({
            "staticDB": {
                "moldsDB": {
                    "path": molds.to_string_lossy(),
                    "dtypes": {"mold": "str", "cavities": "int"}
                }
            },
            "dynamicDB": {}
        }),
    );

    let result = DataPipeline::new(config_for(&dir)).run();

    assert!(result.is_success(), "{}", result.error_message);
    assert_eq!(
        result.recovery_actions["SchemaValidator"][0].status,
        DecisionStatus::Success
    );
    assert!(notification_files(&dir).is_empty());
    // Collection ran against the healed schema
    assert!(result.collected_data.contains_key("moldsDB"));
    assert!(result.schema_data.is_some());
}

/// Test that the global tier's directive set supersedes the local-only
/// snapshot, with one entry per (scale, action) pair
#[test]
fn test_directive_trail_is_superseded_by_global_tier() {
    let dir = TempDir::new().unwrap();
    write_json(&dir.path().join("schema.json"), &json!({"dynamicDB": {}}));

    let result = DataPipeline::new(config_for(&dir)).run();

    let trail = &result.recovery_actions["SchemaValidator"];
    assert_eq!(trail.len(), 2);
    let mut pairs: Vec<(RecoveryScale, RecoveryAction)> = trail
        .iter()
        .map(|directive| (directive.scale, directive.action))
        .collect();
    pairs.dedup();
    assert_eq!(pairs.len(), 2, "duplicate (scale, action) pair in trail");
    // No directive is left unresolved once both tiers have run
    assert!(trail.iter().all(|directive| !directive.is_pending()));
}

/// Test all-or-nothing collection: one unrecovered source fails the run
/// while the successful source's data is preserved for diagnostics
#[test]
fn test_collection_is_all_or_nothing() {
    let dir = TempDir::new().unwrap();

    let molds = dir.path().join("molds.json");
    write_json(&molds, &json!([{"mold": "M-104", "cavities": 8}]));

    // ordersDB points at a file that does not exist and has no backup
    write_json(
        &dir.path().join("schema.json"),
        &json!({
            "staticDB": {
                "moldsDB": {
                    "path": molds.to_string_lossy(),
                    "dtypes": {"mold": "str", "cavities": "int"}
                },
                "ordersDB": {
                    "path": dir.path().join("orders.json").to_string_lossy(),
                    "dtypes": {"order": "str", "qty": "int"}
                }
            },
            "dynamicDB": {}
        }),
    );

    let result = DataPipeline::new(config_for(&dir)).run();

    assert!(result.is_error());
    assert_eq!(result.error_kind, ErrorKind::FileNotFound);
    assert_eq!(result.metadata["failed_db_types"], json!(["ordersDB"]));
    assert!(result.collected_data.contains_key("moldsDB"));
    assert!(!result.collected_data.contains_key("ordersDB"));
    assert_eq!(result.metadata["final_phase"], json!("DONE"));
    assert!(result.error_message.contains("DataCollector:ordersDB"));

    // The failed source got its own notification file
    let files = notification_files(&dir);
    assert_eq!(files.len(), 1);
    assert!(files[0]
        .file_name()
        .unwrap()
        .to_string_lossy()
        .contains("DataCollector_ordersDB"));
}

/// Test that a source failure heals from the backup annotation and the
/// healed rows flow into collected_data
#[test]
fn test_healed_source_contributes_backup_data() {
    let dir = TempDir::new().unwrap();

    // Live table missing; checksummed backup table present
    write_json(
        &dir.path().join("schema.json"),
        &json!({
            "staticDB": {
                "ordersDB": {
                    "path": dir.path().join("orders.json").to_string_lossy(),
                    "dtypes": {"order": "str", "qty": "int"}
                }
            },
            "dynamicDB": {}
        }),
    );

    let backup_table = dir.path().join("backup").join("orders_backup.json");
    write_json(&backup_table, &json!([{"order": "PO-9", "qty": 500}]));
    let checksum = Checksum::from_file(&backup_table).unwrap();

    let mut backup = BackupAnnotation::default();
    backup
        .sources
        .insert("ordersDB".to_string(), backup_table.clone());
    backup.checksums.insert("ordersDB".to_string(), checksum.value);
    backup
        .save(dir.path().join("backup").join("annotation.json"))
        .unwrap();

    let result = DataPipeline::new(config_for(&dir)).run();

    assert!(result.is_success(), "{}", result.error_message);
    assert_eq!(
        result.collected_data["ordersDB"],
        json!([{"order": "PO-9", "qty": 500}])
    );
    assert_eq!(
        result.recovery_actions["DataCollector:ordersDB"][0].status,
        DecisionStatus::Success
    );
    assert!(notification_files(&dir).is_empty());
    assert_eq!(result.metadata["failed_db_types"], json!([]));
}

/// Test that a live table with the wrong JSON shape rolls back to the
/// backup copy instead of failing the run
#[test]
fn test_malformed_live_table_heals_from_backup() {
    let dir = TempDir::new().unwrap();

    // The export wrote a single record object where a row array belongs
    let orders = dir.path().join("orders.json");
    write_json(&orders, &json!({"order": "PO-9", "qty": 500}));

    write_json(
        &dir.path().join("schema.json"),
        &json!({
            "staticDB": {
                "ordersDB": {
                    "path": orders.to_string_lossy(),
                    "dtypes": {"order": "str", "qty": "int"}
                }
            },
            "dynamicDB": {}
        }),
    );

    let backup_table = dir.path().join("backup").join("orders_backup.json");
    write_json(
        &backup_table,
        &json!([
            {"order": "PO-9", "qty": 500},
            {"order": "PO-10", "qty": 120}
        ]),
    );
    let mut backup = BackupAnnotation::default();
    backup.sources.insert("ordersDB".to_string(), backup_table);
    backup
        .save(dir.path().join("backup").join("annotation.json"))
        .unwrap();

    let result = DataPipeline::new(config_for(&dir)).run();

    assert!(result.is_success(), "{}", result.error_message);
    assert_eq!(
        result.collected_data["ordersDB"].as_array().unwrap().len(),
        2
    );
    let trail = &result.recovery_actions["DataCollector:ordersDB"];
    assert_eq!(trail[0].action, RecoveryAction::RollbackToBackup);
    assert_eq!(trail[0].status, DecisionStatus::Success);
    assert!(notification_files(&dir).is_empty());
    assert_eq!(result.metadata["failed_db_types"], json!([]));
}
