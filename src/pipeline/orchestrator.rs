use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Instant;
use uuid::Uuid;

use super::phase::PipelinePhase;
use super::result::PipelineResult;
use crate::annotation::PathAnnotation;
use crate::collect::CollectorFactory;
use crate::config::PipelineConfig;
use crate::error::{FabricaError, FabricaResult};
use crate::logging::RunLog;
use crate::recovery::{
    recovery_actions_for, BackupSource, Component, FileChannel, LocalHealer, ManualReviewNotifier,
    RetryContext, SchemaBackup, SourceBackup,
};
use crate::report::{ErrorKind, ProcessingReport, ProcessingStatus};
use crate::schema::{DataSchema, SchemaValidator};

/// Sequences one batch run: schema validation, annotation load, source
/// collection
///
/// Every failable stage goes through the same two-tier recovery protocol:
/// try the local healer, and only when it could not restore the data,
/// escalate through the manual-review notifier. A failed schema aborts
/// the run outright; source collection always attempts every source and
/// reports all-or-nothing at the end.
pub struct DataPipeline {
    config: PipelineConfig,
    run_id: Uuid,
    started_at: DateTime<Utc>,
    phase: PipelinePhase,
    log: RunLog,
    phase_durations: BTreeMap<String, Value>,
}

impl DataPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            phase: PipelinePhase::SchemaValidation,
            log: RunLog::new("DataPipeline"),
            phase_durations: BTreeMap::new(),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn phase(&self) -> PipelinePhase {
        self.phase
    }

    /// Execute the run to completion
    ///
    /// Never panics and never returns `Err`: every failure, including
    /// internal ones, ends up described in the returned result.
    pub fn run(mut self) -> PipelineResult {
        let timer = Instant::now();
        let mut result = PipelineResult::new();
        self.log.info(format!(
            "run {} started (schema: {})",
            self.run_id,
            self.config.schema_path.display()
        ));

        if let Err(e) = self.execute(&mut result) {
            self.log.error(format!("internal pipeline failure: {e}"));
            result.fail(
                ErrorKind::DataProcessingError,
                format!("internal pipeline failure: {e}"),
            );
            self.phase = PipelinePhase::Aborted;
        }

        if result.status == ProcessingStatus::Pending {
            result.status = ProcessingStatus::Success;
        }
        self.log.info(format!(
            "run {} finished in {}ms with status {}",
            self.run_id,
            timer.elapsed().as_millis(),
            result.status
        ));

        result
            .metadata
            .insert("run_id".to_string(), Value::String(self.run_id.to_string()));
        result.metadata.insert(
            "started_at".to_string(),
            Value::String(self.started_at.to_rfc3339()),
        );
        result.metadata.insert(
            "final_phase".to_string(),
            Value::String(self.phase.as_str().to_string()),
        );
        result.metadata.insert(
            "duration_ms".to_string(),
            Value::from(timer.elapsed().as_millis() as u64),
        );
        result.metadata.insert(
            "phase_durations_ms".to_string(),
            Value::Object(self.phase_durations.into_iter().collect()),
        );
        result
            .metadata
            .insert("log".to_string(), Value::String(self.log.render()));
        result
    }

    fn execute(&mut self, result: &mut PipelineResult) -> FabricaResult<()> {
        let timer = Instant::now();
        let schema = self.validate_schema(result)?;
        self.record_phase_duration(PipelinePhase::SchemaValidation, timer);
        let Some(schema) = schema else { return Ok(()) };

        let timer = Instant::now();
        let annotation = self.load_annotation(result)?;
        self.record_phase_duration(PipelinePhase::AnnotationLoad, timer);
        let Some(annotation) = annotation else { return Ok(()) };
        result.path_annotation = annotation.clone();

        let timer = Instant::now();
        self.collect_sources(result, &schema, &annotation)?;
        self.record_phase_duration(PipelinePhase::SourceCollection, timer);
        Ok(())
    }

    fn validate_schema(
        &mut self,
        result: &mut PipelineResult,
    ) -> FabricaResult<Option<DataSchema>> {
        self.log
            .info(format!("phase {} started", PipelinePhase::SchemaValidation));
        let outcome = SchemaValidator::new(&self.config.schema_path).validate();
        self.log
            .info(format!("schema validation returned {}", outcome.status));

        let authoritative = if outcome.ok() {
            outcome
        } else {
            let backup = SchemaBackup::new(&self.config.schema_backup_path);
            let (recovered, healed) =
                self.run_recovery(result, Component::SchemaValidator, None, outcome, backup);
            if !recovered {
                self.log
                    .error("schema is a hard prerequisite; aborting the run");
                self.advance(PipelinePhase::Aborted)?;
                return Ok(None);
            }
            healed
        };

        let document = authoritative.data.clone().unwrap_or(Value::Null);
        let schema = match DataSchema::from_value(&document) {
            Ok(schema) => schema,
            Err(e) => {
                let message = format!("accepted schema document could not be decoded: {e}");
                self.log.error(&message);
                result.fail(ErrorKind::InvalidSchemaStructure, message);
                self.advance(PipelinePhase::Aborted)?;
                return Ok(None);
            }
        };
        result.schema_data = Some(document);
        self.log.info(format!(
            "schema accepted with {} source(s)",
            schema.source_count()
        ));
        self.advance(PipelinePhase::AnnotationLoad)?;
        Ok(Some(schema))
    }

    fn load_annotation(
        &mut self,
        result: &mut PipelineResult,
    ) -> FabricaResult<Option<PathAnnotation>> {
        self.log
            .info(format!("phase {} started", PipelinePhase::AnnotationLoad));
        match PathAnnotation::load(&self.config.annotation_path) {
            Ok(Some(annotation)) => {
                self.log.info(format!(
                    "loaded path annotation with {} source(s)",
                    annotation.len()
                ));
                for (source, path) in annotation.iter() {
                    self.log
                        .debug(format!("annotation overrides '{source}' to {}", path.display()));
                }
                self.advance(PipelinePhase::SourceCollection)?;
                Ok(Some(annotation))
            }
            Ok(None) => {
                // First run: absence is bootstrap, not an error
                self.log
                    .info("path annotation absent; proceeding with an empty mapping");
                self.advance(PipelinePhase::SourceCollection)?;
                Ok(Some(PathAnnotation::new()))
            }
            Err(e) => {
                let error_kind = match &e {
                    FabricaError::Json(_) => ErrorKind::InvalidJson,
                    _ => ErrorKind::FileReadError,
                };
                let message = format!(
                    "path annotation {} is present but unusable: {e}",
                    self.config.annotation_path.display()
                );
                self.log.error(&message);
                result.fail(error_kind, message);
                self.advance(PipelinePhase::Aborted)?;
                Ok(None)
            }
        }
    }

    fn collect_sources(
        &mut self,
        result: &mut PipelineResult,
        schema: &DataSchema,
        annotation: &PathAnnotation,
    ) -> FabricaResult<()> {
        self.log.info(format!(
            "phase {} started: {} source(s) to collect",
            PipelinePhase::SourceCollection,
            schema.source_count()
        ));
        let mut failed_sources: Vec<String> = Vec::new();
        let mut failure_messages: Vec<String> = Vec::new();

        for (kind, name, spec) in schema.sources() {
            self.log.info(format!("collecting '{name}' ({kind})"));
            let collector = CollectorFactory::create(kind, name, spec, annotation);
            let outcome = collector.process();
            self.log
                .info(format!("'{name}' collection returned {}", outcome.status));

            let authoritative = if outcome.ok() {
                outcome
            } else {
                let mut backup = SourceBackup::new(&self.config.backup_annotation_path, name);
                if let Some(required) = spec.required_fields.clone() {
                    backup = backup.with_required_fields(required);
                }
                let (recovered, healed) = self.run_recovery(
                    result,
                    Component::DataCollector,
                    Some(name.as_str()),
                    outcome,
                    backup,
                );
                if !recovered {
                    failed_sources.push(name.clone());
                    failure_messages.push(result.error_message.clone());
                    continue;
                }
                healed
            };
            result
                .collected_data
                .insert(name.clone(), authoritative.data.unwrap_or(Value::Null));
        }

        result.metadata.insert(
            "failed_db_types".to_string(),
            Value::Array(failed_sources.iter().cloned().map(Value::String).collect()),
        );

        if failed_sources.is_empty() {
            self.log.info(format!(
                "all {} source(s) collected",
                schema.source_count()
            ));
        } else {
            // All-or-nothing: one unrecovered source fails the whole run,
            // but the sources that did succeed stay in collected_data for
            // diagnostics
            self.log.error(format!(
                "{} of {} source(s) failed recovery: {}",
                failed_sources.len(),
                schema.source_count(),
                failed_sources.join(", ")
            ));
            let error_kind = result.error_kind;
            result.fail(error_kind, failure_messages.join("\n"));
        }
        self.advance(PipelinePhase::Done)?;
        Ok(())
    }

    /// Two-tier recovery protocol shared by every failable stage
    ///
    /// Local tier first; on its failure the global tier always runs, so an
    /// unrecovered failure leaves exactly one durable notification record.
    /// The returned flag says whether the stage may proceed on the returned
    /// outcome. On protocol failure the result's failure fields are set
    /// from the original outcome and the composed directive summary.
    fn run_recovery<S: BackupSource>(
        &mut self,
        result: &mut PipelineResult,
        component: Component,
        source: Option<&str>,
        outcome: ProcessingReport,
        backup: S,
    ) -> (bool, ProcessingReport) {
        let key = component.key(source);
        let original_kind = outcome.error_kind;
        let original_message = outcome.error_message.clone();
        self.log.warn(format!(
            "'{key}' failed with {original_kind}: {original_message}; starting recovery protocol"
        ));

        let context = RetryContext::new(0, self.config.max_retries);
        let directives = recovery_actions_for(component, original_kind, Some(&context));
        if directives.is_empty() {
            self.log.warn(format!(
                "no recovery directives configured for {component}/{original_kind}"
            ));
        }

        let healer = LocalHealer::new(key.clone(), directives, outcome, backup);
        let (local_directives, healed) = healer.heal();
        result.record_directives(key.clone(), local_directives.clone());

        if healed.is_success() {
            self.log.info(format!(
                "local healing for '{key}' succeeded; adopting recovered data"
            ));
            return (true, healed);
        }

        self.log.warn(format!(
            "local healing for '{key}' failed; escalating to manual review"
        ));
        let notification_path = self.notification_path(component, source);
        let notifier = ManualReviewNotifier::new(key.clone(), local_directives, healed.clone())
            .with_channel(Box::new(FileChannel::new(&notification_path)));
        let (global_directives, delivery) = notifier.notify();

        match delivery.status {
            ProcessingStatus::Success => self.log.info(format!(
                "manual-review notification for '{key}' written to {}",
                notification_path.display()
            )),
            ProcessingStatus::Skip => self.log.warn(format!(
                "no manual-review directive pending for '{key}'; nothing was delivered"
            )),
            _ => self.log.error(format!(
                "manual-review notification for '{key}' could not be delivered: {}",
                delivery.error_message
            )),
        }

        let directive_lines: Vec<String> = global_directives
            .iter()
            .map(|directive| directive.summary())
            .collect();
        for line in &directive_lines {
            self.log.info(format!("directive for '{key}': {line}"));
        }
        result.record_directives(key.clone(), global_directives);
        result.fail(
            original_kind,
            format!(
                "Local healing for {key} failed: {original_message}. \
                 Recovery action results for {key}: {}",
                directive_lines.join("; ")
            ),
        );
        (false, healed)
    }

    /// Per-failure notification path: run timestamp + component + source
    fn notification_path(&self, component: Component, source: Option<&str>) -> PathBuf {
        let run_ts = self.started_at.format("%Y%m%d_%H%M%S");
        let file_name = match source {
            Some(source) => format!("{run_ts}_{}_{source}.log", component.as_str()),
            None => format!("{run_ts}_{}.log", component.as_str()),
        };
        self.config.notifications_dir.join(file_name)
    }

    fn advance(&mut self, next: PipelinePhase) -> FabricaResult<()> {
        if !self.phase.can_transition_to(next) {
            return Err(FabricaError::InvalidPhaseTransition(format!(
                "{} -> {next}",
                self.phase
            )));
        }
        self.log
            .debug(format!("phase transition {} -> {next}", self.phase));
        self.phase = next;
        Ok(())
    }

    fn record_phase_duration(&mut self, phase: PipelinePhase, timer: Instant) {
        let elapsed_ms = timer.elapsed().as_millis() as u64;
        self.log
            .debug(format!("phase {phase} took {elapsed_ms}ms"));
        self.phase_durations
            .insert(phase.as_str().to_string(), Value::from(elapsed_ms));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
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

    fn write_molds_schema(dir: &TempDir, table_path: &std::path::Path) {
        let schema = json!({
            "staticDB": {
                "moldsDB": {
                    "path": table_path.to_string_lossy(),
                    "dtypes": {"mold": "str", "cavities": "int"}
                }
            },
            "dynamicDB": {}
        });
        fs::write(
            dir.path().join("schema.json"),
            serde_json::to_string_pretty(&schema).unwrap(),
        )
        .unwrap();
    }

    #[test]
    fn test_clean_run_collects_every_source() {
        let dir = TempDir::new().unwrap();
        let table = dir.path().join("molds.json");
        fs::write(
            &table,
            json!([{"mold": "M-104", "cavities": 8}]).to_string(),
        )
        .unwrap();
        write_molds_schema(&dir, &table);

        let pipeline = DataPipeline::new(config_for(&dir));
        let run_id = pipeline.run_id();
        let result = pipeline.run();

        assert!(result.is_success(), "{}", result.error_message);
        assert_eq!(result.error_kind, ErrorKind::None);
        assert!(result.collected_data.contains_key("moldsDB"));
        assert!(result.recovery_actions.is_empty());
        assert_eq!(result.metadata["run_id"], json!(run_id.to_string()));
        assert_eq!(result.metadata["final_phase"], json!("DONE"));
        assert_eq!(result.metadata["failed_db_types"], json!([]));
        assert!(result.log_text().contains("SCHEMA_VALIDATION"));
    }

    #[test]
    fn test_missing_annotation_is_bootstrap() {
        let dir = TempDir::new().unwrap();
        let table = dir.path().join("molds.json");
        fs::write(&table, json!([{"mold": "M-104", "cavities": 8}]).to_string()).unwrap();
        write_molds_schema(&dir, &table);

        let result = DataPipeline::new(config_for(&dir)).run();
        assert!(result.is_success());
        assert!(result.path_annotation.is_empty());
        assert!(result.log_text().contains("annotation absent"));
    }

    #[test]
    fn test_corrupt_annotation_aborts_without_recovery() {
        let dir = TempDir::new().unwrap();
        let table = dir.path().join("molds.json");
        fs::write(&table, json!([{"mold": "M-104", "cavities": 8}]).to_string()).unwrap();
        write_molds_schema(&dir, &table);
        fs::write(dir.path().join("annotation.json"), "{not json").unwrap();

        let result = DataPipeline::new(config_for(&dir)).run();

        assert!(result.is_error());
        assert_eq!(result.error_kind, ErrorKind::InvalidJson);
        assert_eq!(result.metadata["final_phase"], json!("ABORTED"));
        assert!(result.recovery_actions.is_empty());
        assert!(result.collected_data.is_empty());
    }

    #[test]
    fn test_annotation_override_redirects_collection() {
        let dir = TempDir::new().unwrap();
        let stale = dir.path().join("molds.json");
        fs::write(&stale, json!([{"mold": "OLD", "cavities": 1}]).to_string()).unwrap();
        write_molds_schema(&dir, &stale);

        let fresh = dir.path().join("molds_current.json");
        fs::write(&fresh, json!([{"mold": "M-205", "cavities": 16}]).to_string()).unwrap();
        let mut annotation = PathAnnotation::new();
        annotation.insert("moldsDB", &fresh);
        annotation.save(dir.path().join("annotation.json")).unwrap();

        let result = DataPipeline::new(config_for(&dir)).run();

        assert!(result.is_success(), "{}", result.error_message);
        assert_eq!(
            result.collected_data["moldsDB"],
            json!([{"mold": "M-205", "cavities": 16}])
        );
        assert!(result.log_text().contains("annotation overrides 'moldsDB'"));
    }

    #[test]
    fn test_rejected_phase_transition_is_reported_not_propagated() {
        let dir = TempDir::new().unwrap();
        let mut pipeline = DataPipeline::new(config_for(&dir));
        assert_eq!(pipeline.phase(), PipelinePhase::SchemaValidation);

        let denied = pipeline.advance(PipelinePhase::Done);
        assert!(matches!(
            denied,
            Err(FabricaError::InvalidPhaseTransition(_))
        ));
        assert_eq!(pipeline.phase(), PipelinePhase::SchemaValidation);
    }
}
