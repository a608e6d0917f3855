//! Pipeline configuration: file locations and the retry budget

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{FabricaError, FabricaResult};

fn default_max_retries() -> u32 {
    3
}

/// Everything a pipeline run needs to know about its environment
///
/// Built through [`PipelineConfig::builder`] or loaded from a JSON file.
/// All paths are required; `max_retries` caps how often RETRY_PROCESSING
/// directives stay eligible and defaults to 3.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Schema document validated at the start of every run
    pub schema_path: PathBuf,
    /// Known-good schema copy the healer may roll back to
    pub schema_backup_path: PathBuf,
    /// Live source-name → table-path annotation (may not exist yet)
    pub annotation_path: PathBuf,
    /// Backup annotation consumed by the data-source healer
    pub backup_annotation_path: PathBuf,
    /// Directory receiving one notification snapshot per escalation
    pub notifications_dir: PathBuf,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl PipelineConfig {
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    pub fn load<P: AsRef<Path>>(path: P) -> FabricaResult<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> FabricaResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, json)?;
        Ok(())
    }

    fn validate(&self) -> FabricaResult<()> {
        let paths = [
            ("schema_path", &self.schema_path),
            ("schema_backup_path", &self.schema_backup_path),
            ("annotation_path", &self.annotation_path),
            ("backup_annotation_path", &self.backup_annotation_path),
            ("notifications_dir", &self.notifications_dir),
        ];
        for (field, path) in paths {
            if path.as_os_str().is_empty() {
                return Err(FabricaError::InvalidConfig(format!("{field} is empty")));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct PipelineConfigBuilder {
    schema_path: Option<PathBuf>,
    schema_backup_path: Option<PathBuf>,
    annotation_path: Option<PathBuf>,
    backup_annotation_path: Option<PathBuf>,
    notifications_dir: Option<PathBuf>,
    max_retries: Option<u32>,
}

impl PipelineConfigBuilder {
    pub fn schema_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.schema_path = Some(path.into());
        self
    }

    pub fn schema_backup_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.schema_backup_path = Some(path.into());
        self
    }

    pub fn annotation_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.annotation_path = Some(path.into());
        self
    }

    pub fn backup_annotation_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.backup_annotation_path = Some(path.into());
        self
    }

    pub fn notifications_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.notifications_dir = Some(path.into());
        self
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    pub fn build(self) -> FabricaResult<PipelineConfig> {
        let require = |field: &str, value: Option<PathBuf>| {
            value.ok_or_else(|| FabricaError::InvalidConfig(format!("{field} is required")))
        };
        let config = PipelineConfig {
            schema_path: require("schema_path", self.schema_path)?,
            schema_backup_path: require("schema_backup_path", self.schema_backup_path)?,
            annotation_path: require("annotation_path", self.annotation_path)?,
            backup_annotation_path: require("backup_annotation_path", self.backup_annotation_path)?,
            notifications_dir: require("notifications_dir", self.notifications_dir)?,
            max_retries: self.max_retries.unwrap_or_else(default_max_retries),
        };
        config.validate()?;
        Ok(config)
    }
}
