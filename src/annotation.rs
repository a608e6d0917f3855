//! Path annotations: where each logical source's data lives on disk
//!
//! The live annotation maps source names to their current table files and
//! may legitimately not exist yet (first run). The backup annotation maps
//! source names to rollback copies and may additionally record expected
//! checksums for them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::FabricaResult;

/// Live source-name → table-path mapping
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PathAnnotation {
    sources: BTreeMap<String, PathBuf>,
}

impl PathAnnotation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the annotation file
    ///
    /// `Ok(None)` means the file does not exist; that is bootstrap
    /// behavior, not an error. A present but unreadable or unparsable
    /// file is a real failure.
    pub fn load<P: AsRef<Path>>(path: P) -> FabricaResult<Option<Self>> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(path)?;
        let annotation = serde_json::from_str(&contents)?;
        Ok(Some(annotation))
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> FabricaResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, json)?;
        Ok(())
    }

    pub fn insert(&mut self, source: impl Into<String>, path: impl Into<PathBuf>) {
        self.sources.insert(source.into(), path.into());
    }

    pub fn path_for(&self, source: &str) -> Option<&Path> {
        self.sources.get(source).map(PathBuf::as_path)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &PathBuf)> {
        self.sources.iter()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

/// Backup annotation consumed by the data-source healer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BackupAnnotation {
    pub sources: BTreeMap<String, PathBuf>,
    /// Optional expected SHA-256 hex digest per source
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub checksums: BTreeMap<String, String>,
}

impl BackupAnnotation {
    pub fn load<P: AsRef<Path>>(path: P) -> FabricaResult<Self> {
        let contents = fs::read_to_string(path)?;
        let annotation = serde_json::from_str(&contents)?;
        Ok(annotation)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> FabricaResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, json)?;
        Ok(())
    }

    pub fn backup_path_for(&self, source: &str) -> Option<&Path> {
        self.sources.get(source).map(PathBuf::as_path)
    }

    pub fn checksum_for(&self, source: &str) -> Option<&str> {
        self.checksums.get(source).map(String::as_str)
    }
}
