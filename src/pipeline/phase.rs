use serde::Serialize;
use std::fmt;

/// Phases of one pipeline run
///
/// `ABORTED` is reachable from the first two phases only: once source
/// collection starts, every source is attempted and the run finishes in
/// `DONE` even when the aggregate status is ERROR.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelinePhase {
    SchemaValidation,
    AnnotationLoad,
    SourceCollection,
    Done,
    Aborted,
}

impl PipelinePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelinePhase::SchemaValidation => "SCHEMA_VALIDATION",
            PipelinePhase::AnnotationLoad => "ANNOTATION_LOAD",
            PipelinePhase::SourceCollection => "SOURCE_COLLECTION",
            PipelinePhase::Done => "DONE",
            PipelinePhase::Aborted => "ABORTED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelinePhase::Done | PipelinePhase::Aborted)
    }

    pub fn can_transition_to(&self, next: PipelinePhase) -> bool {
        use PipelinePhase::*;
        matches!(
            (self, next),
            (SchemaValidation, AnnotationLoad)
                | (SchemaValidation, Aborted)
                | (AnnotationLoad, SourceCollection)
                | (AnnotationLoad, Aborted)
                | (SourceCollection, Done)
        )
    }
}

impl fmt::Display for PipelinePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
