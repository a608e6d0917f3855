use thiserror::Error;

/// Central error type for the fabrica pipeline core
///
/// Data-dependent runtime failures never surface here; pipeline stages
/// report those as ERROR outcomes (see `report::ProcessingReport`). This
/// type covers construction-time precondition violations and the fallible
/// plumbing underneath the stages (filesystem, serialization, delivery).
#[derive(Error, Debug)]
pub enum FabricaError {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Invalid pipeline configuration: {0}")]
    InvalidConfig(String),

    // ============================================================================
    // Notification Errors
    // ============================================================================
    #[error("Notification delivery failed: {0}")]
    NotificationDeliveryFailed(String),

    // ============================================================================
    // Pipeline Errors
    // ============================================================================
    #[error("Invalid phase transition: {0}")]
    InvalidPhaseTransition(String),

    // ============================================================================
    // Generic/System Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// Helper type alias for Results
pub type FabricaResult<T> = Result<T, FabricaError>;
