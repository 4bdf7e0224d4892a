//! Typed failures surfaced to callers of the engine.
//!
//! Only clearly invalid call shapes (missing training columns, missing source
//! files, bad labels) and lifecycle conflicts reach the caller. Model faults on
//! the detection path are absorbed and logged instead.

use std::path::PathBuf;

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("training source not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    #[error("table must contain column '{column}' (available: {})", .available.join(", "))]
    MissingColumn {
        column: String,
        available: Vec<String>,
    },

    #[error("row {row}: label '{value}' is not a binary label")]
    InvalidLabel { row: usize, value: String },

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("feature schema mismatch: expected {expected:?}, found {found:?}")]
    SchemaMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("model fault: {0}")]
    ModelFault(String),

    #[error("model file is corrupted: {0}")]
    CorruptModel(String),

    #[error("a retrain is already in progress")]
    RetrainInProgress,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Serde(#[from] serde_json::Error),
}

impl EngineError {
    /// True for errors caused by the caller's arguments rather than engine state.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput(_)
                | Self::SourceNotFound(_)
                | Self::MissingColumn { .. }
                | Self::InvalidLabel { .. }
                | Self::Validation(_)
        )
    }
}
