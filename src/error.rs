// ⚠️ Error kinds for the density pipeline
// Every stage fails with its own error; PipelineError wraps them for callers

use thiserror::Error;

use crate::density::UndefinedReason;

// ============================================================================
// LOAD
// ============================================================================

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Failed to read source '{source_name}': {error}")]
    Io {
        source_name: String,
        #[source]
        error: std::io::Error,
    },

    #[error("Malformed CSV in source '{source_name}': {error}")]
    Csv {
        source_name: String,
        #[source]
        error: csv::Error,
    },

    #[error("Source '{source_name}' is missing required column '{column}'")]
    MissingColumn { source_name: String, column: String },

    #[error("Source '{source_name}' line {line}: column '{column}' has invalid value '{value}'")]
    InvalidValue {
        source_name: String,
        line: u64,
        column: String,
        value: String,
    },

    #[error("Source '{source_name}' line {line}: required column '{column}' is empty")]
    MissingValue {
        source_name: String,
        line: u64,
        column: String,
    },

    #[error("Record '{key}': column '{column}' does not hold {expected}")]
    SchemaMismatch {
        key: String,
        column: String,
        expected: &'static str,
    },
}

// ============================================================================
// JOIN
// ============================================================================

#[derive(Error, Debug, PartialEq, Eq)]
pub enum JoinKeyError {
    #[error("Duplicate key '{key}' in source '{source_name}' (lines {first_line} and {line})")]
    Duplicate {
        source_name: String,
        key: String,
        first_line: u64,
        line: u64,
    },

    #[error("Blank key in source '{source_name}' at line {line}")]
    Blank { source_name: String, line: u64 },
}

// ============================================================================
// DENSITY
// ============================================================================

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Density is undefined for '{id}': {reason}")]
pub struct UndefinedDensityError {
    pub id: String,
    pub reason: UndefinedReason,
}

// ============================================================================
// EXPORT
// ============================================================================

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to write '{path}': {error}")]
    Io {
        path: String,
        #[source]
        error: std::io::Error,
    },
}

// ============================================================================
// PIPELINE
// ============================================================================

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    JoinKey(#[from] JoinKeyError),

    #[error(transparent)]
    UndefinedDensity(#[from] UndefinedDensityError),

    #[error(transparent)]
    Export(#[from] ExportError),
}
