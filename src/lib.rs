// Urban Density - Core Library
// Exposes all modules for use in CLI, map server, and tests

pub mod error;
pub mod loader;
pub mod join;
pub mod record;
pub mod density;
pub mod classify;
pub mod export;
pub mod summary;
pub mod config;
pub mod pipeline;

// Re-export commonly used types
pub use error::{ExportError, JoinKeyError, LoadError, PipelineError, UndefinedDensityError};
pub use loader::{
    ColumnKind, ColumnSpec, CsvSource, KeyedTable, Row, SourceKind, SourceSpec, TableSource,
    Value, read_table,
};
pub use join::{left_join, DuplicateKeyPolicy, JoinOutcome, JoinStats};
pub use record::{zip_records, ZipRecord};
pub use density::{
    density_per_sq_km, measure, Density, MeasuredTable, MeasuredZip, UndefinedDensityPolicy,
    UndefinedReason,
};
pub use classify::{
    classify, classify_all, Category, Classification, ClassifiedZip, Classifier, DensityRule,
    STANDARD_RULES,
};
pub use export::{parse_json, to_js_assignment, to_json, write_js, write_json};
pub use summary::{sample, CategoryStat, DensityStats, Summary};
pub use config::{MapConfig, PipelineConfig, PolicyConfig, ServerConfig, SourceConfig};
pub use pipeline::{run, run_and_export, Pipeline, PipelineOutput, RunReport};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
