//! Error types for the diagnostic pipeline
//!
//! Only conditions that stop a run before any entity is built are errors.
//! Everything the diagnostic finds in the data itself (coercion warnings,
//! dangling references, starved buses, bottlenecks) is carried as data in the
//! load diagnostics or the report.
//!
//! # Example
//!
//! ```ignore
//! use netdiag_core::{NetdiagError, NetdiagResult};
//!
//! fn run(dir: &Path) -> NetdiagResult<DiagnosticReport> {
//!     let tables = read_table_dir(dir)?;
//!     let loaded = load_network(&tables, &LoaderConfig::default())?;
//!     Ok(diagnose(&loaded.network, None, &DiagnosisConfig::default())?.report)
//! }
//! ```

use thiserror::Error;

/// Unified error type for loading and diagnosing a network snapshot.
#[derive(Error, Debug)]
pub enum NetdiagError {
    /// A required record collection or column is missing
    #[error("Schema error: {}", schema_message(.table, .column))]
    Schema {
        table: String,
        column: Option<String>,
    },

    /// I/O errors (file access)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed tabular input that could not be read at all
    #[error("Parse error: {0}")]
    Parse(String),

    /// Invalid diagnosis configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

fn schema_message(table: &str, column: &Option<String>) -> String {
    match column {
        Some(column) => format!("table '{table}' is missing required column '{column}'"),
        None => format!("required table '{table}' is missing"),
    }
}

impl NetdiagError {
    /// A required collection is missing entirely.
    pub fn missing_table(table: impl Into<String>) -> Self {
        NetdiagError::Schema {
            table: table.into(),
            column: None,
        }
    }

    /// A required column is missing from a collection.
    pub fn missing_column(table: impl Into<String>, column: impl Into<String>) -> Self {
        NetdiagError::Schema {
            table: table.into(),
            column: Some(column.into()),
        }
    }
}

/// Convenience type alias for Results using NetdiagError.
pub type NetdiagResult<T> = Result<T, NetdiagError>;
