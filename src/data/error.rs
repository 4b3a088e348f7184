use std::path::PathBuf;

use thiserror::Error;

use super::model::ColumnType;

/// Errors produced by the data layer (loading, filtering, aggregation).
#[derive(Debug, Error)]
pub enum DataError {
    #[error("required column '{0}' is missing from the input")]
    MissingColumn(String),

    #[error("column '{column}' could not be coerced to {ty} in any of {rows} rows")]
    Schema {
        column: String,
        ty: ColumnType,
        rows: usize,
    },

    #[error("unknown column '{0}'")]
    UnknownColumn(String),

    #[error("join key '{0}' is not present in both tables")]
    JoinKey(String),

    #[error("no retained source table at position {0}")]
    SourceTable(usize),

    #[error("I/O error reading {}: {1}", .0.display())]
    Io(PathBuf, #[source] std::io::Error),

    #[error("CSV error in {}: {1}", .0.display())]
    Csv(PathBuf, #[source] csv::Error),

    #[error("JSON error in {}: {1}", .0.display())]
    Json(PathBuf, #[source] serde_json::Error),

    #[error("Parquet error in {}: {1}", .0.display())]
    Parquet(PathBuf, #[source] parquet::errors::ParquetError),

    #[error("Arrow error in {}: {1}", .0.display())]
    Arrow(PathBuf, #[source] arrow::error::ArrowError),

    #[error("unsupported file extension: .{0}")]
    UnsupportedExtension(String),
}

pub type Result<T> = std::result::Result<T, DataError>;
