use std::path::PathBuf;

use polars::error::PolarsError;
use thiserror::Error;

/// Errors raised while loading, scaling, windowing or training.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("price file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("required column `{0}` not found")]
    MissingColumn(String),

    #[error("column `{column}` has a missing or unparseable value at row {row}")]
    InvalidValue { column: String, row: usize },

    #[error("need at least {required} rows, found {found}")]
    InsufficientRows { required: usize, found: usize },

    #[error("cannot fit a scaler on an empty table")]
    EmptyTable,

    #[error("column `{column}` contains a NaN or infinite value")]
    NonFiniteValue { column: String },

    #[error("expected {expected} columns, found {found}")]
    ColumnMismatch { expected: usize, found: usize },

    #[error("window {index} has shape {found:?}, expected {expected:?}")]
    WindowShape {
        index: usize,
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("cannot read tensor data: {0}")]
    TensorData(String),

    #[error("training loss became NaN or infinite in epoch {epoch}")]
    NonFiniteLoss { epoch: usize },

    #[error(transparent)]
    Polars(#[from] PolarsError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
