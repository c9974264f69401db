use std::path::PathBuf;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("input file {} not found", .0.display())]
    MissingInput(PathBuf),

    #[error("failed to parse {} as delimited text: {reason}", .path.display())]
    Unparseable { path: PathBuf, reason: String },

    #[error("line {line} has {fields} fields, the header has {expected}")]
    RaggedRow {
        line: u64,
        fields: usize,
        expected: usize,
    },

    #[error("column {0:?} does not exist")]
    UnknownColumn(String),

    #[error("no valid data: every row has a missing or unparseable timestamp")]
    NoValidData,

    #[error("failed to draw chart: {0}")]
    Chart(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Arrow(#[from] arrow::error::ArrowError),

    #[error(transparent)]
    DataFusion(#[from] datafusion::error::DataFusionError),
}

/// Converts a plotters drawing error into [`Error::Chart`].
pub(crate) fn chart_err<E: std::error::Error>(error: E) -> Error {
    Error::Chart(error.to_string())
}
