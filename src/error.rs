use thiserror::Error;

/// All errors the pipeline can produce.
#[derive(Debug, Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("model file error: {0}")]
    ModelFile(#[from] serde_json::Error),

    #[error("invalid model file: {0}")]
    InvalidModel(String),

    #[error("record {record}: {msg}")]
    MalformedRecord { record: usize, msg: String },

    #[error("unknown position label {0}")]
    UnknownPosition(i64),

    #[error("missing column {0:?}")]
    MissingColumn(String),

    #[error("dataset is empty")]
    EmptyDataset,

    #[error("expected {expected} feature columns, got {got}")]
    FeatureCountMismatch { expected: usize, got: usize },

    #[error("headers differ between {first} and {second}")]
    HeaderMismatch { first: String, second: String },

    #[error("window size and step size must be positive")]
    InvalidWindowing,

    #[error("shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    #[error("model has not been fitted")]
    NotFitted,
}

pub type Result<T> = std::result::Result<T, Error>;
