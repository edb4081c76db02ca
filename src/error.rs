use thiserror::Error;

#[derive(Error, Debug)]
pub enum FdError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Data source error: {0}")]
    DataSource(String),

    #[error("Unknown attribute: {0}")]
    UnknownAttribute(String),

    #[error("Dependencies admitted out of order: {0}")]
    OutOfOrder(String),

    #[error("Execution error: {0}")]
    Execution(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Polars error: {0}")]
    Polars(String),

    #[error("SQLite error: {0}")]
    Sqlite(String),
}

impl FdError {
    /// True when the run was aborted because the relation could not be read.
    pub fn is_data_source(&self) -> bool {
        matches!(
            self,
            FdError::DataSource(_) | FdError::Polars(_) | FdError::Sqlite(_)
        )
    }
}

impl From<polars::error::PolarsError> for FdError {
    fn from(err: polars::error::PolarsError) -> Self {
        FdError::Polars(err.to_string())
    }
}

impl From<rusqlite::Error> for FdError {
    fn from(err: rusqlite::Error) -> Self {
        FdError::Sqlite(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, FdError>;
