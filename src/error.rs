use polars::prelude::PolarsError;
use thiserror::Error;

/// Input errors surfaced to the caller. Collaborator and cache failures are
/// recovered inside the services and never end up here.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Dataset could not be read as a table: {0}")]
    UnreadableDataset(String),

    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("File too large: {size} bytes exceeds the {limit} byte limit")]
    FileTooLarge { size: usize, limit: usize },

    #[error("Dataset has no columns")]
    EmptyDataset,

    #[error("Intent is missing a column for role '{role}'")]
    MissingBinding { role: String },

    #[error("Column '{column}' does not exist in the dataset")]
    UnknownColumn { column: String },

    #[error("Column '{column}' is not numeric")]
    NonNumericColumn { column: String },

    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),
}

impl AnalysisError {
    /// HTTP status the shell should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            AnalysisError::UnsupportedFileType(_) | AnalysisError::FileTooLarge { .. } => 422,
            AnalysisError::Polars(_) => 500,
            _ => 400,
        }
    }
}

pub type AnalysisResult<T> = std::result::Result<T, AnalysisError>;
