use cfmv_core::CfmvError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Dataset(#[from] CfmvError),
}

pub type Result<T> = std::result::Result<T, IngestError>;
