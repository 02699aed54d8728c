use thiserror::Error;

pub type Result<T> = std::result::Result<T, IndexerError>;

#[derive(Error, Debug)]
pub enum IndexerError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Chunker error: {0}")]
    ChunkerError(#[from] goon_code_chunker::ChunkerError),

    #[error("Invalid repository path: {0}")]
    InvalidPath(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Function not found: {0}")]
    FunctionNotFound(String),

    #[error("Task failed: {0}")]
    TaskFailed(String),
}
