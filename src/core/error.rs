use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShoalError {
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
    #[error("Document parse error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Path error: {0}")]
    PathError(String),
    #[error("Lock wait timed out after {0} ms")]
    LockTimeout(u64),
}
