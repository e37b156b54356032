use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CanvasError {
    // Config errors
    #[error("CONFIG_PARSE_ERROR: {0}")]
    ConfigParseError(String),

    #[error("CONFIG_INVALID: failed to parse {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("CONFIG_INVALID_VALUE: {field}: {reason}")]
    ConfigInvalidValue { field: String, reason: String },

    // Path errors
    #[error("PATH_NOT_DIRECTORY: '{path}' exists but is not a directory")]
    PathNotDirectory { path: PathBuf },

    // IO errors
    #[error("IO_ERROR: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CanvasError>;
