use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    /// Failed to parse XML content
    #[error("Parse error: {0}")]
    ParseError(String),
    /// Failed to read an input or intermediate file
    #[error("Read error: {0}")]
    ReadError(String),
    /// Failed to write an intermediate or final file
    #[error("Write error: {0}")]
    WriteError(String),
    /// Generic IO operation failed
    #[error("IO error: {0}")]
    IoError(String),
    /// Invalid input format
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

// Conversion implementations for common errors
impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::IoError(err.to_string())
    }
}

impl From<quick_xml::Error> for AppError {
    fn from(err: quick_xml::Error) -> Self {
        AppError::ParseError(err.to_string())
    }
}

// Custom type alias for Results in this application
pub type AppResult<T> = Result<T, AppError>;
