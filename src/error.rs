use thiserror::Error;
use std::io;

#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Report parsing error: {0}")]
    Parse(String),

    #[error("Community detection error: {0}")]
    Detection(String),

    #[error("Analysis error: {0}")]
    Analysis(String),

    #[error("Entity universe is empty: {0}")]
    EmptyUniverse(String),

    #[error("Distance computation error: {0}")]
    Distance(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Thread pool error: {0}")]
    ThreadPool(String),
}

// Type alias for Result
pub type Result<T> = std::result::Result<T, Error>;

// Helper functions for common error conversions
impl Error {
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }

    pub fn detection<S: Into<String>>(msg: S) -> Self {
        Error::Detection(msg.into())
    }

    pub fn analysis<S: Into<String>>(msg: S) -> Self {
        Error::Analysis(msg.into())
    }

    pub fn distance<S: Into<String>>(msg: S) -> Self {
        Error::Distance(msg.into())
    }

    /// True for errors raised while validating arguments, before any I/O.
    pub fn is_config(&self) -> bool {
        matches!(self, Error::Config(_))
    }
}

impl From<crate::parser::ParserError> for Error {
    fn from(err: crate::parser::ParserError) -> Self {
        match err {
            crate::parser::ParserError::IoError(e) => Error::Io(e),
            other => Error::Parse(other.to_string()),
        }
    }
}

impl From<rayon::ThreadPoolBuildError> for Error {
    fn from(err: rayon::ThreadPoolBuildError) -> Self {
        Error::ThreadPool(format!("Thread pool build failed: {}", err))
    }
}
