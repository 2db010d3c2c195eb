pub mod report;
pub mod directory;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParserError {
   #[error("Configuration error: {0}")]
   ConfigError(String),

   #[error("IO error: {0}")]
   IoError(#[from] std::io::Error),

   #[error("Invalid report {path}: {reason}")]
   InvalidReport { path: String, reason: String },
}

pub type Result<T> = std::result::Result<T, ParserError>;

pub use self::report::ReportParser;
pub use self::directory::list_reports;
