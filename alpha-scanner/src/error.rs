//! Error types for the scanner
//!
//! Uses thiserror for ergonomic error definitions.
//! Every pipeline failure is recoverable: the board turns it into a notice.

use thiserror::Error;

/// Custom Result type using our Error
pub type Result<T> = std::result::Result<T, ScanError>;

/// Scanner errors
#[derive(Error, Debug)]
pub enum ScanError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Credential bundle could not be used to sign a token
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Credential or network failure reaching the spreadsheet service
    #[error("Connection error: {0}")]
    Connection(String),

    /// Spreadsheet or worksheet does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// A rule or card field references a column the table does not have
    #[error("Missing column: {column}")]
    MissingColumn { column: String },

    /// No rows after loading. A valid state, not a failure.
    #[error("No rows in worksheet {0}")]
    EmptyResult(String),

    /// Malformed partition rule or expression text
    #[error("Rule error: {0}")]
    Rule(String),

    /// JSON parsing errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ScanError {
    pub fn missing_column(column: impl Into<String>) -> Self {
        ScanError::MissingColumn {
            column: column.into(),
        }
    }

    /// Whether waiting for the next refresh can clear this error
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ScanError::Auth(_) | ScanError::Connection(_) | ScanError::NotFound(_)
        )
    }

    /// Message shown on the page in place of the failed part
    pub fn user_message(&self) -> String {
        match self {
            ScanError::Auth(_) | ScanError::Connection(_) => {
                "Could not reach the scan spreadsheet. Please wait for the next refresh.".to_string()
            }
            ScanError::NotFound(what) => {
                format!("{what} was not found. Please wait for the next refresh.")
            }
            ScanError::MissingColumn { column } => {
                format!("This table has no '{column}' column.")
            }
            ScanError::EmptyResult(sheet) => format!("No scan results in {sheet} yet."),
            other => format!("Something went wrong: {other}"),
        }
    }
}

impl From<reqwest::Error> for ScanError {
    fn from(err: reqwest::Error) -> Self {
        ScanError::Connection(err.to_string())
    }
}
