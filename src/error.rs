pub mod retry;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum OrgBridgeError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Initialization error: {0}")]
    Initialization(String),

    #[error("Metadata error for {object}: {message}")]
    Metadata { object: String, message: String },

    #[error("Query error for {object}: {message}")]
    Query { object: String, message: String },

    #[error("Commit error for {object}: {message}")]
    Commit { object: String, message: String },

    #[error("Engine error: {0}")]
    Engine(String),

    #[error("Job aborted by user during {0}")]
    UserAbort(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl From<reqwest::Error> for OrgBridgeError {
    fn from(err: reqwest::Error) -> Self {
        OrgBridgeError::Http(err.to_string())
    }
}

impl OrgBridgeError {
    /// User-abort is a first-class condition, never folded into other
    /// failure buckets.
    pub fn is_user_abort(&self) -> bool {
        matches!(self, OrgBridgeError::UserAbort(_))
    }
}

pub type Result<T> = std::result::Result<T, OrgBridgeError>;
