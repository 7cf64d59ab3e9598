use thiserror::Error;

#[derive(Error, Debug)]
pub enum FrontpageError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid source '{name}': {reason}")]
    InvalidSource { name: String, reason: String },

    // Network errors
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}")]
    HttpStatus { url: String, status: u16 },

    // Version control errors
    #[error("Git command failed: {0}")]
    Git(String),

    // Storage errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cache error: {0}")]
    Cache(String),
}

impl FrontpageError {
    pub fn invalid_source(name: &str, reason: impl Into<String>) -> Self {
        FrontpageError::InvalidSource {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

pub type FrontpageResult<T> = Result<T, FrontpageError>;
