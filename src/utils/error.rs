use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScrapeError {
    #[error("Navigation failed for {url} after {attempts} attempts")]
    Navigation { url: String, attempts: usize },

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("Persistence error: {message}")]
    Persistence { message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl ScrapeError {
    pub fn browser(err: impl std::fmt::Display) -> Self {
        ScrapeError::Browser(err.to_string())
    }

    pub fn selector(selector: &str, err: impl std::fmt::Debug) -> Self {
        ScrapeError::Selector {
            selector: selector.to_string(),
            message: format!("{:?}", err),
        }
    }
}

impl From<tempfile::PersistError> for ScrapeError {
    fn from(err: tempfile::PersistError) -> Self {
        ScrapeError::Persistence {
            message: format!("atomic rename failed: {}", err.error),
        }
    }
}

pub type Result<T> = std::result::Result<T, ScrapeError>;
