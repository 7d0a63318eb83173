use thiserror::Error;

#[derive(Error, Debug)]
pub enum SubfetchError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Malformed age expression: {0}")]
    MalformedDuration(String),

    #[error("Configuration error: {0}")]
    InvalidConfiguration(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Scan error: {0}")]
    Scan(String),
}

pub type Result<T> = std::result::Result<T, SubfetchError>;
