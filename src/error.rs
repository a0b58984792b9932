use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScraperError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Listing feed is missing required columns: {0:?}")]
    MissingColumns(Vec<String>),

    #[error("API error: {message}")]
    Api { message: String },

    #[error("No enrichment result for address '{0}'")]
    EnrichmentGap(String),
}

pub type Result<T> = std::result::Result<T, ScraperError>;
