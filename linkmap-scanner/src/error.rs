use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Fetch failed: {0}")]
    FetchError(String),

    #[error("Invalid location: {0}")]
    InvalidLocation(String),

    #[error("Extraction failed: {0}")]
    ExtractionError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Task join error: {0}")]
    JoinError(#[from] tokio::task::JoinError),

    #[error("Other error: {0}")]
    Other(String),
}

impl ScanError {
    /// Whether the error only concerns a single location. Such errors are
    /// recorded against that location and never abort a crawl.
    pub fn is_per_location(&self) -> bool {
        matches!(
            self,
            ScanError::HttpError(_)
                | ScanError::FetchError(_)
                | ScanError::InvalidLocation(_)
                | ScanError::ExtractionError(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ScanError>;
