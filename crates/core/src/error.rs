use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv parse error: {0}")]
    Csv(#[from] csv::Error),

    #[error("path has no file name: {0}")]
    MissingFileName(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Debug, Error)]
pub enum SearchError {
    /// The backend understood the request and refused it (4xx). Carries the
    /// backend-provided message, e.g. an index-creation conflict.
    #[error("backend rejected request: {details}")]
    Rejected { details: String },

    /// Transport failure or backend-side fault (5xx). The operation is
    /// abandoned; session state stays usable.
    #[error("backend unavailable: {0}")]
    Unavailable(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The query was degenerate before any backend call, e.g. every filter
    /// was blank after trimming.
    #[error("invalid query: {0}")]
    InvalidQuery(String),
}

pub type Result<T, E = IngestError> = std::result::Result<T, E>;
