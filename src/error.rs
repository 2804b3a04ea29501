use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScrapeError {
    #[error("invalid event url {url:?}: {reason}")]
    Validation { url: String, reason: String },

    /// The bootstrap page no longer carries what we need; usually upstream markup drift.
    #[error("bootstrap extraction failed: {0}")]
    Extraction(String),

    #[error("detail page {url} returned status {status}")]
    DetailFetch { url: String, status: u16 },

    #[error("detail page {url} could not be parsed: {reason}")]
    DetailParse { url: String, reason: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] wreq::Error),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ScrapeError {
    /// Errors the collector recovers from by dropping the single event.
    pub fn is_skippable(&self, strict: bool) -> bool {
        match self {
            ScrapeError::DetailFetch { .. } => true,
            ScrapeError::DetailParse { .. } => !strict,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, ScrapeError>;
