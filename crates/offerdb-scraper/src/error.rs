use thiserror::Error;

/// Session-level failures of a single store's scrape.
///
/// Data-quality problems (unparsable prices, malformed cards, unknown deal
/// formats) never surface here; they are absorbed by the extractor and the
/// normalizer.
#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("rendering {url} exceeded the {timeout_secs}s deadline")]
    RenderTimeout { url: String, timeout_secs: u64 },

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("malformed promotion page at {url}: {reason}")]
    MalformedPage { url: String, reason: String },

    #[error("could not extract '{selector}' from rendered page: {reason}")]
    Extraction { selector: String, reason: String },

    #[error("browser error: {0}")]
    Browser(String),
}

impl ScraperError {
    /// Short machine-friendly label for logs and run summaries.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            ScraperError::RenderTimeout { .. } => "render_timeout",
            ScraperError::Navigation { .. } => "navigation",
            ScraperError::MalformedPage { .. } => "malformed_page",
            ScraperError::Extraction { .. } => "extraction",
            ScraperError::Browser(_) => "browser",
        }
    }
}
