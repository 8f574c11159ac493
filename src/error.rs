//! Error types for fetching, extraction, persistence and configuration
//!
//! Only configuration and sink errors can end a run. Fetch and extraction
//! failures are recorded per page and the crawl carries on.

/// Errors raised while validating a crawl configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The index URL template has no `{}` placeholder for the alphabet symbol
    #[error("Index URL template must contain '{{}}', got '{0}'")]
    MissingPlaceholder(String),

    /// The alphabet has no symbols to enumerate
    #[error("Alphabet must contain at least one symbol")]
    EmptyAlphabet,

    /// The alphabet specification could not be parsed
    #[error("Invalid alphabet '{spec}': {reason}")]
    InvalidAlphabet { spec: String, reason: String },

    /// The quiet interval must be non-zero
    #[error("Quiet interval must be greater than 0")]
    InvalidQuietInterval,

    /// Dedup cache capacity must be greater than 0
    #[error("Cache capacity must be greater than 0, got {0}")]
    InvalidCacheCapacity(usize),

    /// Record limit, when set, must be greater than 0
    #[error("Record limit must be greater than 0, got {0}")]
    InvalidRecordLimit(usize),

    /// Fetch concurrency bound, when set, must be greater than 0
    #[error("Max in-flight fetches must be greater than 0, got {0}")]
    InvalidMaxInFlight(usize),

    /// A configured CSS selector does not parse
    #[error("Failed to parse selector '{selector}': {error}")]
    InvalidSelector { selector: String, error: String },

    /// A configured regular expression does not compile
    #[error("Invalid pattern '{pattern}': {error}")]
    InvalidPattern {
        pattern: String,
        #[source]
        error: regex::Error,
    },

    /// The HTTP client could not be constructed
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
}

/// Errors that can occur while fetching a page
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The request could not be sent or the body could not be read
    #[error("Request to '{url}' failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status
    #[error("Request to '{url}' returned status {status}")]
    Status { url: String, status: u16 },

    /// No page is available for the URL
    #[error("No page available at '{0}'")]
    NotFound(String),
}

/// Errors that can occur while extracting a record from an entry page
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    /// Required field was not found in the HTML
    ///
    /// For entry pages this is the headword. The fetcher turns it into an
    /// unresolved outcome rather than an error.
    #[error("Required field '{field}' not found using selector '{selector}'")]
    MissingField { field: String, selector: String },
}

/// Errors raised by a record sink
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// Underlying writer failed
    #[error("Sink I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV encoding failed
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Errors that abort a crawl run
#[derive(Debug, thiserror::Error)]
pub enum CrawlError {
    /// The configuration was rejected before the run started
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The sink failed to accept or flush a record
    #[error(transparent)]
    Sink(#[from] SinkError),
}
