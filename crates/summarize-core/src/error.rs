use thiserror::Error;

/// Unified error type for the summarize core and its front-ends.
///
/// Variants map directly onto the error-kind table in the design doc: each
/// one carries the policy a caller needs (retry once, surface synchronously,
/// attach as a diagnostic and keep going) in its own handling, not here.
#[derive(Error, Debug)]
pub enum Error {
    #[error("configuration error in {path}: {reason}")]
    Configuration { path: String, reason: String },

    #[error("invalid input: {0}")]
    InputValidation(String),

    #[error("daemon unreachable: {0}")]
    UnreachableDaemon(String),

    #[error("extraction failed: {0}")]
    Extraction(String),

    #[error("page has no article text but references a single video: {url}")]
    VideoOnlyPage { url: String },

    #[error("model access rejected for {model}: {reason}")]
    ModelAccessRejection { model: String, reason: String },

    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("empty summary")]
    EmptySummary,

    #[error("input token count ({estimated}) exceeds model cap ({cap}) for {model}")]
    InputTooLarge {
        model: String,
        estimated: u64,
        cap: u64,
    },

    #[error("{provider} does not support attaching files of type {media_type}")]
    AttachmentUnsupported {
        provider: String,
        media_type: String,
    },

    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("slide extraction failed: {0}")]
    SlideExtraction(String),

    #[error("cache error: {0}")]
    Cache(String),

    #[error("model not found: {0}")]
    ModelNotFound(String),

    #[error("no candidate model in preset {preset} produced output: {last_error}")]
    PresetExhausted { preset: String, last_error: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("http error: {0}")]
    Http(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// True for errors the refresh-free ranker and extractor strategies
    /// should retry against rather than treat as terminal.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::RateLimited { .. } | Error::Timeout(_))
    }

    /// Whether this error kind aborts the whole run, or is merely attached
    /// as a diagnostic and the caller proceeds to the next strategy.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Error::Extraction(_) | Error::SlideExtraction(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
