use thiserror::Error;

#[derive(Debug, Error)]
pub enum ZureoError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Login was rejected, or a data call was still unauthorized after a
    /// fresh login. Fatal for the run.
    #[error("Zureo authentication failed with HTTP {status}: {body}")]
    Authentication { status: u16, body: String },

    #[error("rate limited by Zureo on {endpoint}")]
    RateLimited { endpoint: String },

    #[error("Zureo rate limit still exceeded at offset {offset} after {attempts} attempts")]
    RateLimitExhausted { offset: u64, attempts: u32 },

    #[error("malformed Zureo response for {context}: {reason}")]
    MalformedResponse { context: String, reason: String },

    #[error("unexpected HTTP status {status} from {context}: {body}")]
    UnexpectedStatus {
        status: u16,
        context: String,
        body: String,
    },

    #[error("pagination limit reached: exceeded {max_pages} pages")]
    PaginationLimit { max_pages: usize },

    #[error("invalid Zureo base URL \"{base_url}\": {reason}")]
    InvalidBaseUrl { base_url: String, reason: String },
}
