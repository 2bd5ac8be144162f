use std::time::Duration;
use thiserror::Error;

/// Errors returned by a single provider call
///
/// | Variant | Retry class |
/// |---------|-------------|
/// | `Throttled` | retry, honoring `retry_after` when present |
/// | `Transient` | retry with backoff |
/// | `Deserialize` | retry with backoff (malformed payloads are usually truncated responses) |
/// | `Http` | retry unless the request could not be built |
/// | `Fatal` | never retried |
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("throttled by {url} (retry after {retry_after:?})")]
    Throttled {
        url: String,
        retry_after: Option<Duration>,
    },

    #[error("transient failure from {url}: {message}")]
    Transient { url: String, message: String },

    #[error("unexpected HTTP status {status} from {url}")]
    Fatal { status: u16, url: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ProviderError {
    /// Returns true if retrying the same call could succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Throttled { .. } | Self::Transient { .. } | Self::Deserialize { .. } => true,
            Self::Http(e) => !e.is_builder(),
            Self::Fatal { .. } => false,
        }
    }

    /// The wait the server asked for, if any
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Throttled { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}
