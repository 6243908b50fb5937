// Error type for the data-provider layer.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("failed to decode {what}: {source}")]
    Decode {
        what: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to read snapshot {path}: {source}")]
    Snapshot {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

impl ProviderError {
    /// Whether the provider answered "no such resource".
    pub fn is_not_found(&self) -> bool {
        matches!(self, ProviderError::Status { status: 404, .. })
    }
}
