use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Failure to produce a resolved guide. Propagated to the caller.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("no configuration for {country_code}/{visa_type}")]
    NotFound {
        country_code: String,
        visa_type: String,
    },

    #[error("invalid content identifier: '{0}'")]
    InvalidIdentifier(String),

    #[error("failed to read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl ResolveError {
    /// Whether the caller should render a "content not found" state.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ResolveError::NotFound { .. } | ResolveError::InvalidIdentifier(_)
        )
    }
}

/// Shared cache tier failure. Never reaches a `localize` caller.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("shared cache request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("shared cache returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("shared cache response could not be decoded: {0}")]
    Decode(String),

    #[error("shared cache did not answer within {0:?}")]
    Timeout(Duration),
}

/// Translation provider failure.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("translation request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("translation API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("translation response could not be decoded: {0}")]
    Decode(String),

    #[error("provider returned {actual} translations for {expected} inputs")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("provider did not answer within {0:?}")]
    Timeout(Duration),

    #[error("no translation provider configured")]
    Disabled,
}

impl ProviderError {
    /// 429, 5xx, network, decode and timeout failures are worth another attempt.
    /// Other 4xx responses are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::Api { status, .. } => *status == 429 || *status >= 500,
            ProviderError::LengthMismatch { .. } | ProviderError::Disabled => false,
            ProviderError::Request(_) | ProviderError::Decode(_) | ProviderError::Timeout(_) => {
                true
            }
        }
    }
}

/// Internal localization failure. `Localizer::localize` maps every variant
/// to "return the original document".
#[derive(Debug, Error)]
pub enum LocalizationError {
    #[error("document could not be converted to JSON: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("localized JSON no longer matches the document shape: {0}")]
    Deserialize(#[source] serde_json::Error),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}
