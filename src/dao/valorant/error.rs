//! Error types shared by the match-data provider client.

use reqwest::StatusCode;
use thiserror::Error;

/// Convenient result alias returning [`FetchError`] failures.
pub type FetchResult<T> = Result<T, FetchError>;

/// Failures that can occur while fetching match data.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Account unknown to the provider, or no recent match on record.
    /// Terminal: never retried.
    #[error("account or recent match not found")]
    NotFound,
    /// Provider rate limit still in effect after the full retry budget.
    #[error("provider rate limit exhausted after {attempts} attempts")]
    RateLimited {
        /// Requests issued before giving up.
        attempts: u32,
    },
    /// The request never reached the provider.
    #[error("failed to reach match provider")]
    Transport {
        #[source]
        source: reqwest::Error,
    },
    /// Provider kept answering with a server error.
    #[error("unexpected provider response status {status}")]
    Status {
        /// Final status observed.
        status: StatusCode,
    },
    /// Response body could not be decoded.
    #[error("failed to decode provider response")]
    Decode {
        #[source]
        source: reqwest::Error,
    },
    /// The newest match is of a mode the tracker is configured to skip.
    #[error("match mode `{mode}` is excluded by policy")]
    ModeExcluded {
        /// Mode reported by the provider.
        mode: String,
    },
}

/// Spec-level classification used for control flow; collapses the precise
/// variants into the four outcomes the resolver cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchClass {
    /// Terminal absence; silent set-aside.
    NotFound,
    /// Rate-limit budget exhausted; one more resolver-level retry allowed.
    RateLimited,
    /// Transport or server failure; one more resolver-level retry allowed.
    Unavailable,
    /// Policy filter; silent drop.
    ModeExcluded,
}

impl FetchError {
    /// Classify this error for retry/drop decisions.
    pub fn class(&self) -> FetchClass {
        match self {
            FetchError::NotFound => FetchClass::NotFound,
            FetchError::RateLimited { .. } => FetchClass::RateLimited,
            FetchError::Transport { .. } | FetchError::Status { .. } | FetchError::Decode { .. } => {
                FetchClass::Unavailable
            }
            FetchError::ModeExcluded { .. } => FetchClass::ModeExcluded,
        }
    }
}
