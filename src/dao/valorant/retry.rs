use std::future::Future;
use std::time::Duration;

use rand::Rng;
use reqwest::StatusCode;
use tokio::time::sleep;

use super::error::{FetchError, FetchResult};

/// Bounds for the provider retry loop.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total requests allowed for one logical fetch, first try included.
    pub max_attempts: u32,
    /// Backoff before the second attempt; doubles each retry.
    pub backoff_base: Duration,
    /// Upper bound on the computed backoff.
    pub backoff_cap: Duration,
}

/// Outcome of a single request attempt.
pub(crate) enum Attempt<T> {
    /// The fetch succeeded.
    Done(T),
    /// Terminal failure; do not retry.
    Fatal(FetchError),
    /// Transient failure; retry if budget remains. `hint` overrides the
    /// backoff (Retry-After).
    Retry {
        kind: RetryKind,
        hint: Option<Duration>,
    },
}

/// What kind of transient failure an attempt hit, for the terminal error.
pub(crate) enum RetryKind {
    RateLimited,
    Status(StatusCode),
    Transport(reqwest::Error),
}

impl RetryKind {
    fn into_error(self, attempts: u32) -> FetchError {
        match self {
            RetryKind::RateLimited => FetchError::RateLimited { attempts },
            RetryKind::Status(status) => FetchError::Status { status },
            RetryKind::Transport(source) => FetchError::Transport { source },
        }
    }
}

/// Drive `attempt` until it succeeds, fails terminally, or the attempt
/// budget runs out. Sleeps between transient failures with exponential
/// backoff plus jitter, or the provider's hint when one was given.
pub(crate) async fn run<T, F, Fut>(policy: &RetryPolicy, mut attempt: F) -> FetchResult<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Attempt<T>>,
{
    let budget = policy.max_attempts.max(1);
    let mut backoff = policy.backoff_base;
    let mut tries = 0;

    loop {
        tries += 1;
        match attempt(tries).await {
            Attempt::Done(value) => return Ok(value),
            Attempt::Fatal(error) => return Err(error),
            Attempt::Retry { kind, hint } => {
                if tries >= budget {
                    return Err(kind.into_error(tries));
                }
                sleep(hint.unwrap_or_else(|| jittered(backoff))).await;
                backoff = (backoff * 2).min(policy.backoff_cap);
            }
        }
    }
}

/// Backoff plus up to 50% random extra, spreading concurrent retries.
fn jittered(backoff: Duration) -> Duration {
    let half = (backoff.as_millis() as u64) / 2;
    backoff + Duration::from_millis(rand::rng().random_range(0..=half))
}
