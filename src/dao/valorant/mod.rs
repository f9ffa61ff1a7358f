//! Match-data provider access: domain models, error taxonomy, and the
//! retrying HTTP client.

pub mod error;
pub mod http;
pub mod models;
mod retry;

use futures::future::BoxFuture;

use crate::dao::models::Region;

pub use error::{FetchClass, FetchError, FetchResult};
pub use http::HttpMatchSource;
pub use models::{AccountProfile, MatchRecord, PlayerLine, TeamScore, TeamSide};
pub use retry::RetryPolicy;

/// Source of authoritative match data, object-safe so the resolver can be
/// exercised against scripted data in tests.
pub trait MatchSource: Send + Sync {
    /// Look up an account, verifying it exists on the provider side.
    fn account(&self, name: &str, tag: &str) -> BoxFuture<'static, FetchResult<AccountProfile>>;

    /// Fetch the account's newest match, applying the mode policy.
    fn latest_match(
        &self,
        region: Region,
        name: &str,
        tag: &str,
    ) -> BoxFuture<'static, FetchResult<MatchRecord>>;

    /// Fetch the account's recent match history, unfiltered.
    fn match_history(
        &self,
        region: Region,
        name: &str,
        tag: &str,
    ) -> BoxFuture<'static, FetchResult<Vec<MatchRecord>>>;
}
