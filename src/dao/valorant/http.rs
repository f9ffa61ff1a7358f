use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::{Client, RequestBuilder, Response, StatusCode, header::AUTHORIZATION};
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::config::{FetchConfig, ProviderConfig};
use crate::dao::models::Region;
use crate::dao::valorant::{
    MatchSource,
    error::{FetchError, FetchResult},
    models::{AccountEnvelope, AccountProfile, MatchListEnvelope, MatchRecord},
    retry::{self, Attempt, RetryKind, RetryPolicy},
};

/// Client for the community match-data provider.
///
/// Unauthenticated callers share a ~30 req/min budget; the optional API
/// key raises it. All endpoint fetches go through the bounded retry loop
/// in [`retry`].
#[derive(Clone)]
pub struct HttpMatchSource {
    client: Client,
    base_url: Arc<str>,
    api_key: Option<Arc<str>>,
    policy: RetryPolicy,
    competitive_only: bool,
}

impl HttpMatchSource {
    /// Build the client from provider and fetch-policy configuration.
    pub fn new(provider: &ProviderConfig, fetch: &FetchConfig) -> FetchResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|source| FetchError::Transport { source })?;

        Ok(Self {
            client,
            base_url: Arc::from(provider.base_url.trim_end_matches('/')),
            api_key: provider.api_key.as_deref().map(Arc::from),
            policy: RetryPolicy {
                max_attempts: fetch.max_attempts,
                backoff_base: fetch.backoff_base,
                backoff_cap: fetch.backoff_cap,
            },
            competitive_only: fetch.competitive_only,
        })
    }

    fn request(&self, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let builder = self.client.get(url);
        match &self.api_key {
            Some(key) => builder.header(AUTHORIZATION, key.as_ref()),
            None => builder,
        }
    }

    async fn get_json<T>(&self, path: String) -> FetchResult<T>
    where
        T: DeserializeOwned,
    {
        retry::run(&self.policy, |_| {
            let this = self.clone();
            let path = path.clone();
            async move {
                let response = match this.request(&path).send().await {
                    Ok(response) => response,
                    Err(source) => {
                        return Attempt::Retry {
                            kind: RetryKind::Transport(source),
                            hint: None,
                        };
                    }
                };

                match response.status() {
                    status if status.is_success() => match response.json::<T>().await {
                        Ok(value) => Attempt::Done(value),
                        Err(source) => Attempt::Fatal(FetchError::Decode { source }),
                    },
                    StatusCode::NOT_FOUND => Attempt::Fatal(FetchError::NotFound),
                    StatusCode::TOO_MANY_REQUESTS => Attempt::Retry {
                        kind: RetryKind::RateLimited,
                        hint: retry_after(&response),
                    },
                    status if status.is_server_error() => Attempt::Retry {
                        kind: RetryKind::Status(status),
                        hint: None,
                    },
                    status => Attempt::Fatal(FetchError::Status { status }),
                }
            }
        })
        .await
    }

    async fn fetch_history(
        &self,
        region: Region,
        name: &str,
        tag: &str,
    ) -> FetchResult<Vec<MatchRecord>> {
        let path = format!("/valorant/v3/matches/{region}/{name}/{tag}");
        let envelope = self.get_json::<MatchListEnvelope>(path).await?;
        Ok(envelope.data.into_iter().map(Into::into).collect())
    }
}

/// Parse a whole-seconds `Retry-After` hint.
fn retry_after(response: &Response) -> Option<Duration> {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

impl MatchSource for HttpMatchSource {
    fn account(&self, name: &str, tag: &str) -> BoxFuture<'static, FetchResult<AccountProfile>> {
        let this = self.clone();
        let path = format!("/valorant/v1/account/{name}/{tag}");
        Box::pin(async move {
            let envelope = this.get_json::<AccountEnvelope>(path).await?;
            Ok(envelope.data)
        })
    }

    fn latest_match(
        &self,
        region: Region,
        name: &str,
        tag: &str,
    ) -> BoxFuture<'static, FetchResult<MatchRecord>> {
        let this = self.clone();
        let name = name.to_owned();
        let tag = tag.to_owned();
        Box::pin(async move {
            let mut history = this.fetch_history(region, &name, &tag).await?;
            if history.is_empty() {
                return Err(FetchError::NotFound);
            }
            let newest = history.remove(0);
            if this.competitive_only && !newest.is_competitive() {
                return Err(FetchError::ModeExcluded { mode: newest.mode });
            }
            Ok(newest)
        })
    }

    fn match_history(
        &self,
        region: Region,
        name: &str,
        tag: &str,
    ) -> BoxFuture<'static, FetchResult<Vec<MatchRecord>>> {
        let this = self.clone();
        let name = name.to_owned();
        let tag = tag.to_owned();
        Box::pin(async move { this.fetch_history(region, &name, &tag).await })
    }
}
