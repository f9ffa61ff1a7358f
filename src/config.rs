//! Application-level configuration: correlation windows, fetch policy,
//! provider/gateway endpoints, and storage location.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the service looks for the JSON
/// configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "SQUAD_HERALD_CONFIG_PATH";
/// Environment variable carrying the optional provider API key.
const PROVIDER_KEY_ENV: &str = "SQUAD_HERALD_PROVIDER_KEY";
/// Environment variable carrying the optional gateway bot token.
const GATEWAY_TOKEN_ENV: &str = "SQUAD_HERALD_GATEWAY_TOKEN";

/// Immutable runtime configuration shared across the application.
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    /// Debounce and settle timings.
    pub windows: WindowsConfig,
    /// Provider retry policy and mode filter.
    pub fetch: FetchConfig,
    /// Match-data provider endpoint.
    pub provider: ProviderConfig,
    /// Delivery gateway endpoint.
    pub gateway: GatewayConfig,
    /// On-disk registry location.
    pub storage: StorageConfig,
}

/// Timings of the correlation pipeline.
#[derive(Debug, Clone)]
pub struct WindowsConfig {
    /// How long a group waits for more members after each arrival.
    pub group_wait: Duration,
    /// Hard cap on a group's total wait, however often it refills.
    pub max_group_wait: Duration,
    /// Delay before the first provider request of a resolution cycle.
    pub api_settle: Duration,
    /// Delay before the single refetch of transiently failed members.
    pub refetch_delay: Duration,
}

impl Default for WindowsConfig {
    fn default() -> Self {
        Self {
            group_wait: Duration::from_secs(30),
            max_group_wait: Duration::from_secs(120),
            api_settle: Duration::from_secs(60),
            refetch_delay: Duration::from_secs(15),
        }
    }
}

/// Bounds for provider requests.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Total requests allowed per logical fetch, first try included.
    pub max_attempts: u32,
    /// Backoff before the second attempt; doubles per retry.
    pub backoff_base: Duration,
    /// Upper bound on the computed backoff.
    pub backoff_cap: Duration,
    /// Announce competitive matches only.
    pub competitive_only: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            backoff_base: Duration::from_millis(500),
            backoff_cap: Duration::from_secs(8),
            competitive_only: true,
        }
    }
}

/// Match-data provider endpoint settings.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Base URL of the provider API.
    pub base_url: String,
    /// Optional API key raising the rate limit.
    pub api_key: Option<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.henrikdev.xyz".into(),
            api_key: None,
        }
    }
}

/// Delivery gateway endpoint settings.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Base URL of the message gateway.
    pub base_url: String,
    /// Optional bot token sent with every message.
    pub token: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: "https://discord.com/api/v10".into(),
            token: None,
        }
    }
}

/// Registry persistence settings.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Directory the registry JSON documents live in.
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
        }
    }
}

impl AppConfig {
    /// Load the configuration from disk, falling back to built-in
    /// defaults, then apply secret overrides from the environment.
    pub fn load() -> Self {
        let path = resolve_config_path();
        let config = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    info!(path = %path.display(), "loaded configuration");
                    raw.into()
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        };

        config.with_env_secrets()
    }

    fn with_env_secrets(mut self) -> Self {
        if let Some(key) = env::var(PROVIDER_KEY_ENV).ok().filter(|key| !key.is_empty()) {
            self.provider.api_key = Some(key);
        }
        if let Some(token) = env::var(GATEWAY_TOKEN_ENV)
            .ok()
            .filter(|token| !token.is_empty())
        {
            self.gateway.token = Some(token);
        }
        self
    }
}

/// JSON representation of the configuration file. Every field is
/// optional; anything absent keeps its default.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawConfig {
    windows: RawWindows,
    fetch: RawFetch,
    provider: RawProvider,
    gateway: RawGateway,
    storage: RawStorage,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawWindows {
    group_wait_secs: Option<u64>,
    max_group_wait_secs: Option<u64>,
    api_settle_secs: Option<u64>,
    refetch_delay_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawFetch {
    max_attempts: Option<u32>,
    backoff_base_ms: Option<u64>,
    backoff_cap_ms: Option<u64>,
    competitive_only: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawProvider {
    base_url: Option<String>,
    api_key: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawGateway {
    base_url: Option<String>,
    token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawStorage {
    data_dir: Option<PathBuf>,
}

impl From<RawConfig> for AppConfig {
    fn from(raw: RawConfig) -> Self {
        let defaults = AppConfig::default();
        Self {
            windows: WindowsConfig {
                group_wait: secs_or(raw.windows.group_wait_secs, defaults.windows.group_wait),
                max_group_wait: secs_or(
                    raw.windows.max_group_wait_secs,
                    defaults.windows.max_group_wait,
                ),
                api_settle: secs_or(raw.windows.api_settle_secs, defaults.windows.api_settle),
                refetch_delay: secs_or(
                    raw.windows.refetch_delay_secs,
                    defaults.windows.refetch_delay,
                ),
            },
            fetch: FetchConfig {
                max_attempts: raw.fetch.max_attempts.unwrap_or(defaults.fetch.max_attempts),
                backoff_base: millis_or(raw.fetch.backoff_base_ms, defaults.fetch.backoff_base),
                backoff_cap: millis_or(raw.fetch.backoff_cap_ms, defaults.fetch.backoff_cap),
                competitive_only: raw
                    .fetch
                    .competitive_only
                    .unwrap_or(defaults.fetch.competitive_only),
            },
            provider: ProviderConfig {
                base_url: raw.provider.base_url.unwrap_or(defaults.provider.base_url),
                api_key: raw.provider.api_key,
            },
            gateway: GatewayConfig {
                base_url: raw.gateway.base_url.unwrap_or(defaults.gateway.base_url),
                token: raw.gateway.token,
            },
            storage: StorageConfig {
                data_dir: raw.storage.data_dir.unwrap_or(defaults.storage.data_dir),
            },
        }
    }
}

fn secs_or(value: Option<u64>, fallback: Duration) -> Duration {
    value.map(Duration::from_secs).unwrap_or(fallback)
}

fn millis_or(value: Option<u64>, fallback: Duration) -> Duration {
    value.map(Duration::from_millis).unwrap_or(fallback)
}

fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_timings() {
        let config = AppConfig::default();
        assert_eq!(config.windows.group_wait, Duration::from_secs(30));
        assert_eq!(config.windows.api_settle, Duration::from_secs(60));
        assert_eq!(config.fetch.max_attempts, 4);
        assert!(config.fetch.competitive_only);
    }

    #[test]
    fn partial_file_overrides_only_named_fields() {
        let raw: RawConfig = serde_json::from_str(
            r#"{
                "windows": {"group_wait_secs": 10},
                "fetch": {"competitive_only": false},
                "provider": {"api_key": "secret"}
            }"#,
        )
        .unwrap();
        let config: AppConfig = raw.into();

        assert_eq!(config.windows.group_wait, Duration::from_secs(10));
        assert_eq!(config.windows.api_settle, Duration::from_secs(60));
        assert!(!config.fetch.competitive_only);
        assert_eq!(config.provider.api_key.as_deref(), Some("secret"));
        assert_eq!(config.gateway.base_url, "https://discord.com/api/v10");
    }

    #[test]
    fn empty_file_yields_defaults() {
        let raw: RawConfig = serde_json::from_str("{}").unwrap();
        let config: AppConfig = raw.into();
        assert_eq!(config.windows.max_group_wait, Duration::from_secs(120));
        assert_eq!(config.storage.data_dir, PathBuf::from("data"));
    }
}
