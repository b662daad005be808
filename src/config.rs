use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub const MIN_COMPARE_POSTS: usize = 10;
pub const MAX_COMPARE_POSTS: usize = 500;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    pub base_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub auth_style: String,
    pub profile_path: String,
    pub tweets_path: String,
    pub timeout_ms: u64,
    pub body_sample_len: usize,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.twitterapi.io".to_string(),
            api_key: None,
            auth_style: "x-api-key".to_string(),
            profile_path: "/twitter/user/info".to_string(),
            tweets_path: "/twitter/user/last_tweets".to_string(),
            timeout_ms: 15_000,
            body_sample_len: 400,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/metrics.json"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Posts re-read and scored together after ingestion.
    pub cohort_size: usize,
    pub chunk_size: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            cohort_size: 100,
            chunk_size: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompareConfig {
    pub default_posts: usize,
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self { default_posts: 100 }
    }
}

impl CompareConfig {
    /// Requested post count, or the default when absent or zero, clamped to
    /// the allowed range. Negative requests clamp to the minimum.
    pub fn post_limit(&self, requested: Option<i64>) -> usize {
        match requested.filter(|value| *value != 0) {
            Some(value) => value.clamp(MIN_COMPARE_POSTS as i64, MAX_COMPARE_POSTS as i64) as usize,
            None => self.default_posts.clamp(MIN_COMPARE_POSTS, MAX_COMPARE_POSTS),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub upstream: UpstreamConfig,
    pub store: StoreConfig,
    pub sync: SyncConfig,
    pub compare: CompareConfig,
}

impl AppConfig {
    pub fn load(path: Option<PathBuf>) -> Result<(Self, Option<PathBuf>)> {
        let config_path = path.or_else(default_config_path);
        let mut config = if let Some(path) = config_path.as_ref() {
            if path.exists() {
                let contents = std::fs::read_to_string(path)
                    .map_err(|err| Error::Config(format!("failed to read config: {}", err)))?;
                toml::from_str(&contents)
                    .map_err(|err| Error::Config(format!("failed to parse config: {}", err)))?
            } else {
                AppConfig::default()
            }
        } else {
            AppConfig::default()
        };

        config.apply_env_overrides();
        Ok((config, config_path))
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|err| Error::Config(format!("failed to create config dir: {}", err)))?;
        }
        let payload = toml::to_string_pretty(self)
            .map_err(|err| Error::Config(format!("failed to serialize config: {}", err)))?;
        std::fs::write(path, payload)
            .map_err(|err| Error::Config(format!("failed to write config: {}", err)))?;
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Some(value) = env_string("TWITTER_API_BASE_URL") {
            self.upstream.base_url = value;
        }
        if let Some(value) = env_string("TWITTER_API_KEY") {
            self.upstream.api_key = Some(value);
        }
        if let Some(value) = env_string("TWITTER_API_AUTH_STYLE") {
            self.upstream.auth_style = value.to_lowercase();
        }
        if let Some(value) = env_string("TWITTER_API_PROFILE_PATH") {
            self.upstream.profile_path = value;
        }
        if let Some(value) = env_string("TWITTER_API_TWEETS_PATH") {
            self.upstream.tweets_path = value;
        }
        if let Some(value) = env_parse("TWITTER_API_TIMEOUT_MS") {
            self.upstream.timeout_ms = value;
        }
        if let Some(value) = env_parse("DEBUG_TWITTER_BODY_LEN") {
            self.upstream.body_sample_len = value;
        }
        if let Some(value) = env_string("METRICS_STORE_PATH") {
            self.store.path = PathBuf::from(value);
        }
        if let Some(value) = env_parse("SYNC_COHORT_SIZE") {
            self.sync.cohort_size = value;
        }
        if let Some(value) = env_parse("SYNC_CHUNK_SIZE") {
            self.sync.chunk_size = value;
        }
        if let Some(value) = env_parse("COMPARE_DEFAULT_POSTS") {
            self.compare.default_posts = value;
        }
    }
}

fn env_string(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env_string(key).and_then(|value| value.trim().parse::<T>().ok())
}

fn default_config_path() -> Option<PathBuf> {
    env_string("METRICS_CONFIG_PATH")
        .map(PathBuf::from)
        .or_else(|| Some(PathBuf::from("config/metrics.toml")))
}
