//! Read-only checks of the upstream provider and the running configuration.
//!
//! Nothing here writes to the store. Secrets are only ever reported as
//! presence flags.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

use crate::config::AppConfig;
use crate::error::{Error, Result};
use crate::handle::extract_handle;
use crate::resolver::{resolve_post_list, resolve_profile, CanonicalPost, CanonicalProfile};
use crate::upstream::{ContentSource, Probe, ProbeAttempt};

/// Environment keys whose presence is reported.
pub const ENV_KEYS: &[&str] = &[
    "TWITTER_API_KEY",
    "TWITTER_API_BASE_URL",
    "TWITTER_API_AUTH_STYLE",
    "TWITTER_API_PROFILE_PATH",
    "TWITTER_API_TWEETS_PATH",
    "TWITTER_API_TIMEOUT_MS",
    "METRICS_STORE_PATH",
    "METRICS_CONFIG_PATH",
];

const SAMPLE_POSTS: usize = 2;

/// One upstream call as seen from the outside.
#[derive(Debug, Clone, Serialize)]
pub struct ProbeOutcome {
    pub ok: bool,
    pub attempts: Vec<ProbeAttempt>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProbeOutcome {
    fn from_result(result: Result<Probe<Value>>) -> (Self, Option<Value>) {
        match result {
            Ok(probe) => (
                Self {
                    ok: true,
                    attempts: probe.diagnostics.attempts,
                    failures: Vec::new(),
                    error: None,
                },
                Some(probe.value),
            ),
            Err(Error::UpstreamExhausted { operation, attempts }) => (
                Self {
                    ok: false,
                    attempts: Vec::new(),
                    error: Some(format!("{} failed after {} attempts", operation, attempts.len())),
                    failures: attempts,
                },
                None,
            ),
            Err(err) => (
                Self {
                    ok: false,
                    attempts: Vec::new(),
                    failures: Vec::new(),
                    error: Some(err.to_string()),
                },
                None,
            ),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UpstreamReport {
    pub handle: String,
    pub profile: ProbeOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_profile: Option<CanonicalProfile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_error: Option<String>,
    pub posts: ProbeOutcome,
    pub posts_resolved: usize,
    pub posts_skipped: usize,
    pub sample: Vec<CanonicalPost>,
}

/// Runs the profile and timeline lookups for `handle` and reports every
/// attempt. The timeline is still queried by handle when the profile fails.
pub async fn diagnose_upstream(source: &dyn ContentSource, handle: &str) -> Result<UpstreamReport> {
    let handle = extract_handle(handle);
    if handle.is_empty() {
        return Err(Error::InvalidRequest("username is required".to_string()));
    }

    let (profile, profile_value) = ProbeOutcome::from_result(source.fetch_profile(&handle).await);
    let (resolved_profile, profile_error) = match profile_value.as_ref().map(resolve_profile) {
        Some(Ok(resolved)) => (Some(resolved), None),
        Some(Err(err)) => (None, Some(err.to_string())),
        None => (None, None),
    };
    let user_id = resolved_profile
        .as_ref()
        .map(|profile| profile.external_id.clone())
        .unwrap_or_default();

    let (posts, posts_value) = ProbeOutcome::from_result(source.fetch_posts(&user_id, &handle).await);
    let batch = posts_value
        .map(|value| resolve_post_list(&value, &handle))
        .unwrap_or_default();

    Ok(UpstreamReport {
        handle,
        profile,
        resolved_profile,
        profile_error,
        posts,
        posts_resolved: batch.posts.len(),
        posts_skipped: batch.skipped,
        sample: batch.posts.into_iter().take(SAMPLE_POSTS).collect(),
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct RuntimeInfo {
    pub version: &'static str,
    pub os: &'static str,
    pub arch: &'static str,
}

/// Effective upstream settings; the key itself is never included.
#[derive(Debug, Clone, Serialize)]
pub struct UpstreamSettings {
    pub base_url: String,
    pub api_key_present: bool,
    pub auth_style: String,
    pub profile_path: String,
    pub tweets_path: String,
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct EnvReport {
    pub ok: bool,
    pub runtime: RuntimeInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_path: Option<String>,
    pub config_file_found: bool,
    pub env_present: BTreeMap<&'static str, bool>,
    pub upstream: UpstreamSettings,
    pub store_path: String,
    pub now: DateTime<Utc>,
}

pub fn env_report(config: &AppConfig, config_path: Option<&Path>) -> EnvReport {
    let env_present = ENV_KEYS
        .iter()
        .map(|key| {
            let present = std::env::var(key)
                .map(|value| !value.trim().is_empty())
                .unwrap_or(false);
            (*key, present)
        })
        .collect();
    let upstream = &config.upstream;

    EnvReport {
        ok: true,
        runtime: RuntimeInfo {
            version: env!("CARGO_PKG_VERSION"),
            os: std::env::consts::OS,
            arch: std::env::consts::ARCH,
        },
        config_path: config_path.map(|path| path.display().to_string()),
        config_file_found: config_path.is_some_and(Path::exists),
        env_present,
        upstream: UpstreamSettings {
            base_url: upstream.base_url.clone(),
            api_key_present: upstream
                .api_key
                .as_deref()
                .is_some_and(|key| !key.trim().is_empty()),
            auth_style: upstream.auth_style.clone(),
            profile_path: upstream.profile_path.clone(),
            tweets_path: upstream.tweets_path.clone(),
            timeout_ms: upstream.timeout_ms,
        },
        store_path: config.store.path.display().to_string(),
        now: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_report_never_exposes_the_key() {
        let mut config = AppConfig::default();
        config.upstream.api_key = Some("super-secret-value".to_string());

        let report = env_report(&config, Some(Path::new("does/not/exist.toml")));
        let payload = serde_json::to_string(&report).unwrap();

        assert!(report.upstream.api_key_present);
        assert!(!report.config_file_found);
        assert!(!payload.contains("super-secret-value"));
        assert_eq!(report.env_present.len(), ENV_KEYS.len());
    }

    #[test]
    fn blank_key_is_reported_absent() {
        let mut config = AppConfig::default();
        config.upstream.api_key = Some("  ".to_string());
        assert!(!env_report(&config, None).upstream.api_key_present);
    }
}
