//! Upstream content provider.
//!
//! The provider is unreliable about base paths, auth headers and parameter
//! names, so every request is an exhaustive search over those variants. Each
//! call returns the attempts it made alongside the value instead of
//! accumulating them in shared state.

use async_trait::async_trait;
use reqwest::header::{HeaderName, HeaderValue, AUTHORIZATION};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::config::UpstreamConfig;
use crate::error::{Error, Result};

const DEFAULT_BASE: &str = "https://api.twitterapi.io";

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ProbeAttempt {
    pub url: String,
    pub header_style: &'static str,
    /// HTTP status, 0 when the request never completed.
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_sample: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Diagnostics {
    pub attempts: Vec<ProbeAttempt>,
}

impl Diagnostics {
    pub fn extend(&mut self, other: Diagnostics) {
        self.attempts.extend(other.attempts);
    }

    pub fn is_empty(&self) -> bool {
        self.attempts.is_empty()
    }
}

/// A value together with the request attempts that produced it.
#[derive(Debug, Clone)]
pub struct Probe<T> {
    pub value: T,
    pub diagnostics: Diagnostics,
}

impl<T> Probe<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            diagnostics: Diagnostics::default(),
        }
    }
}

#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Raw profile record for `handle`.
    async fn fetch_profile(&self, handle: &str) -> Result<Probe<Value>>;

    /// Raw timeline response with the account's latest posts.
    async fn fetch_posts(&self, user_id: &str, handle: &str) -> Result<Probe<Value>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HeaderStyle {
    XApiKey,
    Bearer,
    ApiKey,
}

impl HeaderStyle {
    fn from_config(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "x-api-key" => Some(HeaderStyle::XApiKey),
            "bearer" => Some(HeaderStyle::Bearer),
            "apikey" => Some(HeaderStyle::ApiKey),
            _ => None,
        }
    }

    fn label(self) -> &'static str {
        match self {
            HeaderStyle::XApiKey => "x-api-key",
            HeaderStyle::Bearer => "bearer",
            HeaderStyle::ApiKey => "apikey",
        }
    }

    fn header(self, key: &str) -> Result<(HeaderName, HeaderValue)> {
        let (name, value) = match self {
            HeaderStyle::XApiKey => (HeaderName::from_static("x-api-key"), key.to_string()),
            HeaderStyle::Bearer => (AUTHORIZATION, format!("Bearer {}", key)),
            HeaderStyle::ApiKey => (HeaderName::from_static("apikey"), key.to_string()),
        };
        let value = HeaderValue::from_str(&value)
            .map_err(|err| Error::Upstream(format!("invalid api key header: {}", err)))?;
        Ok((name, value))
    }
}

/// Configured style first, then every known style, without repeats.
fn header_attempts(configured: &str) -> Vec<HeaderStyle> {
    let mut styles = Vec::new();
    if let Some(style) = HeaderStyle::from_config(configured) {
        styles.push(style);
    }
    for style in [
        HeaderStyle::XApiKey,
        HeaderStyle::Bearer,
        HeaderStyle::ApiKey,
    ] {
        if !styles.contains(&style) {
            styles.push(style);
        }
    }
    styles
}

/// The configured base, its `/v1` counterpart, then the provider defaults.
pub fn base_candidates(configured: &str) -> Vec<String> {
    let base = configured.trim().trim_end_matches('/').to_string();
    let mut bases: Vec<String> = Vec::new();
    let mut push = |candidate: String| {
        if !candidate.is_empty() && !bases.contains(&candidate) {
            bases.push(candidate);
        }
    };

    if !base.is_empty() {
        let toggled = match base.strip_suffix("/v1") {
            Some(unversioned) => unversioned.to_string(),
            None => format!("{}/v1", base),
        };
        push(base);
        push(toggled);
    }
    push(DEFAULT_BASE.to_string());
    push(format!("{}/v1", DEFAULT_BASE));
    bases
}

#[derive(Clone)]
pub struct HttpContentSource {
    client: reqwest::Client,
    config: UpstreamConfig,
}

impl HttpContentSource {
    pub fn new(config: UpstreamConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|err| Error::Upstream(format!("failed to build http client: {}", err)))?;
        Ok(Self { client, config })
    }

    fn api_key(&self) -> Result<&str> {
        self.config
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| Error::Upstream("missing TWITTER_API_KEY".to_string()))
    }

    /// Tries every base × header × path × query combination in order and
    /// returns the first successful JSON body.
    async fn probe(
        &self,
        operation: &'static str,
        paths: &[String],
        queries: &[Vec<(&'static str, String)>],
    ) -> Result<Probe<Value>> {
        let key = self.api_key()?;
        let mut diagnostics = Diagnostics::default();
        let mut failures = Vec::new();

        for base in base_candidates(&self.config.base_url) {
            for style in header_attempts(&self.config.auth_style) {
                let (header_name, header_value) = style.header(key)?;
                for path in paths {
                    for query in queries {
                        let url = build_url(&base, path, query);
                        let response = self
                            .client
                            .get(&url)
                            .header(header_name.clone(), header_value.clone())
                            .send()
                            .await;

                        match response {
                            Ok(response) => {
                                let status = response.status();
                                let body = match response.text().await {
                                    Ok(body) => body,
                                    Err(err) => {
                                        diagnostics.attempts.push(ProbeAttempt {
                                            url: url.clone(),
                                            header_style: style.label(),
                                            status: status.as_u16(),
                                            body_sample: None,
                                            error: Some(format!("body read failed: {}", err)),
                                        });
                                        debug!(operation, url = %url, error = %err, "upstream body unreadable");
                                        failures.push(format!("{} {}: body read failed: {}", status.as_u16(), url, err));
                                        continue;
                                    }
                                };
                                diagnostics.attempts.push(ProbeAttempt {
                                    url: url.clone(),
                                    header_style: style.label(),
                                    status: status.as_u16(),
                                    body_sample: Some(sample(&body, self.config.body_sample_len)),
                                    error: None,
                                });
                                if status.is_success() {
                                    match parse_body(&body) {
                                        Ok(value) => return Ok(Probe { value, diagnostics }),
                                        Err(err) => {
                                            debug!(operation, url = %url, error = %err, "upstream body unreadable");
                                            failures.push(format!("{} {}: {}", status.as_u16(), url, err));
                                            continue;
                                        }
                                    }
                                }
                                debug!(operation, url = %url, status = status.as_u16(), "upstream attempt rejected");
                                failures.push(format!("{} {}", status.as_u16(), url));
                            }
                            Err(err) => {
                                diagnostics.attempts.push(ProbeAttempt {
                                    url: url.clone(),
                                    header_style: style.label(),
                                    status: 0,
                                    body_sample: None,
                                    error: Some(err.to_string()),
                                });
                                debug!(operation, url = %url, error = %err, "upstream attempt failed");
                                failures.push(format!("err {}: {}", url, err));
                            }
                        }
                    }
                }
            }
        }

        Err(Error::UpstreamExhausted {
            operation,
            attempts: failures,
        })
    }
}

#[async_trait]
impl ContentSource for HttpContentSource {
    async fn fetch_profile(&self, handle: &str) -> Result<Probe<Value>> {
        let paths = vec![self.config.profile_path.clone()];
        let queries: Vec<Vec<(&'static str, String)>> = ["userName", "username", "screen_name", "handle"]
            .into_iter()
            .map(|name| vec![(name, handle.to_string())])
            .collect();
        self.probe("profile lookup", &paths, &queries).await
    }

    async fn fetch_posts(&self, user_id: &str, handle: &str) -> Result<Probe<Value>> {
        let paths = vec![self.config.tweets_path.clone()];
        let mut queries = Vec::new();
        if !user_id.is_empty() {
            queries.push(vec![
                ("userId", user_id.to_string()),
                ("includeReplies", "false".to_string()),
            ]);
        }
        if !handle.is_empty() {
            queries.push(vec![
                ("userName", handle.to_string()),
                ("includeReplies", "false".to_string()),
            ]);
        }
        self.probe("timeline fetch", &paths, &queries).await
    }
}

fn build_url(base: &str, path: &str, query: &[(&str, String)]) -> String {
    let path = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    };
    let encoded: Vec<String> = query
        .iter()
        .map(|(key, value)| {
            format!(
                "{}={}",
                urlencoding::encode(key),
                urlencoding::encode(value)
            )
        })
        .collect();
    if encoded.is_empty() {
        format!("{}{}", base, path)
    } else {
        format!("{}{}?{}", base, path, encoded.join("&"))
    }
}

fn parse_body(body: &str) -> Result<Value> {
    if body.trim().is_empty() {
        return Ok(Value::Object(Default::default()));
    }
    serde_json::from_str(body)
        .map_err(|err| Error::Upstream(format!("response parse failed: {}", err)))
}

fn sample(body: &str, limit: usize) -> String {
    body.chars().take(limit).collect()
}
