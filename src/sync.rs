use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::aggregate::Provisioner;
use crate::config::SyncConfig;
use crate::error::{Error, Result};
use crate::handle::extract_handle;
use crate::metrics::analyze_cohort;
use crate::model::{AccountRecord, Post, PostAnalysis, PostRecord, ViralityScore};
use crate::resolver::{resolve_post_list, resolve_profile, CanonicalPost, CanonicalProfile};
use crate::store::{upsert_chunked, MetricsStore};
use crate::upstream::{ContentSource, Diagnostics};

/// Outcome of one synchronization run.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub handle: String,
    pub account_id: Uuid,
    pub posts_fetched: usize,
    pub posts_skipped: usize,
    /// Posts in the scored cohort.
    pub posts_processed: usize,
    #[serde(skip_serializing_if = "Diagnostics::is_empty")]
    pub diagnostics: Diagnostics,
}

#[derive(Clone)]
pub struct Synchronizer {
    store: Arc<dyn MetricsStore>,
    source: Arc<dyn ContentSource>,
    config: SyncConfig,
}

impl Synchronizer {
    pub fn new(
        store: Arc<dyn MetricsStore>,
        source: Arc<dyn ContentSource>,
        config: SyncConfig,
    ) -> Self {
        Self {
            store,
            source,
            config,
        }
    }

    /// Ingests the account behind `handle`, then recomputes analysis and
    /// scores for its most recent cohort. Any failure ends the run; chunks
    /// already written stay written.
    pub async fn sync(&self, handle: &str) -> Result<SyncReport> {
        let requested = extract_handle(handle);
        if requested.is_empty() {
            return Err(Error::InvalidRequest("handle is required".to_string()));
        }
        info!(handle = %requested, "synchronizing account");
        let now = Utc::now();

        let profile_probe = self.source.fetch_profile(&requested).await?;
        let mut diagnostics = profile_probe.diagnostics;
        let profile = resolve_profile(&profile_probe.value)?;
        let account = self
            .store
            .upsert_account(account_record(&profile, &requested, now))
            .await?;

        let posts_probe = self
            .source
            .fetch_posts(&account.external_id, &account.handle)
            .await?;
        diagnostics.extend(posts_probe.diagnostics);
        let batch = resolve_post_list(&posts_probe.value, &account.handle);
        let posts_fetched = batch.posts.len();

        let records: Vec<PostRecord> = batch
            .posts
            .iter()
            .map(|post| post_record(account.id, post, now))
            .collect();
        let store = &self.store;
        upsert_chunked("posts", records, self.config.chunk_size, |chunk| async move {
            store.upsert_posts(chunk).await
        })
        .await?;

        let cohort = self
            .store
            .list_posts(account.id, self.config.cohort_size)
            .await?;
        let posts_processed = self.score_cohort(account.id, &cohort, now).await?;

        info!(
            handle = %account.handle,
            fetched = posts_fetched,
            skipped = batch.skipped,
            processed = posts_processed,
            "account synchronized"
        );

        Ok(SyncReport {
            handle: account.handle,
            account_id: account.id,
            posts_fetched,
            posts_skipped: batch.skipped,
            posts_processed,
            diagnostics,
        })
    }

    async fn score_cohort(
        &self,
        account_id: Uuid,
        cohort: &[Post],
        analyzed_at: DateTime<Utc>,
    ) -> Result<usize> {
        let counters: Vec<_> = cohort.iter().map(Post::counters).collect();
        let metrics = analyze_cohort(&counters);

        let mut analysis = Vec::with_capacity(cohort.len());
        let mut scores = Vec::with_capacity(cohort.len());
        for (post, metric) in cohort.iter().zip(&metrics) {
            analysis.push(PostAnalysis::from_metrics(post.id, metric, analyzed_at));
            scores.push(ViralityScore::from_metrics(post.id, account_id, metric));
        }

        let store = &self.store;
        let chunk_size = self.config.chunk_size;
        upsert_chunked("analysis", analysis, chunk_size, |chunk| async move {
            store.upsert_analysis(chunk).await.map(|()| Vec::<()>::new())
        })
        .await?;
        upsert_chunked("scores", scores, chunk_size, |chunk| async move {
            store.upsert_scores(chunk).await.map(|()| Vec::<()>::new())
        })
        .await?;

        Ok(cohort.len())
    }
}

#[async_trait]
impl Provisioner for Synchronizer {
    async fn provision(&self, handle: &str) -> Result<()> {
        self.sync(handle).await.map(|_| ())
    }
}

fn account_record(profile: &CanonicalProfile, requested: &str, now: DateTime<Utc>) -> AccountRecord {
    let created_at = profile.created_at.as_deref().and_then(|value| {
        let parsed = parse_timestamp(value);
        if parsed.is_none() {
            warn!(value, "unparseable account creation time");
        }
        parsed
    });
    AccountRecord {
        external_id: profile.external_id.clone(),
        handle: profile
            .handle
            .clone()
            .unwrap_or_else(|| requested.to_string()),
        display_name: profile.display_name.clone(),
        image_url: profile.image_url.clone(),
        bio: profile.bio.clone(),
        followers: profile.followers,
        following: profile.following,
        post_count: profile.post_count,
        verified: profile.verified,
        created_at,
        last_synced: Some(now),
    }
}

fn post_record(account_id: Uuid, post: &CanonicalPost, now: DateTime<Utc>) -> PostRecord {
    PostRecord {
        account_id,
        external_id: post.id.clone(),
        text: post.text.clone().unwrap_or_default(),
        created_at: post
            .created_at
            .as_deref()
            .and_then(parse_timestamp)
            .unwrap_or(now),
        views: post.views,
        likes: post.likes,
        retweets: post.retweets,
        replies: post.replies,
        quotes: post.quotes,
        url: post.url.clone(),
        is_reply: post.is_reply,
        is_retweet: post.is_retweet,
        language: post.language.clone(),
    }
}

/// RFC 3339, or the classic `Wed Oct 10 20:19:24 +0000 2018` format.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    DateTime::parse_from_rfc3339(value)
        .or_else(|_| DateTime::parse_from_str(value, "%a %b %d %H:%M:%S %z %Y"))
        .map(|parsed| parsed.with_timezone(&Utc))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_both_timestamp_formats() {
        let expected = Utc.with_ymd_and_hms(2018, 10, 10, 20, 19, 24).unwrap();
        assert_eq!(parse_timestamp("Wed Oct 10 20:19:24 +0000 2018"), Some(expected));
        assert_eq!(parse_timestamp("2018-10-10T20:19:24Z"), Some(expected));
        assert_eq!(parse_timestamp("2018-10-10T22:19:24+02:00"), Some(expected));
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn missing_text_and_date_get_row_defaults() {
        let post = CanonicalPost {
            id: "7".to_string(),
            text: None,
            created_at: Some("not a date".to_string()),
            views: 10,
            likes: 1,
            retweets: 0,
            replies: 0,
            quotes: 0,
            is_reply: false,
            is_retweet: false,
            url: None,
            language: None,
        };
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let record = post_record(Uuid::nil(), &post, now);
        assert_eq!(record.text, "");
        assert_eq!(record.created_at, now);
    }
}
