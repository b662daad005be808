//! Account-level summaries for the comparison feature.
//!
//! Rates are averaged per post rather than recomputed from summed counters,
//! so a single viral post does not dominate an account's figures. Scores
//! feed `score_avg` and the top list only; normalized scores from different
//! accounts belong to different cohorts.

use async_trait::async_trait;
use futures::future::join_all;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::metrics::Rates;
use crate::model::{Account, Post, PostAnalysis, ViralityScore};
use crate::round2;
use crate::store::MetricsStore;

pub const TOP_POSTS: usize = 3;

/// Populates a missing account on demand.
#[async_trait]
pub trait Provisioner: Send + Sync {
    async fn provision(&self, handle: &str) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CompareStatus {
    Ok,
    Missing,
    Error,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Totals {
    pub views: u64,
    pub likes: u64,
    pub retweets: u64,
    pub replies: u64,
    pub posts_analyzed: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopPost {
    pub post_id: Uuid,
    pub url: Option<String>,
    pub text: String,
    pub created_at: String,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountSummary {
    pub totals: Totals,
    pub rates: Rates,
    pub score_avg: f64,
    pub top: Vec<TopPost>,
}

impl AccountSummary {
    pub fn empty() -> Self {
        Self {
            totals: Totals::default(),
            rates: Rates::default(),
            score_avg: 0.0,
            top: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompareEntry {
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_id: Option<Uuid>,
    pub status: CompareStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub summary: Option<AccountSummary>,
}

impl CompareEntry {
    fn ok(account: &Account, summary: AccountSummary) -> Self {
        Self {
            username: account.handle.clone(),
            profile_id: Some(account.id),
            status: CompareStatus::Ok,
            error: None,
            summary: Some(summary),
        }
    }

    fn missing(handle: &str) -> Self {
        Self {
            username: handle.to_string(),
            profile_id: None,
            status: CompareStatus::Missing,
            error: None,
            summary: None,
        }
    }

    fn error(handle: &str, message: String) -> Self {
        Self {
            username: handle.to_string(),
            profile_id: None,
            status: CompareStatus::Error,
            error: Some(message),
            summary: None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CompareOptions {
    /// Most recent posts considered per account.
    pub posts: usize,
    /// Provision missing accounts before giving up on them.
    pub autofill: bool,
}

#[derive(Clone)]
pub struct Aggregator {
    store: Arc<dyn MetricsStore>,
    provisioner: Option<Arc<dyn Provisioner>>,
}

impl Aggregator {
    pub fn new(store: Arc<dyn MetricsStore>) -> Self {
        Self {
            store,
            provisioner: None,
        }
    }

    pub fn with_provisioner(mut self, provisioner: Arc<dyn Provisioner>) -> Self {
        self.provisioner = Some(provisioner);
        self
    }

    /// One entry per handle, in input order. A failing account becomes an
    /// `error` entry and never affects the others.
    pub async fn compare(&self, handles: &[String], options: CompareOptions) -> Vec<CompareEntry> {
        let entries = join_all(
            handles
                .iter()
                .map(|handle| self.compare_one(handle, options)),
        )
        .await;
        info!(accounts = entries.len(), posts = options.posts, "comparison finished");
        entries
    }

    async fn compare_one(&self, handle: &str, options: CompareOptions) -> CompareEntry {
        let account = match self.resolve_account(handle, options.autofill).await {
            Ok(Some(account)) => account,
            Ok(None) => return CompareEntry::missing(handle),
            Err(message) => {
                warn!(handle = %handle, error = %message, "comparison entry failed");
                return CompareEntry::error(handle, message);
            }
        };

        match self.summarize(&account, options.posts).await {
            Ok(summary) => CompareEntry::ok(&account, summary),
            Err(err) => {
                warn!(handle = %handle, error = %err, "comparison entry failed");
                CompareEntry::error(handle, err.to_string())
            }
        }
    }

    /// Looks the account up, provisioning and retrying once when allowed.
    async fn resolve_account(
        &self,
        handle: &str,
        autofill: bool,
    ) -> std::result::Result<Option<Account>, String> {
        let found = self
            .store
            .find_account_by_handle(handle)
            .await
            .map_err(|err| err.to_string())?;
        if found.is_some() || !autofill {
            return Ok(found);
        }
        let Some(provisioner) = self.provisioner.as_ref() else {
            return Ok(None);
        };

        info!(handle = %handle, "provisioning missing account");
        provisioner
            .provision(handle)
            .await
            .map_err(|err| format!("auto-provisioning failed: {}", err))?;
        self.store
            .find_account_by_handle(handle)
            .await
            .map_err(|err| err.to_string())
    }

    /// Single-account summary; a missing account is an error here.
    pub async fn summarize_handle(&self, handle: &str, limit: usize) -> Result<CompareEntry> {
        let account = self
            .store
            .find_account_by_handle(handle)
            .await?
            .ok_or_else(|| Error::AccountNotFound(handle.to_string()))?;
        let summary = self.summarize(&account, limit).await?;
        Ok(CompareEntry::ok(&account, summary))
    }

    pub async fn summarize(&self, account: &Account, limit: usize) -> Result<AccountSummary> {
        let posts = self.store.list_posts(account.id, limit).await?;
        if posts.is_empty() {
            return Ok(AccountSummary::empty());
        }

        let ids: Vec<Uuid> = posts.iter().map(|post| post.id).collect();
        let (analysis, scores) =
            tokio::join!(self.store.get_analysis(&ids), self.store.get_scores(&ids));
        Ok(summarize_rows(&posts, &analysis?, &scores?))
    }
}

/// Folds stored rows into one account summary.
pub fn summarize_rows(
    posts: &[Post],
    analysis: &[PostAnalysis],
    scores: &[ViralityScore],
) -> AccountSummary {
    let mut totals = Totals {
        posts_analyzed: analysis.len(),
        ..Totals::default()
    };
    let mut rate_sums = Rates::default();
    for row in analysis {
        totals.views += row.views;
        totals.likes += row.likes;
        totals.retweets += row.retweets;
        totals.replies += row.replies;
        rate_sums.like_rate += row.like_rate;
        rate_sums.retweet_rate += row.retweet_rate;
        rate_sums.reply_rate += row.reply_rate;
        rate_sums.engagement_rate += row.engagement_rate;
    }

    let divisor = analysis.len().max(1) as f64;
    let rates = Rates {
        like_rate: round2(rate_sums.like_rate / divisor),
        retweet_rate: round2(rate_sums.retweet_rate / divisor),
        reply_rate: round2(rate_sums.reply_rate / divisor),
        engagement_rate: round2(rate_sums.engagement_rate / divisor),
    };

    let score_avg = if scores.is_empty() {
        0.0
    } else {
        round2(scores.iter().map(|row| row.normalized_score).sum::<f64>() / scores.len() as f64)
    };

    AccountSummary {
        totals,
        rates,
        score_avg,
        top: top_posts(posts, scores, TOP_POSTS),
    }
}

/// Highest normalized score first. The sort is stable, so ties keep their
/// input order. Posts without a score row rank as 0.
pub fn top_posts(posts: &[Post], scores: &[ViralityScore], limit: usize) -> Vec<TopPost> {
    let by_post: HashMap<Uuid, f64> = scores
        .iter()
        .map(|row| (row.post_id, row.normalized_score))
        .collect();

    let mut ranked: Vec<TopPost> = posts
        .iter()
        .map(|post| TopPost {
            post_id: post.id,
            url: post.url.clone(),
            text: post.text.clone(),
            created_at: post.created_at.to_rfc3339(),
            score: by_post.get(&post.id).copied().unwrap_or(0.0),
        })
        .collect();
    ranked.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    ranked.truncate(limit);
    ranked
}
