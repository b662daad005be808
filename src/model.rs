use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::metrics::{Counters, PostMetrics};

/// A tracked account. One record per `external_id`; `handle` is matched
/// case-insensitively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub external_id: String,
    pub handle: String,
    pub display_name: Option<String>,
    pub image_url: Option<String>,
    pub bio: Option<String>,
    pub followers: u64,
    pub following: u64,
    pub post_count: u64,
    pub verified: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub last_synced: Option<DateTime<Utc>>,
}

/// Account fields as written by a synchronization run.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountRecord {
    pub external_id: String,
    pub handle: String,
    pub display_name: Option<String>,
    pub image_url: Option<String>,
    pub bio: Option<String>,
    pub followers: u64,
    pub following: u64,
    pub post_count: u64,
    pub verified: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub last_synced: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub account_id: Uuid,
    pub external_id: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub views: u64,
    pub likes: u64,
    pub retweets: u64,
    pub replies: u64,
    pub quotes: u64,
    pub url: Option<String>,
    pub is_reply: bool,
    pub is_retweet: bool,
    pub language: Option<String>,
}

impl Post {
    pub fn counters(&self) -> Counters {
        Counters::new(self.views, self.likes, self.retweets, self.replies)
    }
}

/// Post fields as written by a synchronization run, keyed by `external_id`.
#[derive(Debug, Clone, PartialEq)]
pub struct PostRecord {
    pub account_id: Uuid,
    pub external_id: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub views: u64,
    pub likes: u64,
    pub retweets: u64,
    pub replies: u64,
    pub quotes: u64,
    pub url: Option<String>,
    pub is_reply: bool,
    pub is_retweet: bool,
    pub language: Option<String>,
}

/// Derived rates for one post, overwritten on every synchronization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostAnalysis {
    pub post_id: Uuid,
    pub views: u64,
    pub likes: u64,
    pub retweets: u64,
    pub replies: u64,
    pub like_rate: f64,
    pub retweet_rate: f64,
    pub reply_rate: f64,
    pub engagement_rate: f64,
    pub total_comments: u64,
    pub positive_comments: u64,
    pub negative_comments: u64,
    pub neutral_comments: u64,
    pub negative_reasons: BTreeMap<String, u64>,
    pub analyzed_at: DateTime<Utc>,
}

impl PostAnalysis {
    /// Sentiment is not classified; every reply counts as neutral.
    pub fn from_metrics(post_id: Uuid, metrics: &PostMetrics, analyzed_at: DateTime<Utc>) -> Self {
        let counters = metrics.counters;
        Self {
            post_id,
            views: counters.views,
            likes: counters.likes,
            retweets: counters.retweets,
            replies: counters.replies,
            like_rate: metrics.rates.like_rate,
            retweet_rate: metrics.rates.retweet_rate,
            reply_rate: metrics.rates.reply_rate,
            engagement_rate: metrics.rates.engagement_rate,
            total_comments: counters.replies,
            positive_comments: 0,
            negative_comments: 0,
            neutral_comments: counters.replies,
            negative_reasons: BTreeMap::new(),
            analyzed_at,
        }
    }
}

/// Raw and cohort-normalized score for one post. `normalized_score` is only
/// comparable with scores from the same account and the same run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViralityScore {
    pub post_id: Uuid,
    pub account_id: Uuid,
    pub views: u64,
    pub likes: u64,
    pub retweets: u64,
    pub replies: u64,
    pub comment_rate: f64,
    pub retweet_rate: f64,
    pub like_rate: f64,
    pub raw_score: f64,
    pub normalized_score: f64,
}

impl ViralityScore {
    pub fn from_metrics(post_id: Uuid, account_id: Uuid, metrics: &PostMetrics) -> Self {
        let counters = metrics.counters;
        Self {
            post_id,
            account_id,
            views: counters.views,
            likes: counters.likes,
            retweets: counters.retweets,
            replies: counters.replies,
            comment_rate: metrics.rates.reply_rate,
            retweet_rate: metrics.rates.retweet_rate,
            like_rate: metrics.rates.like_rate,
            raw_score: metrics.raw_score,
            normalized_score: metrics.normalized_score,
        }
    }
}

/// Topical label attached to an account. Managed outside this crate; kept so
/// stored documents round-trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: Uuid,
    pub account_id: Uuid,
    pub name: String,
    pub position_description: String,
    pub confidence: Option<f64>,
    #[serde(default)]
    pub evidence_post_ids: Vec<String>,
    #[serde(default)]
    pub user_modified: bool,
}
