use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use uuid::Uuid;

use engagement_metrics::aggregate::{summarize_rows, top_posts};
use engagement_metrics::model::{
    Account, AccountRecord, Post, PostAnalysis, PostRecord, ViralityScore,
};
use engagement_metrics::{
    analyze_cohort, Aggregator, CompareOptions, CompareStatus, Counters, Error, FileStore,
    MetricsStore, Provisioner,
};

fn account_record(handle: &str) -> AccountRecord {
    AccountRecord {
        external_id: format!("ext-{}", handle),
        handle: handle.to_string(),
        display_name: None,
        image_url: None,
        bio: None,
        followers: 0,
        following: 0,
        post_count: 0,
        verified: false,
        created_at: None,
        last_synced: None,
    }
}

fn post_record(account_id: Uuid, index: usize, counters: Counters) -> PostRecord {
    let base = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    PostRecord {
        account_id,
        external_id: format!("{}-{}", account_id, index),
        text: format!("post {}", index),
        created_at: base + Duration::hours(index as i64),
        views: counters.views,
        likes: counters.likes,
        retweets: counters.retweets,
        replies: counters.replies,
        quotes: 0,
        url: None,
        is_reply: false,
        is_retweet: false,
        language: None,
    }
}

/// Stores an account with the given posts and scores them as one cohort.
async fn seed(store: &FileStore, handle: &str, counters: &[Counters]) -> Account {
    let account = store.upsert_account(account_record(handle)).await.unwrap();
    let records = counters
        .iter()
        .enumerate()
        .map(|(index, counters)| post_record(account.id, index, *counters))
        .collect();
    let posts = store.upsert_posts(records).await.unwrap();

    let metrics = analyze_cohort(&posts.iter().map(Post::counters).collect::<Vec<_>>());
    let analyzed_at = Utc::now();
    let analysis = posts
        .iter()
        .zip(&metrics)
        .map(|(post, metric)| PostAnalysis::from_metrics(post.id, metric, analyzed_at))
        .collect();
    let scores = posts
        .iter()
        .zip(&metrics)
        .map(|(post, metric)| ViralityScore::from_metrics(post.id, account.id, metric))
        .collect();
    store.upsert_analysis(analysis).await.unwrap();
    store.upsert_scores(scores).await.unwrap();
    account
}

fn options(autofill: bool) -> CompareOptions {
    CompareOptions {
        posts: 100,
        autofill,
    }
}

#[tokio::test]
async fn account_rates_average_per_post() {
    let store = Arc::new(FileStore::in_memory());
    seed(
        &store,
        "alice",
        &[Counters::new(100, 20, 0, 0), Counters::new(1_000, 0, 0, 0)],
    )
    .await;

    let aggregator = Aggregator::new(store.clone());
    let entries = aggregator
        .compare(&["alice".to_string()], options(false))
        .await;
    let summary = entries[0].summary.as_ref().unwrap();

    // 20% and 0% average to 10%; summed counters would give 1.82%.
    assert!((summary.rates.engagement_rate - 10.0).abs() < 1e-6);
    assert!((summary.rates.like_rate - 10.0).abs() < 1e-6);
    assert_eq!(summary.totals.views, 1_100);
    assert_eq!(summary.totals.likes, 20);
    assert_eq!(summary.totals.posts_analyzed, 2);
    assert!((summary.score_avg - 1.0).abs() < 1e-6);
}

#[tokio::test]
async fn entries_follow_input_order() {
    let store = Arc::new(FileStore::in_memory());
    seed(&store, "bob", &[Counters::new(100, 1, 1, 1)]).await;
    seed(&store, "alice", &[Counters::new(100, 5, 0, 0)]).await;

    let aggregator = Aggregator::new(store.clone());
    let handles = vec!["alice".to_string(), "nobody".to_string(), "bob".to_string()];
    let entries = aggregator.compare(&handles, options(false)).await;

    let order: Vec<(&str, CompareStatus)> = entries
        .iter()
        .map(|entry| (entry.username.as_str(), entry.status))
        .collect();
    assert_eq!(
        order,
        vec![
            ("alice", CompareStatus::Ok),
            ("nobody", CompareStatus::Missing),
            ("bob", CompareStatus::Ok),
        ]
    );
    assert!(entries[1].summary.is_none());
    assert!(entries[1].profile_id.is_none());
}

#[tokio::test]
async fn handle_lookup_ignores_case() {
    let store = Arc::new(FileStore::in_memory());
    let account = seed(&store, "Alice", &[Counters::new(100, 5, 0, 0)]).await;

    let aggregator = Aggregator::new(store.clone());
    let entry = aggregator.summarize_handle("alice", 10).await.unwrap();
    assert_eq!(entry.profile_id, Some(account.id));
    assert_eq!(entry.username, "Alice");

    let missing = aggregator.summarize_handle("carol", 10).await;
    assert!(matches!(missing, Err(Error::AccountNotFound(_))));
}

#[tokio::test]
async fn account_without_posts_summarizes_to_zero() {
    let store = Arc::new(FileStore::in_memory());
    store.upsert_account(account_record("quiet")).await.unwrap();

    let aggregator = Aggregator::new(store.clone());
    let entries = aggregator
        .compare(&["quiet".to_string()], options(false))
        .await;
    let summary = entries[0].summary.as_ref().unwrap();

    assert_eq!(entries[0].status, CompareStatus::Ok);
    assert_eq!(summary.totals.posts_analyzed, 0);
    assert_eq!(summary.rates.engagement_rate, 0.0);
    assert_eq!(summary.score_avg, 0.0);
    assert!(summary.top.is_empty());
}

#[tokio::test]
async fn post_limit_bounds_the_summary() {
    let store = Arc::new(FileStore::in_memory());
    let counters: Vec<Counters> = (0..12).map(|i| Counters::new(100, i, 0, 0)).collect();
    seed(&store, "busy", &counters).await;

    let aggregator = Aggregator::new(store.clone());
    let entries = aggregator
        .compare(
            &["busy".to_string()],
            CompareOptions {
                posts: 10,
                autofill: false,
            },
        )
        .await;
    let summary = entries[0].summary.as_ref().unwrap();

    assert_eq!(summary.totals.posts_analyzed, 10);
    // the two oldest posts (0 and 1 likes) fall outside the window
    assert_eq!(summary.totals.likes, (2..12).sum::<u64>());
}

fn stored_post(index: usize) -> Post {
    let base = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    Post {
        id: Uuid::new_v4(),
        account_id: Uuid::nil(),
        external_id: index.to_string(),
        text: format!("post {}", index),
        created_at: base - Duration::hours(index as i64),
        views: 100,
        likes: 0,
        retweets: 0,
        replies: 0,
        quotes: 0,
        url: Some(format!("https://x.com/alice/status/{}", index)),
        is_reply: false,
        is_retweet: false,
        language: None,
    }
}

fn score_for(post: &Post, normalized_score: f64) -> ViralityScore {
    ViralityScore {
        post_id: post.id,
        account_id: post.account_id,
        views: post.views,
        likes: 0,
        retweets: 0,
        replies: 0,
        comment_rate: 0.0,
        retweet_rate: 0.0,
        like_rate: 0.0,
        raw_score: 0.0,
        normalized_score,
    }
}

#[test]
fn top_posts_break_ties_by_position() {
    let posts: Vec<Post> = (0..5).map(stored_post).collect();
    let scores: Vec<ViralityScore> = posts
        .iter()
        .zip([1.0, 2.0, 2.0, 0.5, 2.0])
        .map(|(post, score)| score_for(post, score))
        .collect();

    let top = top_posts(&posts, &scores, 3);
    let ids: Vec<Uuid> = top.iter().map(|post| post.post_id).collect();
    assert_eq!(ids, vec![posts[1].id, posts[2].id, posts[4].id]);
    assert!(top.iter().all(|post| (post.score - 2.0).abs() < 1e-6));
}

#[test]
fn unscored_posts_rank_last() {
    let posts: Vec<Post> = (0..3).map(stored_post).collect();
    let scores = vec![score_for(&posts[2], 0.7)];

    let summary = summarize_rows(&posts, &[], &scores);
    assert_eq!(summary.top[0].post_id, posts[2].id);
    assert_eq!(summary.top[1].score, 0.0);
    assert!((summary.score_avg - 0.7).abs() < 1e-6);
    assert_eq!(summary.totals.posts_analyzed, 0);
}

struct ScriptedProvisioner {
    store: Arc<FileStore>,
    outcome: Outcome,
    calls: AtomicUsize,
}

enum Outcome {
    Fail,
    SucceedWithoutData,
    Insert,
}

#[async_trait]
impl Provisioner for ScriptedProvisioner {
    async fn provision(&self, handle: &str) -> engagement_metrics::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.outcome {
            Outcome::Fail => Err(Error::Upstream("quota exceeded".to_string())),
            Outcome::SucceedWithoutData => Ok(()),
            Outcome::Insert => {
                seed(&self.store, handle, &[Counters::new(50, 5, 0, 0)]).await;
                Ok(())
            }
        }
    }
}

fn provisioner(store: &Arc<FileStore>, outcome: Outcome) -> Arc<ScriptedProvisioner> {
    Arc::new(ScriptedProvisioner {
        store: store.clone(),
        outcome,
        calls: AtomicUsize::new(0),
    })
}

#[tokio::test]
async fn failed_provisioning_becomes_error_entry() {
    let store = Arc::new(FileStore::in_memory());
    seed(&store, "alice", &[Counters::new(100, 5, 0, 0)]).await;
    let scripted = provisioner(&store, Outcome::Fail);
    let aggregator = Aggregator::new(store.clone()).with_provisioner(scripted.clone());

    let handles = vec!["newbie".to_string(), "alice".to_string()];
    let entries = aggregator.compare(&handles, options(true)).await;

    assert_eq!(entries[0].status, CompareStatus::Error);
    let message = entries[0].error.as_deref().unwrap();
    assert!(message.starts_with("auto-provisioning failed"));
    assert!(message.contains("quota exceeded"));
    assert_eq!(entries[1].status, CompareStatus::Ok);
    assert_eq!(scripted.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn provisioning_is_attempted_once() {
    let store = Arc::new(FileStore::in_memory());
    let scripted = provisioner(&store, Outcome::SucceedWithoutData);
    let aggregator = Aggregator::new(store.clone()).with_provisioner(scripted.clone());

    let entries = aggregator
        .compare(&["newbie".to_string()], options(true))
        .await;

    assert_eq!(entries[0].status, CompareStatus::Missing);
    assert_eq!(scripted.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn provisioned_account_is_summarized() {
    let store = Arc::new(FileStore::in_memory());
    let scripted = provisioner(&store, Outcome::Insert);
    let aggregator = Aggregator::new(store.clone()).with_provisioner(scripted.clone());

    let entries = aggregator
        .compare(&["newbie".to_string()], options(true))
        .await;
    assert_eq!(entries[0].status, CompareStatus::Ok);
    assert!((entries[0].summary.as_ref().unwrap().rates.like_rate - 10.0).abs() < 1e-6);

    let without_autofill = aggregator
        .compare(&["other".to_string()], options(false))
        .await;
    assert_eq!(without_autofill[0].status, CompareStatus::Missing);
    assert_eq!(scripted.calls.load(Ordering::SeqCst), 1);
}
