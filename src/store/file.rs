use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::MetricsStore;
use crate::error::{Error, Result};
use crate::model::{
    Account, AccountRecord, Category, Post, PostAnalysis, PostRecord, ViralityScore,
};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoreState {
    #[serde(default)]
    accounts: Vec<Account>,
    #[serde(default)]
    posts: Vec<Post>,
    #[serde(default)]
    analysis: HashMap<Uuid, PostAnalysis>,
    #[serde(default)]
    scores: HashMap<Uuid, ViralityScore>,
    #[serde(default)]
    categories: Vec<Category>,
}

/// Store backed by in-memory tables, optionally persisted as one JSON
/// document after every write.
///
/// Writes are applied to a copy of the tables. The copy replaces the live
/// state only once it has been persisted, so a failed write leaves both
/// memory and disk unchanged.
pub struct FileStore {
    path: Option<PathBuf>,
    state: RwLock<StoreState>,
}

impl FileStore {
    pub fn in_memory() -> Self {
        Self {
            path: None,
            state: RwLock::new(StoreState::default()),
        }
    }

    pub async fn load(path: PathBuf) -> Result<Self> {
        let state = if path.exists() {
            let data = tokio::fs::read_to_string(&path)
                .await
                .map_err(|err| Error::Persistence(format!("failed to read store: {}", err)))?;
            if data.trim().is_empty() {
                StoreState::default()
            } else {
                serde_json::from_str(&data)
                    .map_err(|err| Error::Persistence(format!("failed to parse store: {}", err)))?
            }
        } else {
            StoreState::default()
        };

        Ok(Self {
            path: Some(path),
            state: RwLock::new(state),
        })
    }

    async fn commit(&self, live: &mut StoreState, next: StoreState) -> Result<()> {
        self.persist(&next).await?;
        *live = next;
        Ok(())
    }

    async fn persist(&self, state: &StoreState) -> Result<()> {
        let Some(path) = self.path.as_ref() else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            ensure_dir(parent).await?;
        }
        let payload = serde_json::to_string_pretty(state)
            .map_err(|err| Error::Persistence(format!("failed to serialize store: {}", err)))?;
        let tmp_path = path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, payload)
            .await
            .map_err(|err| Error::Persistence(format!("failed to write store: {}", err)))?;
        tokio::fs::rename(&tmp_path, path)
            .await
            .map_err(|err| Error::Persistence(format!("failed to finalize store: {}", err)))?;
        Ok(())
    }
}

#[async_trait]
impl MetricsStore for FileStore {
    async fn find_account_by_handle(&self, handle: &str) -> Result<Option<Account>> {
        let guard = self.state.read().await;
        Ok(guard
            .accounts
            .iter()
            .find(|account| account.handle.eq_ignore_ascii_case(handle))
            .cloned())
    }

    async fn list_posts(&self, account_id: Uuid, limit: usize) -> Result<Vec<Post>> {
        let guard = self.state.read().await;
        let mut posts: Vec<Post> = guard
            .posts
            .iter()
            .filter(|post| post.account_id == account_id)
            .cloned()
            .collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        posts.truncate(limit);
        Ok(posts)
    }

    async fn get_analysis(&self, post_ids: &[Uuid]) -> Result<Vec<PostAnalysis>> {
        let guard = self.state.read().await;
        Ok(post_ids
            .iter()
            .filter_map(|id| guard.analysis.get(id).cloned())
            .collect())
    }

    async fn get_scores(&self, post_ids: &[Uuid]) -> Result<Vec<ViralityScore>> {
        let guard = self.state.read().await;
        Ok(post_ids
            .iter()
            .filter_map(|id| guard.scores.get(id).cloned())
            .collect())
    }

    async fn upsert_account(&self, record: AccountRecord) -> Result<Account> {
        let mut guard = self.state.write().await;
        let mut next = guard.clone();
        let existing = next
            .accounts
            .iter_mut()
            .find(|account| account.external_id == record.external_id);

        let account = match existing {
            Some(account) => {
                apply_account(account, record);
                account.clone()
            }
            None => {
                let mut account = Account {
                    id: Uuid::new_v4(),
                    external_id: record.external_id.clone(),
                    handle: String::new(),
                    display_name: None,
                    image_url: None,
                    bio: None,
                    followers: 0,
                    following: 0,
                    post_count: 0,
                    verified: false,
                    created_at: None,
                    last_synced: None,
                };
                apply_account(&mut account, record);
                next.accounts.push(account.clone());
                account
            }
        };

        self.commit(&mut guard, next).await?;
        Ok(account)
    }

    async fn upsert_posts(&self, records: Vec<PostRecord>) -> Result<Vec<Post>> {
        let mut guard = self.state.write().await;
        let mut next = guard.clone();
        let mut written = Vec::with_capacity(records.len());
        for record in records {
            let position = next
                .posts
                .iter()
                .position(|post| post.external_id == record.external_id);
            let post = match position {
                Some(index) => {
                    let post = post_from_record(next.posts[index].id, record);
                    next.posts[index] = post.clone();
                    post
                }
                None => {
                    let post = post_from_record(Uuid::new_v4(), record);
                    next.posts.push(post.clone());
                    post
                }
            };
            written.push(post);
        }

        self.commit(&mut guard, next).await?;
        Ok(written)
    }

    async fn upsert_analysis(&self, records: Vec<PostAnalysis>) -> Result<()> {
        let mut guard = self.state.write().await;
        ensure_posts_exist(&guard, records.iter().map(|row| row.post_id))?;
        let mut next = guard.clone();
        for record in records {
            next.analysis.insert(record.post_id, record);
        }
        self.commit(&mut guard, next).await
    }

    async fn upsert_scores(&self, records: Vec<ViralityScore>) -> Result<()> {
        let mut guard = self.state.write().await;
        ensure_posts_exist(&guard, records.iter().map(|row| row.post_id))?;
        let mut next = guard.clone();
        for record in records {
            next.scores.insert(record.post_id, record);
        }
        self.commit(&mut guard, next).await
    }
}

fn apply_account(account: &mut Account, record: AccountRecord) {
    account.external_id = record.external_id;
    account.handle = record.handle;
    account.display_name = record.display_name;
    account.image_url = record.image_url;
    account.bio = record.bio;
    account.followers = record.followers;
    account.following = record.following;
    account.post_count = record.post_count;
    account.verified = record.verified;
    account.created_at = record.created_at;
    account.last_synced = record.last_synced.or_else(|| Some(Utc::now()));
}

fn post_from_record(id: Uuid, record: PostRecord) -> Post {
    Post {
        id,
        account_id: record.account_id,
        external_id: record.external_id,
        text: record.text,
        created_at: record.created_at,
        views: record.views,
        likes: record.likes,
        retweets: record.retweets,
        replies: record.replies,
        quotes: record.quotes,
        url: record.url,
        is_reply: record.is_reply,
        is_retweet: record.is_retweet,
        language: record.language,
    }
}

fn ensure_posts_exist(state: &StoreState, ids: impl Iterator<Item = Uuid>) -> Result<()> {
    let known: HashSet<Uuid> = state.posts.iter().map(|post| post.id).collect();
    for id in ids {
        if !known.contains(&id) {
            return Err(Error::Persistence(format!("unknown post id {}", id)));
        }
    }
    Ok(())
}

async fn ensure_dir(path: &Path) -> Result<()> {
    if path.as_os_str().is_empty() || path.exists() {
        return Ok(());
    }
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|err| Error::Persistence(format!("failed to create store dir: {}", err)))
}
