//! Storage seam.
//!
//! Writes are upserts: accounts by external id, posts by external id,
//! analysis and scores by post id. Callers chunk large batches with
//! [`upsert_chunked`]; there is no transaction across chunks.

pub mod file;

use async_trait::async_trait;
use std::future::Future;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::model::{Account, AccountRecord, Post, PostAnalysis, PostRecord, ViralityScore};

pub use file::FileStore;

#[async_trait]
pub trait MetricsStore: Send + Sync {
    /// Case-insensitive lookup by handle.
    async fn find_account_by_handle(&self, handle: &str) -> Result<Option<Account>>;

    /// Most recent posts first, by original creation time.
    async fn list_posts(&self, account_id: Uuid, limit: usize) -> Result<Vec<Post>>;

    async fn get_analysis(&self, post_ids: &[Uuid]) -> Result<Vec<PostAnalysis>>;

    async fn get_scores(&self, post_ids: &[Uuid]) -> Result<Vec<ViralityScore>>;

    async fn upsert_account(&self, record: AccountRecord) -> Result<Account>;

    async fn upsert_posts(&self, records: Vec<PostRecord>) -> Result<Vec<Post>>;

    async fn upsert_analysis(&self, records: Vec<PostAnalysis>) -> Result<()>;

    async fn upsert_scores(&self, records: Vec<ViralityScore>) -> Result<()>;
}

/// Writes `records` in chunks of `chunk_size`, in order.
///
/// The first failing chunk stops the loop and its error is returned as
/// [`Error::Persistence`]. Chunks written before it stay written.
pub async fn upsert_chunked<T, R, F, Fut>(
    entity: &str,
    records: Vec<T>,
    chunk_size: usize,
    mut write: F,
) -> Result<Vec<R>>
where
    F: FnMut(Vec<T>) -> Fut,
    Fut: Future<Output = Result<Vec<R>>>,
{
    let chunk_size = chunk_size.max(1);
    let total = records.len();
    let mut written = Vec::with_capacity(total);
    let mut remaining = records.into_iter().peekable();
    let mut offset = 0usize;

    while remaining.peek().is_some() {
        let chunk: Vec<T> = remaining.by_ref().take(chunk_size).collect();
        let len = chunk.len();
        match write(chunk).await {
            Ok(rows) => written.extend(rows),
            Err(err) => {
                let detail = match err {
                    Error::Persistence(message) => message,
                    other => other.to_string(),
                };
                return Err(Error::Persistence(format!(
                    "{} chunk {}..{} of {} failed: {}",
                    entity,
                    offset,
                    offset + len,
                    total,
                    detail
                )));
            }
        }
        offset += len;
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn splits_into_chunks() {
        let calls = AtomicUsize::new(0);
        let written = upsert_chunked("posts", (0..250).collect::<Vec<u32>>(), 100, |chunk| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move { Ok(chunk) }
        })
        .await
        .unwrap();
        assert_eq!(written.len(), 250);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn failing_chunk_aborts_the_rest() {
        let calls = AtomicUsize::new(0);
        let result = upsert_chunked("scores", (0..300).collect::<Vec<u32>>(), 100, |chunk| {
            let call = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if call == 1 {
                    Err(Error::Persistence("payload too large".to_string()))
                } else {
                    Ok(chunk)
                }
            }
        })
        .await;

        let err = result.unwrap_err();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(matches!(&err, Error::Persistence(message) if message.contains("100..200")));
    }

    #[tokio::test]
    async fn empty_batch_writes_nothing() {
        let calls = AtomicUsize::new(0);
        let written: Vec<u32> = upsert_chunked("posts", Vec::<u32>::new(), 100, |chunk| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move { Ok(chunk) }
        })
        .await
        .unwrap();
        assert!(written.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
