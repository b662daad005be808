use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use super::aliases::{POST, POST_LIST};
use super::{count_field, flag_field, id_field, lookup, string_field};
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalPost {
    pub id: String,
    pub text: Option<String>,
    pub created_at: Option<String>,
    pub views: u64,
    pub likes: u64,
    pub retweets: u64,
    pub replies: u64,
    pub quotes: u64,
    pub is_reply: bool,
    pub is_retweet: bool,
    pub url: Option<String>,
    pub language: Option<String>,
}

/// Posts resolved from one timeline response.
#[derive(Debug, Clone, Default)]
pub struct PostBatch {
    pub posts: Vec<CanonicalPost>,
    /// Entries dropped because no id could be resolved.
    pub skipped: usize,
}

pub fn resolve_post(record: &Value) -> Result<CanonicalPost> {
    let aliases = &POST;
    let roots = aliases.roots;
    let id = id_field(record, roots, aliases.id).ok_or(Error::MissingRequiredField {
        record: "post",
        field: "id",
    })?;

    Ok(CanonicalPost {
        id,
        text: string_field(record, roots, aliases.text),
        created_at: string_field(record, roots, aliases.created_at),
        views: count_field(record, roots, aliases.views),
        likes: count_field(record, roots, aliases.likes),
        retweets: count_field(record, roots, aliases.retweets),
        replies: count_field(record, roots, aliases.replies),
        quotes: count_field(record, roots, aliases.quotes),
        is_reply: flag_field(record, roots, aliases.is_reply).unwrap_or(false),
        is_retweet: flag_field(record, roots, aliases.is_retweet).unwrap_or(false),
        url: string_field(record, roots, aliases.url),
        language: string_field(record, roots, aliases.language),
    })
}

/// Resolves every post in a timeline response.
///
/// Records without an id are skipped and counted; one bad entry never rejects
/// the batch. When a post carries no URL, one is derived from `handle`.
pub fn resolve_post_list(response: &Value, handle: &str) -> PostBatch {
    let mut batch = PostBatch::default();
    for entry in post_entries(response) {
        if !entry.is_object() {
            continue;
        }
        match resolve_post(entry) {
            Ok(mut post) => {
                if post.url.is_none() {
                    post.url = Some(post_url(handle, &post.id));
                }
                batch.posts.push(post);
            }
            Err(err) => {
                warn!(handle = %handle, error = %err, "skipping upstream post");
                batch.skipped += 1;
            }
        }
    }
    batch
}

pub fn post_url(handle: &str, id: &str) -> String {
    format!("https://x.com/{}/status/{}", handle, id)
}

fn post_entries(response: &Value) -> &[Value] {
    if let Some(list) = response.as_array() {
        return list;
    }
    POST_LIST
        .iter()
        .find_map(|path| lookup(response, path).and_then(Value::as_array))
        .map(Vec::as_slice)
        .unwrap_or(&[])
}
