use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::aliases::PROFILE;
use super::{count_field, flag_field, id_field, string_field};
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalProfile {
    pub external_id: String,
    pub handle: Option<String>,
    pub display_name: Option<String>,
    pub image_url: Option<String>,
    pub bio: Option<String>,
    pub followers: u64,
    pub following: u64,
    pub post_count: u64,
    pub verified: bool,
    pub created_at: Option<String>,
}

pub fn resolve_profile(record: &Value) -> Result<CanonicalProfile> {
    let aliases = &PROFILE;
    let roots = aliases.roots;
    let external_id =
        id_field(record, roots, aliases.external_id).ok_or(Error::MissingRequiredField {
            record: "profile",
            field: "externalId",
        })?;

    Ok(CanonicalProfile {
        external_id,
        handle: string_field(record, roots, aliases.handle),
        display_name: string_field(record, roots, aliases.display_name),
        image_url: string_field(record, roots, aliases.image_url),
        bio: string_field(record, roots, aliases.bio),
        followers: count_field(record, roots, aliases.followers),
        following: count_field(record, roots, aliases.following),
        post_count: count_field(record, roots, aliases.post_count),
        verified: flag_field(record, roots, aliases.verified).unwrap_or(false),
        created_at: string_field(record, roots, aliases.created_at),
    })
}
