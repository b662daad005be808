//! Ordered alias tables for upstream records.
//!
//! Every canonical field maps to a priority list of dotted key paths. The
//! resolver combines them with the record roots: for each root in order, for
//! each key in order, the first usable value wins.

/// Candidate source paths for one canonical field.
pub type Keys = &'static [&'static str];

pub struct ProfileAliases {
    pub roots: Keys,
    pub external_id: Keys,
    pub handle: Keys,
    pub display_name: Keys,
    pub image_url: Keys,
    pub bio: Keys,
    pub followers: Keys,
    pub following: Keys,
    pub post_count: Keys,
    pub verified: Keys,
    pub created_at: Keys,
}

pub struct PostAliases {
    pub roots: Keys,
    pub id: Keys,
    pub text: Keys,
    pub created_at: Keys,
    pub views: Keys,
    pub likes: Keys,
    pub retweets: Keys,
    pub replies: Keys,
    pub quotes: Keys,
    pub is_reply: Keys,
    pub is_retweet: Keys,
    pub url: Keys,
    pub language: Keys,
}

pub const PROFILE: ProfileAliases = ProfileAliases {
    roots: &[
        "",
        "data",
        "user",
        "result",
        "data.user",
        "data.result",
        "data.user.result",
    ],
    // GraphQL payloads carry an opaque node `id` next to the numeric `rest_id`.
    external_id: &["rest_id", "id_str", "userId", "user_id", "id"],
    handle: &[
        "userName",
        "username",
        "screen_name",
        "screenName",
        "handle",
        "legacy.screen_name",
    ],
    display_name: &["name", "displayName", "display_name", "legacy.name"],
    image_url: &[
        "profilePicture",
        "profile_image_url",
        "profileImageUrl",
        "profile_image_url_https",
        "avatar",
        "legacy.profile_image_url_https",
    ],
    bio: &["description", "bio", "legacy.description"],
    followers: &[
        "followers",
        "followers_count",
        "followersCount",
        "public_metrics.followers_count",
        "publicMetrics.followersCount",
        "legacy.followers_count",
    ],
    following: &[
        "following",
        "following_count",
        "followingCount",
        "friends_count",
        "public_metrics.following_count",
        "publicMetrics.followingCount",
        "legacy.friends_count",
    ],
    post_count: &[
        "statusesCount",
        "statuses_count",
        "tweet_count",
        "tweetCount",
        "public_metrics.tweet_count",
        "publicMetrics.tweetCount",
        "legacy.statuses_count",
    ],
    verified: &[
        "isBlueVerified",
        "is_blue_verified",
        "verified",
        "isVerified",
        "legacy.verified",
    ],
    created_at: &["createdAt", "created_at", "legacy.created_at"],
};

pub const POST: PostAliases = PostAliases {
    roots: &["", "tweet", "data", "result", "legacy", "result.legacy"],
    id: &["id", "id_str", "tweet_id", "tweetId", "rest_id"],
    text: &["text", "full_text", "fullText", "content"],
    created_at: &["createdAt", "created_at"],
    views: &[
        "viewCount",
        "view_count",
        "views",
        "views.count",
        "impression_count",
        "public_metrics.impression_count",
    ],
    likes: &[
        "likeCount",
        "like_count",
        "likes",
        "favorite_count",
        "favoriteCount",
        "public_metrics.like_count",
    ],
    retweets: &[
        "retweetCount",
        "retweet_count",
        "retweets",
        "public_metrics.retweet_count",
    ],
    replies: &[
        "replyCount",
        "reply_count",
        "replies",
        "public_metrics.reply_count",
    ],
    quotes: &[
        "quoteCount",
        "quote_count",
        "quotes",
        "public_metrics.quote_count",
    ],
    is_reply: &["isReply", "is_reply"],
    is_retweet: &["isRetweet", "is_retweet"],
    url: &["url", "twitterUrl", "twitter_url"],
    language: &["lang", "language"],
};

/// Where a list of posts may live inside a timeline response.
pub const POST_LIST: Keys = &[
    "tweets",
    "data.tweets",
    "data",
    "results",
    "data.results",
    "timeline",
];
