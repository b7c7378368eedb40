use chrono::{DateTime, Utc};
use serde::Serialize;

/// A post, optionally carrying uploaded media.
#[derive(Clone, Debug, Serialize)]
pub struct Post {
    pub id: i64,
    pub user_id: String,
    pub content: Option<String>,
    pub media_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A post joined with its author, as returned by the feed listing.
#[derive(Clone, Debug, Serialize)]
pub struct PostWithAuthor {
    pub id: i64,
    pub content: Option<String>,
    pub media_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub user_id: String,
    pub user_name: String,
    pub profile_picture: Option<String>,
    pub like_count: i64,
    pub comment_count: i64,
}
