use chrono::{DateTime, Utc};
use serde::Serialize;

/// A comment on a post.
#[derive(Clone, Debug, Serialize)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub user_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// A comment joined with its author, as returned by the per-post listing.
#[derive(Clone, Debug, Serialize)]
pub struct CommentWithAuthor {
    pub id: i64,
    pub post_id: i64,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub user_id: String,
    pub user_name: String,
    pub profile_picture: Option<String>,
}
