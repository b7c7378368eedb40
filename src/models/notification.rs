use chrono::{DateTime, Utc};
use serde::Serialize;

/// What a notification is about.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Like,
    Comment,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Like => "like",
            NotificationKind::Comment => "comment",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "like" => Some(NotificationKind::Like),
            "comment" => Some(NotificationKind::Comment),
            _ => None,
        }
    }
}

/// A notification delivered to a post owner, joined with the acting user.
#[derive(Clone, Debug, Serialize)]
pub struct Notification {
    pub id: i64,
    pub kind: NotificationKind,
    pub post_id: i64,
    pub actor_id: String,
    pub actor_name: String,
    pub actor_profile_picture: Option<String>,
    pub created_at: DateTime<Utc>,
}
