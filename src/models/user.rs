use chrono::{DateTime, Utc};
use serde::Serialize;

/// Represents a verified user in the system.
///
/// Users are created exclusively by a successful OTP verification; the
/// `password_hash` never leaves the server.
#[derive(Clone, Debug)]
pub struct User {
    /// The user-visible identifier. Mutable through the profile editor.
    pub id: String,
    /// The user's display name.
    pub name: String,
    /// The user's email address. Unique and immutable.
    pub email: String,
    /// The user's argon2id password hash.
    pub password_hash: String,
    /// Whether the user completed OTP verification.
    pub is_verified: bool,
    /// URL of the user's profile picture, if set.
    pub profile_picture: Option<String>,
    /// URL of the user's header picture, if set.
    pub header_picture: Option<String>,
    /// The timestamp when the user was created.
    pub created_at: DateTime<Utc>,
    /// The timestamp when the user was last updated.
    pub updated_at: DateTime<Utc>,
}

/// The projection of a user that is safe to return to clients.
#[derive(Clone, Debug, Serialize)]
pub struct PublicUser {
    pub id: String,
    pub name: String,
    pub email: String,
    pub is_verified: bool,
    pub profile_picture: Option<String>,
    pub header_picture: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            is_verified: user.is_verified,
            profile_picture: user.profile_picture,
            header_picture: user.header_picture,
            created_at: user.created_at,
        }
    }
}

/// A sparse profile update. Each field updates only when present, so the
/// SQL stays a fixed parameterized statement instead of a dynamically
/// assembled column list.
#[derive(Debug, Default)]
pub struct ProfileUpdate {
    /// A new user-visible identifier. Changing it is destructive: the
    /// user's posts, comments, likes and notifications are removed first.
    pub new_id: Option<String>,
    pub name: Option<String>,
    pub password_hash: Option<String>,
    pub profile_picture: Option<String>,
    pub header_picture: Option<String>,
}

impl ProfileUpdate {
    /// Returns `true` when no field would change.
    pub fn is_empty(&self) -> bool {
        self.new_id.is_none()
            && self.name.is_none()
            && self.password_hash.is_none()
            && self.profile_picture.is_none()
            && self.header_picture.is_none()
    }
}
