use crate::{
    error::{AppError, Result},
    models::notification::{Notification, NotificationKind},
};
use deadpool_postgres::Pool;

/// Lists a user's notifications newest first, joined with the acting user.
pub async fn list_for_user(pool: &Pool, user_id: &str) -> Result<Vec<Notification>> {
    let client = pool.get().await?;
    let rows = client
        .query(
            r#"
            SELECT n.id, n.kind, n.post_id, n.created_at,
                   u.id AS actor_id, u.name AS actor_name,
                   u.profile_picture AS actor_profile_picture
            FROM notifications n
            JOIN users u ON n.actor_id = u.id
            WHERE n.user_id = $1
            ORDER BY n.created_at DESC
            "#,
            &[&user_id],
        )
        .await?;

    rows.iter()
        .map(|row| {
            let kind: String = row.try_get("kind")?;
            let kind = NotificationKind::from_str(&kind)
                .ok_or_else(|| AppError::Internal(format!("Unknown notification kind: {kind}")))?;
            Ok(Notification {
                id: row.try_get("id")?,
                kind,
                post_id: row.try_get("post_id")?,
                actor_id: row.try_get("actor_id")?,
                actor_name: row.try_get("actor_name")?,
                actor_profile_picture: row.try_get("actor_profile_picture")?,
                created_at: row.try_get("created_at")?,
            })
        })
        .collect()
}
