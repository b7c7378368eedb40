use crate::error::Result;
use deadpool_postgres::Pool;

/// The result of a like toggle.
pub struct ToggleResult {
    /// Whether the post is liked by the user after the toggle.
    pub liked: bool,
    /// The post's like count after the toggle.
    pub like_count: i64,
}

/// Flips the like state of `(post_id, user_id)` and keeps the post
/// owner's notification in step, all in one transaction.
///
/// The insert races through `ON CONFLICT DO NOTHING` on the unique
/// `(post_id, user_id)` constraint: of two concurrent duplicate requests
/// exactly one inserts and the other observes "already liked" and
/// removes, so the row can never be double-counted.
pub async fn toggle(
    pool: &Pool,
    post_id: i64,
    user_id: &str,
    owner_id: &str,
) -> Result<ToggleResult> {
    let mut client = pool.get().await?;
    let tx = client.transaction().await?;

    let inserted = tx
        .execute(
            r#"
            INSERT INTO likes (post_id, user_id)
            VALUES ($1, $2)
            ON CONFLICT (post_id, user_id) DO NOTHING
            "#,
            &[&post_id, &user_id],
        )
        .await?;

    let liked = inserted == 1;

    if liked {
        if owner_id != user_id {
            tx.execute(
                r#"
                INSERT INTO notifications (user_id, actor_id, post_id, kind)
                VALUES ($1, $2, $3, 'like')
                "#,
                &[&owner_id, &user_id, &post_id],
            )
            .await?;
        }
    } else {
        tx.execute(
            "DELETE FROM likes WHERE post_id = $1 AND user_id = $2",
            &[&post_id, &user_id],
        )
        .await?;
        tx.execute(
            "DELETE FROM notifications WHERE post_id = $1 AND actor_id = $2 AND kind = 'like'",
            &[&post_id, &user_id],
        )
        .await?;
    }

    let row = tx
        .query_one(
            "SELECT COUNT(*) AS like_count FROM likes WHERE post_id = $1",
            &[&post_id],
        )
        .await?;
    let like_count: i64 = row.try_get("like_count")?;

    tx.commit().await?;
    Ok(ToggleResult { liked, like_count })
}
