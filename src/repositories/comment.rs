use crate::{
    error::Result,
    models::comment::{Comment, CommentWithAuthor},
};
use deadpool_postgres::Pool;

/// Creates a comment and, when the commenter is not the post owner,
/// the matching notification. Both rows commit together.
pub async fn insert_comment(
    pool: &Pool,
    post_id: i64,
    user_id: &str,
    owner_id: &str,
    content: &str,
) -> Result<Comment> {
    let mut client = pool.get().await?;
    let tx = client.transaction().await?;

    let row = tx
        .query_one(
            r#"
            INSERT INTO comments (post_id, user_id, content)
            VALUES ($1, $2, $3)
            RETURNING id, post_id, user_id, content, created_at
            "#,
            &[&post_id, &user_id, &content],
        )
        .await?;

    if owner_id != user_id {
        tx.execute(
            r#"
            INSERT INTO notifications (user_id, actor_id, post_id, kind)
            VALUES ($1, $2, $3, 'comment')
            "#,
            &[&owner_id, &user_id, &post_id],
        )
        .await?;
    }

    let comment = Comment {
        id: row.try_get("id")?,
        post_id: row.try_get("post_id")?,
        user_id: row.try_get("user_id")?,
        content: row.try_get("content")?,
        created_at: row.try_get("created_at")?,
    };

    tx.commit().await?;
    Ok(comment)
}

/// Lists the comments of a post, oldest first, joined with their author.
pub async fn list_for_post(pool: &Pool, post_id: i64) -> Result<Vec<CommentWithAuthor>> {
    let client = pool.get().await?;
    let rows = client
        .query(
            r#"
            SELECT c.id, c.post_id, c.content, c.created_at,
                   u.id AS user_id, u.name AS user_name, u.profile_picture
            FROM comments c
            JOIN users u ON c.user_id = u.id
            WHERE c.post_id = $1
            ORDER BY c.created_at ASC
            "#,
            &[&post_id],
        )
        .await?;

    rows.iter()
        .map(|row| {
            Ok(CommentWithAuthor {
                id: row.try_get("id")?,
                post_id: row.try_get("post_id")?,
                content: row.try_get("content")?,
                created_at: row.try_get("created_at")?,
                user_id: row.try_get("user_id")?,
                user_name: row.try_get("user_name")?,
                profile_picture: row.try_get("profile_picture")?,
            })
        })
        .collect()
}
