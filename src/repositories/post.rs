use crate::{
    error::Result,
    models::post::{Post, PostWithAuthor},
};
use deadpool_postgres::Pool;
use tokio_postgres::Row;

fn row_to_post(row: &Row) -> Result<Post> {
    Ok(Post {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        content: row.try_get("content")?,
        media_url: row.try_get("media_url")?,
        created_at: row.try_get("created_at")?,
    })
}

/// Creates a new post.
pub async fn insert_post(
    pool: &Pool,
    user_id: &str,
    content: Option<&str>,
    media_url: Option<&str>,
) -> Result<Post> {
    let client = pool.get().await?;
    let row = client
        .query_one(
            r#"
            INSERT INTO posts (user_id, content, media_url)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, content, media_url, created_at
            "#,
            &[&user_id, &content, &media_url],
        )
        .await?;
    row_to_post(&row)
}

/// Lists posts newest first, joined with their author and counters.
pub async fn list_posts(pool: &Pool, limit: i64, offset: i64) -> Result<Vec<PostWithAuthor>> {
    let client = pool.get().await?;
    let rows = client
        .query(
            r#"
            SELECT p.id, p.content, p.media_url, p.created_at,
                   u.id AS user_id, u.name AS user_name, u.profile_picture,
                   (SELECT COUNT(*) FROM likes l WHERE l.post_id = p.id) AS like_count,
                   (SELECT COUNT(*) FROM comments c WHERE c.post_id = p.id) AS comment_count
            FROM posts p
            JOIN users u ON p.user_id = u.id
            ORDER BY p.created_at DESC
            LIMIT $1 OFFSET $2
            "#,
            &[&limit, &offset],
        )
        .await?;

    rows.iter()
        .map(|row| {
            Ok(PostWithAuthor {
                id: row.try_get("id")?,
                content: row.try_get("content")?,
                media_url: row.try_get("media_url")?,
                created_at: row.try_get("created_at")?,
                user_id: row.try_get("user_id")?,
                user_name: row.try_get("user_name")?,
                profile_picture: row.try_get("profile_picture")?,
                like_count: row.try_get("like_count")?,
                comment_count: row.try_get("comment_count")?,
            })
        })
        .collect()
}

/// Returns the owner of a post, or `None` if the post does not exist.
pub async fn post_owner(pool: &Pool, post_id: i64) -> Result<Option<String>> {
    let client = pool.get().await?;
    let row = client
        .query_opt("SELECT user_id FROM posts WHERE id = $1", &[&post_id])
        .await?;
    row.map(|r| r.try_get("user_id").map_err(Into::into)).transpose()
}
