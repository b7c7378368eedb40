use crate::{
    error::{AppError, Result},
    models::user::{ProfileUpdate, PublicUser, User},
};
use deadpool_postgres::Pool;
use tokio_postgres::{error::SqlState, Row};

const USER_COLUMNS: &str =
    "id, name, email, password_hash, is_verified, profile_picture, header_picture, \
     created_at, updated_at";

/// Turns a duplicate-key failure into the conflict the caller expects;
/// anything else stays a database error.
fn conflict_on_duplicate(code: Option<&SqlState>) -> Option<AppError> {
    if code == Some(&SqlState::UNIQUE_VIOLATION) {
        Some(AppError::Conflict(
            "This id is already used by another user".to_string(),
        ))
    } else {
        None
    }
}

/// A helper function to map a `tokio_postgres::Row` to a `User`.
fn row_to_user(row: &Row) -> Result<User> {
    Ok(User {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        is_verified: row.try_get("is_verified")?,
        profile_picture: row.try_get("profile_picture")?,
        header_picture: row.try_get("header_picture")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Finds a user by their email address.
pub async fn find_by_email(pool: &Pool, email: &str) -> Result<Option<User>> {
    let client = pool.get().await?;
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
    let row = client.query_opt(sql.as_str(), &[&email]).await?;
    row.as_ref().map(row_to_user).transpose()
}

/// Lists the public projection of every user, newest first.
pub async fn list_users(pool: &Pool) -> Result<Vec<PublicUser>> {
    let client = pool.get().await?;
    let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC");
    let rows = client.query(sql.as_str(), &[]).await?;
    rows.iter()
        .map(|r| row_to_user(r).map(PublicUser::from))
        .collect()
}

/// Applies a sparse profile update in a single transaction.
///
/// Changing the public identifier is destructive by design: the user's
/// notifications, likes, comments and posts are deleted before the id
/// changes, so no statement can ever reference the retired identifier.
/// Every step commits or rolls back together.
pub async fn update_profile(
    pool: &Pool,
    user_id: &str,
    update: &ProfileUpdate,
) -> Result<User> {
    let mut client = pool.get().await?;
    let tx = client.transaction().await?;

    let mut current_id = user_id.to_string();

    if let Some(new_id) = update.new_id.as_deref().filter(|id| *id != user_id) {
        let taken = tx
            .query_one(
                "SELECT EXISTS(SELECT 1 FROM users WHERE id = $1) AS taken",
                &[&new_id],
            )
            .await?;
        if taken.try_get::<_, bool>("taken")? {
            return Err(AppError::Conflict(
                "This id is already used by another user".to_string(),
            ));
        }

        tx.execute(
            "DELETE FROM notifications WHERE user_id = $1 OR actor_id = $1",
            &[&user_id],
        )
        .await?;
        tx.execute("DELETE FROM likes WHERE user_id = $1", &[&user_id])
            .await?;
        tx.execute("DELETE FROM comments WHERE user_id = $1", &[&user_id])
            .await?;
        tx.execute("DELETE FROM posts WHERE user_id = $1", &[&user_id])
            .await?;

        // The EXISTS probe above is only a fast path; a racing id change
        // can still trip the primary-key constraint here.
        let updated = tx
            .execute("UPDATE users SET id = $1 WHERE id = $2", &[&new_id, &user_id])
            .await
            .map_err(|e| conflict_on_duplicate(e.code()).unwrap_or_else(|| e.into()))?;
        if updated == 0 {
            return Err(AppError::NotFound("User not found".to_string()));
        }

        current_id = new_id.to_string();
    }

    let sql = format!(
        r#"
        UPDATE users
        SET name = COALESCE($1, name),
            password_hash = COALESCE($2, password_hash),
            profile_picture = COALESCE($3, profile_picture),
            header_picture = COALESCE($4, header_picture),
            updated_at = NOW()
        WHERE id = $5
        RETURNING {USER_COLUMNS}
        "#
    );
    let row = tx
        .query_opt(
            sql.as_str(),
            &[
                &update.name,
                &update.password_hash,
                &update.profile_picture,
                &update.header_picture,
                &current_id,
            ],
        )
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let user = row_to_user(&row)?;
    tx.commit().await?;
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_key_degrades_to_conflict_not_a_server_error() {
        assert!(matches!(
            conflict_on_duplicate(Some(&SqlState::UNIQUE_VIOLATION)),
            Some(AppError::Conflict(_))
        ));
        assert!(conflict_on_duplicate(Some(&SqlState::FOREIGN_KEY_VIOLATION)).is_none());
        assert!(conflict_on_duplicate(None).is_none());
    }
}
