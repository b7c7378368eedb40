use crate::error::{AppError, Result};
use crate::models::pending::{PendingRegistration, VerifyOutcome};
use crate::services::registration::RegistrationStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use deadpool_postgres::Pool;
use tokio_postgres::Row;

/// The Postgres-backed registration store.
///
/// Pending registrations live as rows rather than in-process state, so
/// they survive restarts, expiry is queryable, and the unique constraint
/// on `email` arbitrates concurrent registers.
pub struct PgRegistrationStore {
    pool: Pool,
}

impl PgRegistrationStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

fn row_to_pending(row: &Row) -> Result<PendingRegistration> {
    Ok(PendingRegistration {
        candidate_id: row.try_get("candidate_id")?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        code: row.try_get::<_, i32>("code")? as u32,
        expires_at: row.try_get("expires_at")?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl RegistrationStore for PgRegistrationStore {
    async fn email_registered(&self, email: &str) -> Result<bool> {
        let client = self.pool.get().await?;
        let row = client
            .query_one(
                "SELECT EXISTS(SELECT 1 FROM users WHERE email = $1) AS taken",
                &[&email],
            )
            .await?;
        Ok(row.try_get("taken")?)
    }

    async fn insert_pending(&self, pending: &PendingRegistration) -> Result<bool> {
        let client = self.pool.get().await?;
        let inserted = client
            .execute(
                r#"
                INSERT INTO pending_registrations
                    (candidate_id, name, email, password_hash, code, expires_at, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                ON CONFLICT (email) DO NOTHING
                "#,
                &[
                    &pending.candidate_id,
                    &pending.name,
                    &pending.email,
                    &pending.password_hash,
                    &(pending.code as i32),
                    &pending.expires_at,
                    &pending.created_at,
                ],
            )
            .await?;
        Ok(inserted == 1)
    }

    async fn remove_pending(&self, email: &str) -> Result<()> {
        let client = self.pool.get().await?;
        client
            .execute("DELETE FROM pending_registrations WHERE email = $1", &[&email])
            .await?;
        Ok(())
    }

    async fn verify_and_promote(
        &self,
        email: &str,
        submitted: &str,
        now: DateTime<Utc>,
    ) -> Result<VerifyOutcome> {
        let mut client = self.pool.get().await?;
        let tx = client.transaction().await?;

        // Row lock so two concurrent verifications cannot both promote.
        let row = tx
            .query_opt(
                r#"
                SELECT candidate_id, name, email, password_hash, code, expires_at, created_at
                FROM pending_registrations
                WHERE email = $1
                FOR UPDATE
                "#,
                &[&email],
            )
            .await?
            .ok_or_else(|| {
                AppError::NotFound("No pending registration for this email".to_string())
            })?;

        let pending = row_to_pending(&row)?;
        let outcome = pending.check(submitted, now);

        if outcome != VerifyOutcome::Verified {
            return Ok(outcome);
        }

        // Delete and insert commit or fail together; a crash in between
        // cannot lose the registration.
        tx.execute("DELETE FROM pending_registrations WHERE email = $1", &[&email])
            .await?;

        let inserted = tx
            .execute(
                r#"
                INSERT INTO users (id, name, email, password_hash, is_verified)
                VALUES ($1, $2, $3, $4, TRUE)
                ON CONFLICT (email) DO NOTHING
                "#,
                &[
                    &pending.candidate_id,
                    &pending.name,
                    &pending.email,
                    &pending.password_hash,
                ],
            )
            .await?;

        if inserted == 0 {
            // A verified account appeared underneath us; drop the stale
            // pending row rather than promote a duplicate.
            tx.commit().await?;
            return Err(AppError::Conflict(
                "An account with this email already exists".to_string(),
            ));
        }

        tx.commit().await?;
        Ok(VerifyOutcome::Verified)
    }

    async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let client = self.pool.get().await?;
        let removed = client
            .execute(
                "DELETE FROM pending_registrations WHERE expires_at < $1",
                &[&now],
            )
            .await?;
        Ok(removed)
    }
}
