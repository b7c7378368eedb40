use crate::error::{AppError, Result};
use crate::models::pending::{generate_otp, PendingRegistration, VerifyOutcome};
use crate::services::email::Mailer;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Persistence seam for the registration state machine.
///
/// The flow is `NoPending -> PendingVerification -> Verified`, with
/// expiry and rejection falling back to `NoPending` after a fresh
/// register. Implementations must arbitrate concurrent writers through
/// their own constraints: `insert_pending` is the only admission point
/// and `verify_and_promote` must be atomic, so a code can never be
/// consumed twice.
#[async_trait]
pub trait RegistrationStore: Send + Sync {
    /// Returns `true` when a verified user already holds `email`.
    async fn email_registered(&self, email: &str) -> Result<bool>;

    /// Admits a pending registration. Returns `false` when one already
    /// exists for the email; concurrent inserts must yield exactly one
    /// winner.
    async fn insert_pending(&self, pending: &PendingRegistration) -> Result<bool>;

    /// Removes a pending registration, e.g. to roll back admission after
    /// a failed email dispatch.
    async fn remove_pending(&self, email: &str) -> Result<()>;

    /// Checks `submitted` against the pending registration for `email`
    /// and, on success, deletes it and inserts the verified user as one
    /// atomic step. Fails with `NotFound` when nothing is pending.
    async fn verify_and_promote(
        &self,
        email: &str,
        submitted: &str,
        now: DateTime<Utc>,
    ) -> Result<VerifyOutcome>;

    /// Deletes pending registrations whose codes have lapsed. Returns
    /// how many were removed.
    async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<u64>;
}

/// Starts a registration: admits the pending entry, then dispatches the
/// code by email. Success is only acknowledged after the send succeeds;
/// a failed dispatch rolls the admission back so the caller can retry.
///
/// The email must be free in both the verified and the pending state.
/// The pending insert runs before the verified-user check so the
/// store's uniqueness constraint, not a check-then-act read, decides
/// races between concurrent registers.
pub async fn register(
    store: &dyn RegistrationStore,
    mailer: &dyn Mailer,
    name: String,
    email: String,
    password_hash: String,
    ttl_minutes: i64,
) -> Result<String> {
    let pending = PendingRegistration::new(
        Uuid::new_v4().to_string(),
        name,
        email.clone(),
        password_hash,
        generate_otp(),
        ttl_minutes,
        Utc::now(),
    );

    if !store.insert_pending(&pending).await? {
        return Err(AppError::Conflict(
            "An account with this email is already awaiting verification".to_string(),
        ));
    }

    if store.email_registered(&email).await? {
        store.remove_pending(&email).await?;
        return Err(AppError::Conflict(
            "An account with this email already exists".to_string(),
        ));
    }

    if let Err(e) = mailer.send_otp(&email, &pending.name, pending.code).await {
        tracing::warn!("OTP dispatch failed for {}, rolling back admission", email);
        store.remove_pending(&email).await?;
        return Err(e);
    }

    tracing::info!("Registration pending for {}", email);
    Ok(email)
}

/// Completes a registration. `NotFound` when nothing is pending for the
/// email; `InvalidOtp` on a wrong or expired code.
pub async fn verify_otp(
    store: &dyn RegistrationStore,
    email: &str,
    submitted: &str,
) -> Result<()> {
    match store.verify_and_promote(email, submitted, Utc::now()).await? {
        VerifyOutcome::Verified => {
            tracing::info!("Email verified: {}", email);
            Ok(())
        }
        VerifyOutcome::CodeMismatch | VerifyOutcome::Expired => Err(AppError::InvalidOtp),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory store mirroring the Postgres implementation's contract.
    #[derive(Default)]
    struct MemoryStore {
        pending: Mutex<HashMap<String, PendingRegistration>>,
        verified: Mutex<HashMap<String, PendingRegistration>>,
    }

    #[async_trait]
    impl RegistrationStore for MemoryStore {
        async fn email_registered(&self, email: &str) -> Result<bool> {
            Ok(self.verified.lock().unwrap().contains_key(email))
        }

        async fn insert_pending(&self, pending: &PendingRegistration) -> Result<bool> {
            let mut map = self.pending.lock().unwrap();
            if map.contains_key(&pending.email) {
                return Ok(false);
            }
            map.insert(pending.email.clone(), pending.clone());
            Ok(true)
        }

        async fn remove_pending(&self, email: &str) -> Result<()> {
            self.pending.lock().unwrap().remove(email);
            Ok(())
        }

        async fn verify_and_promote(
            &self,
            email: &str,
            submitted: &str,
            now: DateTime<Utc>,
        ) -> Result<VerifyOutcome> {
            let mut map = self.pending.lock().unwrap();
            let pending = map
                .get(email)
                .ok_or_else(|| AppError::NotFound("No pending registration".to_string()))?;

            let outcome = pending.check(submitted, now);
            if outcome == VerifyOutcome::Verified {
                let pending = map.remove(email).unwrap();
                self.verified.lock().unwrap().insert(email.to_string(), pending);
            }
            Ok(outcome)
        }

        async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<u64> {
            let mut map = self.pending.lock().unwrap();
            let before = map.len();
            map.retain(|_, p| !p.is_expired(now));
            Ok((before - map.len()) as u64)
        }
    }

    /// Captures dispatched codes instead of sending them.
    #[derive(Default)]
    struct RecordingMailer {
        sent: Mutex<Vec<(String, u32)>>,
    }

    impl RecordingMailer {
        fn last_code(&self) -> u32 {
            self.sent.lock().unwrap().last().expect("no email sent").1
        }
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send_otp(&self, to_email: &str, _to_name: &str, code: u32) -> Result<()> {
            self.sent.lock().unwrap().push((to_email.to_string(), code));
            Ok(())
        }
    }

    /// Always fails, to exercise the dispatch rollback policy.
    struct FailingMailer;

    #[async_trait]
    impl Mailer for FailingMailer {
        async fn send_otp(&self, _: &str, _: &str, _: u32) -> Result<()> {
            Err(AppError::Email("smtp unreachable".to_string()))
        }
    }

    async fn register_ana(store: &MemoryStore, mailer: &RecordingMailer) {
        register(
            store,
            mailer,
            "Ana".to_string(),
            "ana@x.com".to_string(),
            "$argon2id$fake".to_string(),
            10,
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn register_then_verify_yields_a_verified_user_and_no_residue() {
        let store = MemoryStore::default();
        let mailer = RecordingMailer::default();
        register_ana(&store, &mailer).await;

        let code = mailer.last_code().to_string();
        verify_otp(&store, "ana@x.com", &code).await.unwrap();

        assert!(store.email_registered("ana@x.com").await.unwrap());
        assert!(store.pending.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn wrong_code_is_rejected_and_the_registration_survives() {
        let store = MemoryStore::default();
        let mailer = RecordingMailer::default();
        register_ana(&store, &mailer).await;

        let wrong = (mailer.last_code() % 900_000) + 99_999;
        let err = verify_otp(&store, "ana@x.com", &wrong.to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidOtp));

        // The correct code still completes the flow afterwards.
        let code = mailer.last_code().to_string();
        verify_otp(&store, "ana@x.com", &code).await.unwrap();
    }

    #[tokio::test]
    async fn non_numeric_code_is_rejected() {
        let store = MemoryStore::default();
        let mailer = RecordingMailer::default();
        register_ana(&store, &mailer).await;

        let err = verify_otp(&store, "ana@x.com", "not-a-number")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidOtp));
    }

    #[tokio::test]
    async fn verify_without_pending_registration_is_not_found() {
        let store = MemoryStore::default();
        let err = verify_otp(&store, "ghost@x.com", "123456").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn the_code_is_single_use() {
        let store = MemoryStore::default();
        let mailer = RecordingMailer::default();
        register_ana(&store, &mailer).await;

        let code = mailer.last_code().to_string();
        verify_otp(&store, "ana@x.com", &code).await.unwrap();

        let err = verify_otp(&store, "ana@x.com", &code).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn second_register_for_a_pending_email_conflicts() {
        let store = MemoryStore::default();
        let mailer = RecordingMailer::default();
        register_ana(&store, &mailer).await;

        let err = register(
            &store,
            &mailer,
            "Ana Again".to_string(),
            "ana@x.com".to_string(),
            "$argon2id$fake2".to_string(),
            10,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(mailer.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn register_for_an_already_verified_email_conflicts() {
        let store = MemoryStore::default();
        let mailer = RecordingMailer::default();
        register_ana(&store, &mailer).await;
        let code = mailer.last_code().to_string();
        verify_otp(&store, "ana@x.com", &code).await.unwrap();

        let err = register(
            &store,
            &mailer,
            "Impostor".to_string(),
            "ana@x.com".to_string(),
            "$argon2id$fake3".to_string(),
            10,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        // The probe admission was rolled back.
        assert!(store.pending.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_email_dispatch_rolls_back_the_admission() {
        let store = MemoryStore::default();
        let err = register(
            &store,
            &FailingMailer,
            "Ana".to_string(),
            "ana@x.com".to_string(),
            "$argon2id$fake".to_string(),
            10,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Email(_)));
        assert!(store.pending.lock().unwrap().is_empty());

        // A retry starts from a clean slate.
        let mailer = RecordingMailer::default();
        register_ana(&store, &mailer).await;
    }

    #[tokio::test]
    async fn expired_codes_fail_and_get_swept() {
        let store = MemoryStore::default();
        let mailer = RecordingMailer::default();
        register_ana(&store, &mailer).await;

        let late = Utc::now() + chrono::Duration::seconds(601);
        let code = mailer.last_code().to_string();
        let outcome = store
            .verify_and_promote("ana@x.com", &code, late)
            .await
            .unwrap();
        assert_eq!(outcome, VerifyOutcome::Expired);

        assert_eq!(store.sweep_expired(late).await.unwrap(), 1);
        assert!(store.pending.lock().unwrap().is_empty());
    }
}
