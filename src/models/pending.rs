use chrono::{DateTime, Duration, Utc};
use subtle::ConstantTimeEq;

/// The inclusive lower bound for one-time codes.
pub const OTP_MIN: u32 = 100_000;
/// The exclusive upper bound for one-time codes.
pub const OTP_MAX: u32 = 999_999;

/// A registration awaiting OTP confirmation.
///
/// This is the single stateful protocol in the service: a pending
/// registration is created by `register`, survives at most until its
/// expiry, and is consumed exactly once by a successful verification,
/// which promotes it to a verified [`User`](crate::models::user::User)
/// in the same transaction.
#[derive(Clone, Debug)]
pub struct PendingRegistration {
    /// The identifier the user will receive once verified.
    pub candidate_id: String,
    pub name: String,
    /// The email being verified. Unique key of the pending table.
    pub email: String,
    pub password_hash: String,
    /// The 6-digit one-time code, sampled from `[OTP_MIN, OTP_MAX)`.
    pub code: u32,
    /// The instant after which the code stops being accepted.
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// The outcome of checking a submitted code against a pending registration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VerifyOutcome {
    /// The code matched within its lifetime; the registration may be promoted.
    Verified,
    /// The submitted code did not match (or was not numeric).
    CodeMismatch,
    /// The code was correct too late, or checked past its lifetime.
    Expired,
}

impl PendingRegistration {
    /// Builds a fresh pending registration with the given code and TTL.
    pub fn new(
        candidate_id: String,
        name: String,
        email: String,
        password_hash: String,
        code: u32,
        ttl_minutes: i64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            candidate_id,
            name,
            email,
            password_hash,
            code,
            expires_at: now + Duration::minutes(ttl_minutes),
            created_at: now,
        }
    }

    /// Checks a caller-supplied code against this registration.
    ///
    /// Expiry is a strict comparison: a request at exactly `expires_at`
    /// is still accepted. Non-numeric input is a mismatch, never a panic,
    /// and the numeric comparison runs in constant time.
    pub fn check(&self, submitted: &str, now: DateTime<Utc>) -> VerifyOutcome {
        if now > self.expires_at {
            return VerifyOutcome::Expired;
        }

        let Ok(submitted) = submitted.trim().parse::<u32>() else {
            return VerifyOutcome::CodeMismatch;
        };

        if bool::from(submitted.ct_eq(&self.code)) {
            VerifyOutcome::Verified
        } else {
            VerifyOutcome::CodeMismatch
        }
    }

    /// Returns `true` once this registration can no longer be verified.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// Samples a one-time code uniformly from `[OTP_MIN, OTP_MAX)`.
pub fn generate_otp() -> u32 {
    use rand::Rng;
    rand::rngs::OsRng.gen_range(OTP_MIN..OTP_MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending(code: u32, now: DateTime<Utc>) -> PendingRegistration {
        PendingRegistration::new(
            "user-1".into(),
            "Ana".into(),
            "ana@x.com".into(),
            "$argon2id$fake".into(),
            code,
            10,
            now,
        )
    }

    #[test]
    fn correct_code_within_ttl_verifies() {
        let now = Utc::now();
        let p = pending(123_456, now);
        assert_eq!(p.check("123456", now), VerifyOutcome::Verified);
    }

    #[test]
    fn wrong_code_is_a_mismatch() {
        let now = Utc::now();
        let p = pending(123_456, now);
        assert_eq!(p.check("654321", now), VerifyOutcome::CodeMismatch);
    }

    #[test]
    fn non_numeric_input_is_a_mismatch_not_a_crash() {
        let now = Utc::now();
        let p = pending(123_456, now);
        assert_eq!(p.check("abc123", now), VerifyOutcome::CodeMismatch);
        assert_eq!(p.check("", now), VerifyOutcome::CodeMismatch);
        assert_eq!(p.check("99999999999999999999", now), VerifyOutcome::CodeMismatch);
    }

    #[test]
    fn surrounding_whitespace_is_tolerated() {
        let now = Utc::now();
        let p = pending(123_456, now);
        assert_eq!(p.check(" 123456 ", now), VerifyOutcome::Verified);
    }

    #[test]
    fn correct_code_after_ttl_is_expired() {
        let issued = Utc::now();
        let p = pending(123_456, issued);
        let late = issued + Duration::seconds(601);
        assert_eq!(p.check("123456", late), VerifyOutcome::Expired);
    }

    #[test]
    fn exactly_at_expiry_is_still_accepted() {
        let issued = Utc::now();
        let p = pending(123_456, issued);
        assert_eq!(p.check("123456", p.expires_at), VerifyOutcome::Verified);
        assert!(!p.is_expired(p.expires_at));
        assert!(p.is_expired(p.expires_at + Duration::milliseconds(1)));
    }

    #[test]
    fn generated_codes_stay_in_range() {
        for _ in 0..1000 {
            let code = generate_otp();
            assert!((OTP_MIN..OTP_MAX).contains(&code), "out of range: {}", code);
        }
    }
}
