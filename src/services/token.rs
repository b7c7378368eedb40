use crate::error::{AppError, Result};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// The claims carried by a session token.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// The id of the user the token is bound to.
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

/// Issues a signed session token bound to `user_id`.
pub fn issue(user_id: &str, secret: &[u8], duration_hours: i64) -> Result<String> {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: user_id.to_string(),
        iat: now,
        exp: now + duration_hours * 3600,
    };

    jsonwebtoken::encode(&Header::default(), &claims, &EncodingKey::from_secret(secret))
        .map_err(|e| AppError::Internal(format!("Token signing failed: {}", e)))
}

/// Verifies a session token and returns its claims.
///
/// Signature or expiry failures both surface as `Unauthorized`.
pub fn verify(token: &str, secret: &[u8]) -> Result<Claims> {
    jsonwebtoken::decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::Unauthorized)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"test-secret-with-enough-entropy-0001";

    #[test]
    fn issue_and_verify_round_trip() {
        let token = issue("user-123", SECRET, 1).unwrap();
        let claims = verify(&token, SECRET).unwrap();
        assert_eq!(claims.sub, "user-123");
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn wrong_secret_fails() {
        let token = issue("user-123", SECRET, 1).unwrap();
        assert!(verify(&token, b"another-secret-with-enough-entropy").is_err());
    }

    #[test]
    fn expired_token_fails() {
        // Issued two hours in the past; the default 60s leeway cannot save it.
        let token = issue("user-123", SECRET, -2).unwrap();
        assert!(verify(&token, SECRET).is_err());
    }

    #[test]
    fn garbage_token_fails() {
        assert!(verify("not.a.jwt", SECRET).is_err());
    }
}
