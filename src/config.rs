use anyhow::{Context, Result};
use std::env;
use zeroize::Zeroizing;

/// The application's configuration.
#[derive(Clone)]
pub struct Config {
    /// The URL of the PostgreSQL database.
    pub database_url: String,
    /// The secret used to sign session tokens.
    pub jwt_secret: Zeroizing<String>,
    /// The duration of a session token in hours.
    pub token_duration_hours: i64,
    /// The lifetime of a one-time registration code in minutes.
    pub otp_ttl_minutes: i64,
    /// The API key for the transactional email provider.
    pub email_api_key: Zeroizing<String>,
    /// The sender address used for outbound email.
    pub email_sender: String,
    /// The directory where uploaded media files are stored.
    pub media_dir: String,
    /// The base URL under which stored media is publicly reachable.
    pub public_base_url: String,
}

impl Config {
    /// Creates a new `Config` from environment variables.
    pub fn from_env() -> Result<Self> {
        let jwt_secret = env::var("JWT_SECRET")
            .context("JWT_SECRET must be set (generate with: openssl rand -hex 32)")?;

        if jwt_secret.len() < 32 {
            anyhow::bail!("JWT_SECRET must be at least 32 characters");
        }

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            jwt_secret: Zeroizing::new(jwt_secret),
            token_duration_hours: env::var("TOKEN_DURATION_HOURS")
                .unwrap_or_else(|_| "1".to_string())
                .parse()
                .context("Invalid TOKEN_DURATION_HOURS")?,
            otp_ttl_minutes: env::var("OTP_TTL_MINUTES")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .context("Invalid OTP_TTL_MINUTES")?,
            email_api_key: Zeroizing::new(
                env::var("EMAIL_API_KEY").context("EMAIL_API_KEY must be set")?,
            ),
            email_sender: env::var("EMAIL_SENDER").context("EMAIL_SENDER must be set")?,
            media_dir: env::var("MEDIA_DIR").unwrap_or_else(|_| "media/uploads".to_string()),
            public_base_url: env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
        })
    }
}
