use crate::config::Config;
use crate::error::Result;
use crate::repositories::registration::PgRegistrationStore;
use crate::services::email::{BrevoMailer, Mailer};
use crate::services::media::{LocalMediaStore, MediaStore};
use crate::services::registration::RegistrationStore;
use deadpool_postgres::Pool;
use std::sync::Arc;

/// The application's state.
#[derive(Clone)]
pub struct AppState {
    /// The database connection pool.
    pub db: Pool,
    /// The application's configuration.
    pub config: Config,
    /// The registration state machine's persistence.
    pub registration: Arc<dyn RegistrationStore>,
    /// The outbound OTP mailer.
    pub mailer: Arc<dyn Mailer>,
    /// Storage for uploaded media.
    pub media: Arc<dyn MediaStore>,
}

impl AppState {
    /// Creates a new `AppState` from the configuration.
    pub async fn new(config: &Config) -> Result<Self> {
        let db = crate::db::create_pool(&config.database_url)?;
        tracing::info!("✅ PostgreSQL pool initialized with deadpool-postgres");

        let registration: Arc<dyn RegistrationStore> =
            Arc::new(PgRegistrationStore::new(db.clone()));

        let mailer: Arc<dyn Mailer> = Arc::new(BrevoMailer::new(
            config.email_api_key.to_string(),
            config.email_sender.clone(),
        ));
        tracing::info!("✅ Transactional mailer initialized");

        let media: Arc<dyn MediaStore> = Arc::new(LocalMediaStore::new(
            config.media_dir.clone(),
            config.public_base_url.clone(),
        ));
        tracing::info!("✅ Media store initialized at {}", config.media_dir);

        Ok(AppState {
            db,
            config: config.clone(),
            registration,
            mailer,
            media,
        })
    }
}
