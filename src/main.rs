use axum::{
    middleware::from_fn_with_state,
    routing::{get, post, put},
    Router,
};

use http::{header, Method};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_governor::governor::GovernorConfigBuilder;
use tower_http::{
    cors::CorsLayer,
    limit::RequestBodyLimitLayer,
    services::ServeDir,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};

use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod db;
mod error;
mod state;

mod models {
    pub mod comment;
    pub mod notification;
    pub mod pending;
    pub mod post;
    pub mod user;
}

mod repositories {
    pub mod comment;
    pub mod like;
    pub mod notification;
    pub mod post;
    pub mod registration;
    pub mod user;
}

mod services {
    pub mod auth;
    pub mod email;
    pub mod media;
    pub mod registration;
    pub mod token;
}

mod handlers {
    pub mod auth;
    pub mod notifications;
    pub mod posts;
}

mod middleware_layer {
    pub mod auth;
}

mod validation {
    pub mod auth;
}

use config::Config;
use state::AppState;

/// Matches the original upload cap of 10 MB per request.
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;
/// How often expired pending registrations are swept.
const SWEEP_INTERVAL_SECS: u64 = 300;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    tracing::info!("✅ Configuration loaded successfully");

    let state = AppState::new(&config).await?;
    tracing::info!("✅ AppState initialized");

    let cors = CorsLayer::new()
        .allow_origin([
            "http://localhost:3000".parse().unwrap(),
            "http://127.0.0.1:3000".parse().unwrap(),
        ])
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
        .max_age(Duration::from_secs(86400));

    // Tight budget for the endpoints that hash passwords and send email.
    let auth_governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(2)
            .burst_size(5)
            .use_headers()
            .finish()
            .unwrap(),
    );

    let protected_governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(50)
            .burst_size(100)
            .use_headers()
            .finish()
            .unwrap(),
    );

    let auth_routes = Router::new()
        .route("/api/auth/register", post(handlers::auth::register))
        .route("/api/auth/verify-otp", post(handlers::auth::verify_otp))
        .route("/api/auth/login", post(handlers::auth::login))
        .layer(tower_governor::GovernorLayer::new(auth_governor_conf))
        .with_state(state.clone());

    let public_routes = Router::new()
        .route("/api/auth/users", get(handlers::auth::list_users))
        .route("/api/auth/posts", get(handlers::posts::list_posts))
        .route(
            "/api/auth/comments/{post_id}",
            get(handlers::posts::list_comments),
        )
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/api/auth/edit-profile", put(handlers::auth::edit_profile))
        .route("/api/auth/create-post", post(handlers::posts::create_post))
        .route(
            "/api/auth/create-comment",
            post(handlers::posts::create_comment),
        )
        .route("/api/auth/like-post", post(handlers::posts::like_post))
        .route(
            "/api/auth/notifications",
            get(handlers::notifications::list_notifications),
        )
        .layer(tower_governor::GovernorLayer::new(protected_governor_conf))
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware_layer::auth::require_auth,
        ))
        .with_state(state.clone());

    let app = Router::new()
        .merge(auth_routes)
        .merge(public_routes)
        .merge(protected_routes)
        .nest_service("/media", ServeDir::new(&config.media_dir))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default())
                .on_request(DefaultOnRequest::default().level(Level::DEBUG))
                .on_response(DefaultOnResponse::default().level(Level::DEBUG))
                .on_failure(DefaultOnFailure::default().level(Level::ERROR)),
        )
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(cors);

    let sweep_store = state.registration.clone();
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(Duration::from_secs(SWEEP_INTERVAL_SECS)).await;
            match sweep_store.sweep_expired(chrono::Utc::now()).await {
                Ok(0) => {}
                Ok(removed) => {
                    tracing::info!("🧹 Swept {} expired pending registrations", removed);
                }
                Err(e) => {
                    tracing::error!("❌ Pending-registration sweep failed: {}", e);
                }
            }
        }
    });

    let addr = SocketAddr::from(([127, 0, 0, 1], 3000));
    tracing::info!("🚀 Server listening on http://{}", addr);
    tracing::info!("✅ Background sweep started (every {}s)", SWEEP_INTERVAL_SECS);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
