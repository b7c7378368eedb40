use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::Response,
};

use crate::{services::token, state::AppState};

/// The authenticated caller, attached to the request by [`require_auth`].
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub id: String,
}

/// Extracts the bearer token from the `Authorization` header.
fn extract_bearer(request: &Request<Body>) -> Option<&str> {
    request
        .headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// A middleware that requires a valid session token.
///
/// A missing header is 401; a present but invalid or expired token is 403.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let token = extract_bearer(&request).ok_or_else(|| {
        tracing::warn!("❌ No bearer token in Authorization header");
        StatusCode::UNAUTHORIZED
    })?;

    let claims = token::verify(token, state.config.jwt_secret.as_bytes()).map_err(|_| {
        tracing::warn!("❌ Invalid or expired session token");
        StatusCode::FORBIDDEN
    })?;

    tracing::debug!("✅ User authenticated: {}", claims.sub);

    request.extensions_mut().insert(AuthUser { id: claims.sub });

    Ok(next.run(request).await)
}
