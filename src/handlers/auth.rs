use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use garde::Validate;
use serde::{Deserialize, Serialize};

use crate::{
    error::{AppError, Result},
    middleware_layer::auth::AuthUser,
    models::user::{ProfileUpdate, PublicUser},
    repositories::user as user_repo,
    services::{auth as auth_service, media, registration, token},
    state::AppState,
    validation::auth::*,
};

/// The request payload for user registration.
#[derive(Deserialize, Validate)]
pub struct RegisterRequest {
    #[garde(length(min = 1, max = 100))]
    pub name: String,
    #[garde(email)]
    pub email: String,
    #[garde(length(min = 8, max = 128))]
    pub password: String,
}

/// An OTP as submitted by a client, numeric or quoted.
#[derive(Deserialize, Debug)]
#[serde(untagged)]
pub enum OtpField {
    Number(u64),
    Text(String),
}

impl OtpField {
    fn as_submitted(&self) -> String {
        match self {
            OtpField::Number(n) => n.to_string(),
            OtpField::Text(s) => s.clone(),
        }
    }
}

/// The request payload for OTP verification.
#[derive(Deserialize, Validate)]
pub struct VerifyOtpRequest {
    #[garde(email)]
    pub email: String,
    #[garde(skip)]
    pub otp: OtpField,
}

/// The request payload for user login.
#[derive(Deserialize, Validate)]
pub struct LoginRequest {
    #[garde(email)]
    pub email: String,
    #[garde(length(min = 1))]
    pub password: String,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Serialize)]
pub struct RegisterData {
    pub email: String,
}

#[derive(Serialize)]
pub struct RegisterResponse {
    pub message: String,
    pub data: RegisterData,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub message: String,
    pub data: PublicUser,
    pub token: String,
}

#[derive(Serialize)]
pub struct UsersResponse {
    pub message: String,
    pub users: Vec<PublicUser>,
}

#[derive(Serialize)]
pub struct EditProfileResponse {
    pub message: String,
    pub data: PublicUser,
    /// A fresh token, present only when the identifier changed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

// Named to stay clear of the helpers `#[axum::debug_handler]` generates.
fn check_valid(report: std::result::Result<(), garde::Report>) -> Result<()> {
    report.map_err(|e| AppError::Validation(e.to_string()))
}

/// Handles user registration: admits a pending registration and
/// dispatches the one-time code. The code itself never leaves the server.
#[axum::debug_handler]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse> {
    tracing::info!("📝 Register attempt for {}", payload.email);
    check_valid(payload.validate())?;

    let password_hash = auth_service::hash_password(&payload.password)?;

    let email = registration::register(
        state.registration.as_ref(),
        state.mailer.as_ref(),
        payload.name,
        payload.email,
        password_hash,
        state.config.otp_ttl_minutes,
    )
    .await?;

    let response = RegisterResponse {
        message: "OTP sent successfully. Please check your email.".to_string(),
        data: RegisterData { email },
    };

    Ok((StatusCode::CREATED, Json(response)))
}

/// Handles OTP verification, promoting the pending registration to a
/// verified user.
#[axum::debug_handler]
pub async fn verify_otp(
    State(state): State<AppState>,
    Json(payload): Json<VerifyOtpRequest>,
) -> Result<impl IntoResponse> {
    check_valid(payload.validate())?;

    registration::verify_otp(
        state.registration.as_ref(),
        &payload.email,
        &payload.otp.as_submitted(),
    )
    .await?;

    Ok(Json(MessageResponse {
        message: "Email verified successfully.".to_string(),
    }))
}

/// Handles user login, issuing a time-limited session token.
#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse> {
    tracing::info!("🔐 Login attempt for {}", payload.email);
    check_valid(payload.validate())?;

    let user = user_repo::find_by_email(&state.db, &payload.email)
        .await?
        .ok_or_else(|| AppError::NotFound("Email or password not found".to_string()))?;

    if !auth_service::verify_password(&payload.password, &user.password_hash)? {
        return Err(AppError::Authentication("Wrong password".to_string()));
    }

    let token = token::issue(
        &user.id,
        state.config.jwt_secret.as_bytes(),
        state.config.token_duration_hours,
    )?;

    tracing::info!("✅ User logged in: {}", user.id);

    Ok(Json(LoginResponse {
        message: "Login successful".to_string(),
        data: user.into(),
        token,
    }))
}

/// Lists the public projection of every user.
#[axum::debug_handler]
pub async fn list_users(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let users = user_repo::list_users(&state.db).await?;

    Ok(Json(UsersResponse {
        message: "Users fetched successfully".to_string(),
        users,
    }))
}

/// Handles the multipart profile editor: optional `id`, `name`,
/// `password`, `profile_picture` and `header_picture` fields.
///
/// Changing `id` is destructive (the user's content is removed before
/// the identifier changes) and re-issues the session token, since the
/// old one is bound to the retired identifier.
#[axum::debug_handler]
pub async fn edit_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse> {
    tracing::info!("✏️ Profile edit for user: {}", auth.id);

    let mut update = ProfileUpdate::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Multipart(e.to_string()))?
    {
        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            "id" => {
                let id = field
                    .text()
                    .await
                    .map_err(|e| AppError::Multipart(e.to_string()))?;
                validate_user_id(&id)?;
                update.new_id = Some(id);
            }
            "name" => {
                let name = field
                    .text()
                    .await
                    .map_err(|e| AppError::Multipart(e.to_string()))?;
                validate_name(&name)?;
                update.name = Some(name);
            }
            "password" => {
                let password = field
                    .text()
                    .await
                    .map_err(|e| AppError::Multipart(e.to_string()))?;
                validate_password(&password)?;
                update.password_hash = Some(auth_service::hash_password(&password)?);
            }
            "profile_picture" | "header_picture" => {
                let filename = field.file_name().unwrap_or("picture").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Multipart(e.to_string()))?;
                media::check_picture(&bytes)?;
                let url = state.media.store(&filename, &bytes).await?;
                if field_name == "profile_picture" {
                    update.profile_picture = Some(url);
                } else {
                    update.header_picture = Some(url);
                }
            }
            other => {
                tracing::debug!("Ignoring unknown multipart field: {}", other);
            }
        }
    }

    if update.is_empty() {
        return Err(AppError::Validation("No fields to update".to_string()));
    }

    let id_changed = update
        .new_id
        .as_deref()
        .is_some_and(|new_id| new_id != auth.id);

    let user = user_repo::update_profile(&state.db, &auth.id, &update).await?;

    // The old token names an id that no longer exists; hand out a new one.
    let token = if id_changed {
        Some(token::issue(
            &user.id,
            state.config.jwt_secret.as_bytes(),
            state.config.token_duration_hours,
        )?)
    } else {
        None
    };

    tracing::info!("✅ Profile updated for user: {}", user.id);

    Ok(Json(EditProfileResponse {
        message: "Profile updated successfully".to_string(),
        data: user.into(),
        token,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_register_payload_maps_to_a_validation_error() {
        let payload = RegisterRequest {
            name: "".to_string(),
            email: "not-an-email".to_string(),
            password: "short".to_string(),
        };
        let err = check_valid(payload.validate()).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn valid_register_payload_passes() {
        let payload = RegisterRequest {
            name: "Ana".to_string(),
            email: "ana@example.com".to_string(),
            password: "SecurePass123!".to_string(),
        };
        assert!(check_valid(payload.validate()).is_ok());
    }

    #[test]
    fn otp_field_accepts_numeric_and_quoted_forms() {
        assert_eq!(OtpField::Number(123_456).as_submitted(), "123456");
        assert_eq!(OtpField::Text("123456".to_string()).as_submitted(), "123456");
    }
}
