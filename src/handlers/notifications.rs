use axum::{extract::State, response::IntoResponse, Extension, Json};
use serde::Serialize;

use crate::{
    error::Result,
    middleware_layer::auth::AuthUser,
    models::notification::Notification,
    repositories::notification as notification_repo,
    state::AppState,
};

#[derive(Serialize)]
pub struct NotificationsResponse {
    pub message: String,
    pub data: Vec<Notification>,
}

/// Lists the authenticated user's notifications, newest first.
#[axum::debug_handler]
pub async fn list_notifications(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<impl IntoResponse> {
    let notifications = notification_repo::list_for_user(&state.db, &auth.id).await?;

    Ok(Json(NotificationsResponse {
        message: "Notifications fetched successfully".to_string(),
        data: notifications,
    }))
}
