use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::candidates::repo;
use crate::errors::AppError;
use crate::models::notification::{NotificationKind, NotificationRow};
use crate::notifications::{notify, retention_cutoff, user_for_candidate, Notice};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct NotificationList {
    pub count: usize,
    pub notifications: Vec<NotificationRow>,
}

#[derive(Debug, Deserialize)]
pub struct CustomNotificationRequest {
    pub candidate_id: Uuid,
    pub title: Option<String>,
    pub message: String,
}

/// GET /api/notifications
pub async fn handle_list(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<NotificationList>, AppError> {
    let cutoff = retention_cutoff(Utc::now());

    let purged = sqlx::query("DELETE FROM notifications WHERE recipient = $1 AND created_at < $2")
        .bind(user.id)
        .bind(cutoff)
        .execute(&state.db)
        .await?
        .rows_affected();
    if purged > 0 {
        info!("Purged {purged} expired notifications for {}", user.email);
    }

    let notifications = sqlx::query_as::<_, NotificationRow>(
        "SELECT * FROM notifications WHERE recipient = $1 ORDER BY created_at DESC",
    )
    .bind(user.id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(NotificationList {
        count: notifications.len(),
        notifications,
    }))
}

/// POST /api/notifications/custom
pub async fn handle_custom(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<CustomNotificationRequest>,
) -> Result<Json<NotificationRow>, AppError> {
    user.require_staff()?;

    let message = req.message.trim();
    if message.is_empty() {
        return Err(AppError::Validation("Message is required".to_string()));
    }

    repo::find_candidate(&state.db, req.candidate_id).await?;
    let recipient = user_for_candidate(&state.db, req.candidate_id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound("Candidate has no associated user account".to_string())
        })?;

    let title = req
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or("New Message");
    let row = notify(
        &state.db,
        recipient,
        Notice::new(NotificationKind::Info, message).title(title),
    )
    .await?;

    info!("{} sent a notification to candidate {}", user.email, req.candidate_id);
    Ok(Json(row))
}

/// PUT /api/notifications/read-all
pub async fn handle_read_all(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Value>, AppError> {
    let updated = sqlx::query(
        "UPDATE notifications SET is_read = true WHERE recipient = $1 AND NOT is_read",
    )
    .bind(user.id)
    .execute(&state.db)
    .await?
    .rows_affected();

    Ok(Json(json!({
        "message": "All notifications marked as read",
        "updated": updated,
    })))
}

/// DELETE /api/notifications/:id
pub async fn handle_dismiss(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let recipient: Uuid = sqlx::query_scalar("SELECT recipient FROM notifications WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Notification not found".to_string()))?;

    if recipient != user.id {
        return Err(AppError::Forbidden("Not authorized".to_string()));
    }

    sqlx::query("DELETE FROM notifications WHERE id = $1")
        .bind(id)
        .execute(&state.db)
        .await?;

    Ok(Json(json!({ "message": "Notification dismissed" })))
}
