use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::types::Json as SqlJson;
use tracing::info;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::candidates::repo;
use crate::errors::AppError;
use crate::models::candidate::CandidateRow;
use crate::models::notification::NotificationKind;
use crate::models::training::{
    Resource, ResourceKind, TrainingRow, TrainingWithAssignee, TRAINING_ASSIGNED,
    TRAINING_COMPLETED,
};
use crate::notifications::{notify, user_for_candidate, Notice};
use crate::state::AppState;
use crate::storage::{content_type_for, inline_disposition, object_key, TRAINING_PREFIX};
use crate::training::{assignment_message, clean_resources, deletion_message};
use crate::uploads::read_form;

#[derive(Debug, Deserialize)]
pub struct AssignRequest {
    pub candidate_ids: Vec<Uuid>,
    pub title: String,
    pub description: Option<String>,
    #[serde(default)]
    pub resources: Vec<Resource>,
    pub due_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct AssignResponse {
    pub message: String,
    pub ids: Vec<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct UploadedResource {
    pub url: String,
    pub filename: String,
}

#[derive(Debug, Serialize)]
pub struct TrainingList<T> {
    pub count: usize,
    pub trainings: Vec<T>,
}

impl<T> From<Vec<T>> for TrainingList<T> {
    fn from(trainings: Vec<T>) -> Self {
        Self {
            count: trainings.len(),
            trainings,
        }
    }
}

async fn find_training(state: &AppState, id: Uuid) -> Result<TrainingRow, AppError> {
    sqlx::query_as::<_, TrainingRow>("SELECT * FROM trainings WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Training module not found".to_string()))
}

async fn caller_candidate(state: &AppState, user: &AuthUser) -> Result<CandidateRow, AppError> {
    repo::find_by_email(&state.db, &user.email)
        .await?
        .ok_or_else(|| AppError::NotFound("Candidate profile not found".to_string()))
}

async fn trainings_of(state: &AppState, candidate_id: Uuid) -> Result<Vec<TrainingRow>, AppError> {
    let trainings = sqlx::query_as::<_, TrainingRow>(
        r#"
        SELECT * FROM trainings
        WHERE assigned_to = $1
        ORDER BY due_date ASC NULLS LAST, created_at DESC
        "#,
    )
    .bind(candidate_id)
    .fetch_all(&state.db)
    .await?;
    Ok(trainings)
}

/// POST /api/training/assign
///
/// Creates one training row per candidate and notifies every candidate that
/// already has a portal account.
pub async fn handle_assign(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<AssignRequest>,
) -> Result<(StatusCode, Json<AssignResponse>), AppError> {
    user.require_staff()?;

    if req.candidate_ids.is_empty() {
        return Err(AppError::Validation(
            "Please select at least one candidate".to_string(),
        ));
    }
    let title = req.title.trim();
    if title.is_empty() {
        return Err(AppError::Validation("Title is required".to_string()));
    }
    let resources = clean_resources(req.resources)?;
    let message = assignment_message(title, req.due_date);

    let mut tx = state.db.begin().await?;
    let mut ids = Vec::with_capacity(req.candidate_ids.len());
    for candidate_id in &req.candidate_ids {
        repo::find_candidate(&mut *tx, *candidate_id).await?;

        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO trainings
                (id, title, description, resources, assigned_by, assigned_to, status, due_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(title)
        .bind(req.description.as_deref())
        .bind(SqlJson(&resources))
        .bind(user.id)
        .bind(candidate_id)
        .bind(TRAINING_ASSIGNED)
        .bind(req.due_date)
        .fetch_one(&mut *tx)
        .await?;
        ids.push(id);

        if let Some(recipient) = user_for_candidate(&mut *tx, *candidate_id).await? {
            notify(
                &mut *tx,
                recipient,
                Notice::new(NotificationKind::Info, message.clone()).title("New Training Assigned"),
            )
            .await?;
        }
    }
    tx.commit().await?;

    info!("{} assigned '{title}' to {} interns", user.email, ids.len());
    Ok((
        StatusCode::CREATED,
        Json(AssignResponse {
            message: format!("Assigned training \"{title}\" to {} interns", ids.len()),
            ids,
        }),
    ))
}

/// POST /api/training/upload-resource
pub async fn handle_upload_resource(
    State(state): State<AppState>,
    user: AuthUser,
    multipart: Multipart,
) -> Result<Json<UploadedResource>, AppError> {
    user.require_staff()?;

    let (file, _) = read_form(multipart, "file").await?.require_file("file")?;
    let key = object_key(TRAINING_PREFIX, &file.filename);
    state
        .storage
        .put(&key, file.bytes, content_type_for(&file.filename))
        .await?;

    info!("Training resource '{}' stored as {key}", file.filename);
    Ok(Json(UploadedResource {
        url: key,
        filename: file.filename,
    }))
}

/// GET /api/training/all
pub async fn handle_all(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<TrainingList<TrainingWithAssignee>>, AppError> {
    user.require_staff()?;
    let trainings = sqlx::query_as::<_, TrainingWithAssignee>(
        r#"
        SELECT t.*,
               c.name AS assignee_name,
               c.email AS assignee_email,
               c.status AS assignee_status
        FROM trainings t
        JOIN candidates c ON c.id = t.assigned_to
        ORDER BY t.created_at DESC
        "#,
    )
    .fetch_all(&state.db)
    .await?;
    Ok(Json(trainings.into()))
}

/// GET /api/training/candidate/:candidate_id
pub async fn handle_for_candidate(
    State(state): State<AppState>,
    user: AuthUser,
    Path(candidate_id): Path<Uuid>,
) -> Result<Json<TrainingList<TrainingRow>>, AppError> {
    user.require_staff()?;
    Ok(Json(trainings_of(&state, candidate_id).await?.into()))
}

/// DELETE /api/training/:id
pub async fn handle_delete(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    user.require_staff()?;

    let training = find_training(&state, id).await?;

    let mut tx = state.db.begin().await?;
    if let Some(recipient) = user_for_candidate(&mut *tx, training.assigned_to).await? {
        notify(
            &mut *tx,
            recipient,
            Notice::new(NotificationKind::Warning, deletion_message(&training.title)),
        )
        .await?;
    }
    sqlx::query("DELETE FROM trainings WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    info!("Training {id} '{}' deleted by {}", training.title, user.email);
    Ok(Json(json!({ "message": "Training module removed" })))
}

/// GET /api/training/my-learning
pub async fn handle_my_learning(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<TrainingList<TrainingRow>>, AppError> {
    let candidate = caller_candidate(&state, &user).await?;
    Ok(Json(trainings_of(&state, candidate.id).await?.into()))
}

/// PATCH /api/training/:id/complete
pub async fn handle_complete(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<TrainingRow>, AppError> {
    let training = find_training(&state, id).await?;
    let candidate = repo::find_by_email(&state.db, &user.email).await?;
    if candidate.map(|c| c.id) != Some(training.assigned_to) {
        return Err(AppError::Forbidden("Not authorized".to_string()));
    }

    let training = sqlx::query_as::<_, TrainingRow>(
        r#"
        UPDATE trainings
        SET status = $1, completion_date = COALESCE(completion_date, now()), updated_at = now()
        WHERE id = $2
        RETURNING *
        "#,
    )
    .bind(TRAINING_COMPLETED)
    .bind(id)
    .fetch_one(&state.db)
    .await?;

    info!("Training {id} completed by {}", user.email);
    Ok(Json(training))
}

/// GET /api/training/:id/resources/:index
///
/// Streams an uploaded file resource. Staff may read any; an intern only the
/// trainings assigned to them.
pub async fn handle_resource_file(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, index)): Path<(Uuid, usize)>,
) -> Result<Response, AppError> {
    let training = find_training(&state, id).await?;
    if !user.role.is_staff() {
        let own = caller_candidate(&state, &user).await?;
        if own.id != training.assigned_to {
            return Err(AppError::Forbidden("Not authorized".to_string()));
        }
    }

    let resource = training
        .resources
        .get(index)
        .filter(|r| r.kind == ResourceKind::File)
        .ok_or_else(|| AppError::NotFound("Resource not found".to_string()))?;

    let bytes = state.storage.get(&resource.url).await?;
    Ok((
        [
            (header::CONTENT_TYPE, content_type_for(&resource.url).to_string()),
            (
                header::CONTENT_DISPOSITION,
                inline_disposition(&resource.label),
            ),
        ],
        bytes,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assign_request_defaults() {
        let req: AssignRequest = serde_json::from_str(
            r#"{"candidate_ids":["00000000-0000-0000-0000-000000000001"],"title":"Git"}"#,
        )
        .unwrap();
        assert!(req.resources.is_empty());
        assert!(req.due_date.is_none());
    }

    #[test]
    fn test_list_counts() {
        let list: TrainingList<u8> = vec![1, 2, 3].into();
        assert_eq!(list.count, 3);
    }
}
