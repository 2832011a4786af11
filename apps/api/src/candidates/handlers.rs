use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::types::Json as SqlJson;
use sqlx::{Postgres, QueryBuilder};
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::users::normalize_email;
use crate::auth::AuthUser;
use crate::candidates::filters::{filter_colleges, page_count, CandidateListQuery, ListFilter, Pagination};
use crate::candidates::parser::{self, ParsedResume};
use crate::candidates::repo;
use crate::candidates::stats::{tally, CandidateStats};
use crate::errors::AppError;
use crate::llm_client::prompts::{hiring_assistant_system, CHAT_MAX_TOKENS};
use crate::llm_client::ChatTurn;
use crate::models::candidate::{CandidateDetail, CandidateRow, Education, RoundRow};
use crate::pipeline::rounds::{check_can_evaluate, current_round, plan_add_round, Evaluation};
use crate::pipeline::{CandidateStatus, RoundStatus, RoundType};
use crate::state::AppState;
use crate::storage::{object_key, RESUME_PREFIX};
use crate::uploads::{read_form, UploadedFile};

/// A parsed resume awaiting manager review. Nothing is in the database yet.
#[derive(Debug, Serialize)]
pub struct StagedCandidate {
    pub temp_id: Uuid,
    pub resume_url: String,
    pub original_name: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub linkedin_url: String,
    pub github_url: String,
    pub skills: Vec<String>,
    pub experience: String,
    pub education: Vec<Education>,
    pub full_raw_text: String,
    pub parsing_confidence: f64,
    pub parsing_status: &'static str,
    pub status: CandidateStatus,
}

impl StagedCandidate {
    fn new(parsed: ParsedResume, resume_url: String, original_name: String) -> Self {
        Self {
            temp_id: Uuid::new_v4(),
            resume_url,
            original_name,
            name: parsed
                .name
                .unwrap_or_else(|| "Unknown Candidate".to_string()),
            email: parsed.email.unwrap_or_default(),
            phone: parsed.phone.unwrap_or_default(),
            linkedin_url: parsed.linkedin_url.unwrap_or_default(),
            github_url: parsed.github_url.unwrap_or_default(),
            skills: parsed.skills,
            experience: parsed.experience,
            education: parsed.education,
            full_raw_text: parsed.raw_text,
            parsing_confidence: parsed.confidence,
            parsing_status: "success",
            status: CandidateStatus::Assessment,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: String,
    pub candidate: StagedCandidate,
}

#[derive(Debug, Deserialize)]
pub struct NewCandidate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub linkedin_url: Option<String>,
    pub github_url: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    pub experience: Option<String>,
    #[serde(default)]
    pub education: Vec<Education>,
    pub resume_url: String,
    #[serde(default)]
    pub full_raw_text: String,
    pub parsing_confidence: Option<f64>,
    pub status: Option<CandidateStatus>,
}

#[derive(Debug, Deserialize)]
pub struct BatchCreateRequest {
    pub candidates: Vec<NewCandidate>,
}

#[derive(Debug, Serialize)]
pub struct BatchCreateResponse {
    pub message: String,
    pub count: usize,
    pub ids: Vec<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct CandidateListResponse {
    pub count: usize,
    pub pagination: Pagination,
    pub data: Vec<CandidateRow>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCandidateRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub github_url: Option<String>,
    pub linkedin_url: Option<String>,
    pub skills: Option<Vec<String>>,
    pub experience: Option<String>,
    pub education: Option<Vec<Education>>,
    pub status: Option<CandidateStatus>,
    pub rejection_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddRoundRequest {
    #[serde(rename = "type")]
    pub round_type: RoundType,
    pub name: Option<String>,
    pub interviewer: Option<String>,
    pub scheduled_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct EvaluateRoundRequest {
    pub status: RoundStatus,
    pub score: i32,
    #[serde(default)]
    pub feedback: String,
}

#[derive(Debug, Serialize)]
pub struct RoundResponse {
    pub round: RoundRow,
    pub candidate_status: CandidateStatus,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub history: Vec<ChatTurn>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
}

fn looks_like_pdf(file: &UploadedFile) -> bool {
    file.bytes.starts_with(b"%PDF")
        || file.content_type.as_deref() == Some("application/pdf")
        || file.filename.to_ascii_lowercase().ends_with(".pdf")
}

/// POST /api/candidates/upload
///
/// Parses a resume and returns it staged for review. The PDF is stored only
/// once it has passed the parser's confidence gate.
pub async fn handle_upload(
    State(state): State<AppState>,
    user: AuthUser,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    user.require_staff()?;

    let (file, _) = read_form(multipart, "resume").await?.require_file("resume")?;
    if !looks_like_pdf(&file) {
        return Err(AppError::Validation("Please upload a PDF resume".to_string()));
    }

    // PDF text extraction and regex parsing are CPU-bound.
    let pdf = file.bytes.clone();
    let parsed = tokio::task::spawn_blocking(move || {
        let text = parser::extract_text(&pdf)?;
        parser::parse_resume(&text)
    })
    .await
    .map_err(|e| AppError::Internal(anyhow::anyhow!("Resume parsing task failed: {e}")))?
    .map_err(|e| {
        warn!("Resume '{}' rejected: {e}", file.filename);
        AppError::Validation(e.to_string())
    })?;

    let key = object_key(RESUME_PREFIX, &file.filename);
    state.storage.put(&key, file.bytes, "application/pdf").await?;

    info!(
        "Resume '{}' parsed with confidence {:.2}, stored as {key}",
        file.filename, parsed.confidence
    );
    Ok(Json(UploadResponse {
        message: "Resume parsed successfully".to_string(),
        candidate: StagedCandidate::new(parsed, key, file.filename),
    }))
}

/// POST /api/candidates/batch
pub async fn handle_batch_create(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<BatchCreateRequest>,
) -> Result<(StatusCode, Json<BatchCreateResponse>), AppError> {
    user.require_staff()?;

    if req.candidates.is_empty() {
        return Err(AppError::Validation("No candidates provided".to_string()));
    }

    let mut tx = state.db.begin().await?;
    let mut ids = Vec::with_capacity(req.candidates.len());

    for c in req.candidates {
        if c.resume_url.trim().is_empty() {
            return Err(AppError::Validation("Every candidate needs a resume_url".to_string()));
        }
        let status = c.status.unwrap_or(CandidateStatus::Assessment);
        if !status.is_pre_offer() {
            return Err(AppError::Validation(format!(
                "New candidates cannot start in status {status}"
            )));
        }
        let email = c
            .email
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .map(normalize_email)
            .transpose()?;

        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO candidates
                (id, name, email, phone, linkedin_url, github_url, skills, experience,
                 education, resume_url, full_raw_text, parsing_confidence, parsing_status, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, 'success', $13)
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(c.name.map(|n| n.trim().to_string()))
        .bind(email)
        .bind(c.phone)
        .bind(c.linkedin_url)
        .bind(c.github_url)
        .bind(c.skills)
        .bind(c.experience)
        .bind(SqlJson(c.education))
        .bind(c.resume_url)
        .bind(c.full_raw_text)
        .bind(c.parsing_confidence.unwrap_or(1.0))
        .bind(status.as_str())
        .fetch_one(&mut *tx)
        .await?;
        ids.push(id);
    }
    tx.commit().await?;

    info!("{} created {} candidates", user.email, ids.len());
    Ok((
        StatusCode::CREATED,
        Json(BatchCreateResponse {
            message: format!("Successfully created {} candidates", ids.len()),
            count: ids.len(),
            ids,
        }),
    ))
}

/// GET /api/candidates
pub async fn handle_list(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<CandidateListQuery>,
) -> Result<Json<CandidateListResponse>, AppError> {
    user.require_staff()?;
    let filter = ListFilter::try_from(query)?;

    let mut count_qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM candidates WHERE TRUE");
    filter.push_conditions(&mut count_qb);
    let total: i64 = count_qb.build_query_scalar::<i64>().fetch_one(&state.db).await?;

    let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM candidates WHERE TRUE");
    filter.push_conditions(&mut qb);
    qb.push(" ORDER BY created_at DESC LIMIT ")
        .push_bind(filter.limit)
        .push(" OFFSET ")
        .push_bind(filter.offset());
    let data: Vec<CandidateRow> = qb.build_query_as::<CandidateRow>().fetch_all(&state.db).await?;

    Ok(Json(CandidateListResponse {
        count: data.len(),
        pagination: Pagination {
            total,
            page: filter.page,
            pages: page_count(total, filter.limit),
        },
        data,
    }))
}

/// GET /api/candidates/filters/colleges
pub async fn handle_colleges(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<String>>, AppError> {
    user.require_staff()?;
    let institutes: Vec<Option<String>> = sqlx::query_scalar(
        "SELECT DISTINCT edu->>'institute' FROM candidates, jsonb_array_elements(education) AS edu",
    )
    .fetch_all(&state.db)
    .await?;
    Ok(Json(filter_colleges(institutes.into_iter().flatten())))
}

/// GET /api/candidates/stats
pub async fn handle_stats(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<CandidateStats>, AppError> {
    user.require_staff()?;
    let rows: Vec<(String, i64)> =
        sqlx::query_as("SELECT status, COUNT(*) FROM candidates GROUP BY status")
            .fetch_all(&state.db)
            .await?;
    Ok(Json(tally(rows)))
}

/// GET /api/candidates/:id
pub async fn handle_get(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<CandidateDetail>, AppError> {
    user.require_staff()?;
    let candidate = repo::find_candidate(&state.db, id).await?;
    let rounds = repo::rounds_for(&state.db, id).await?;
    let current_round = current_round(&repo::round_states(&rounds)?);
    Ok(Json(CandidateDetail {
        candidate,
        rounds,
        current_round,
    }))
}

/// GET /api/candidates/:id/resume
pub async fn handle_resume(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    user.require_staff()?;
    let candidate = repo::find_candidate(&state.db, id).await?;
    let bytes = state.storage.get(&candidate.resume_url).await?;
    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("inline; filename=\"resume-{id}.pdf\""),
            ),
        ],
        bytes,
    )
        .into_response())
}

/// PATCH /api/candidates/:id
///
/// Profile edits. A `status` goes through the manual transition rules; the
/// offer, onboarding and internship states have their own endpoints.
pub async fn handle_update(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateCandidateRequest>,
) -> Result<Json<CandidateRow>, AppError> {
    user.require_staff()?;

    let email = req
        .email
        .as_deref()
        .map(normalize_email)
        .transpose()?;

    let mut tx = state.db.begin().await?;
    let candidate = repo::lock_candidate(&mut *tx, id).await?;
    let current = candidate.status()?;

    let next = match req.status {
        Some(to) if current.manual_transition(to)? => to,
        Some(_) | None => current,
    };
    let rejection_reason = if next == CandidateStatus::Rejected {
        req.rejection_reason.or(candidate.rejection_reason)
    } else {
        candidate.rejection_reason
    };

    let updated = sqlx::query_as::<_, CandidateRow>(
        r#"
        UPDATE candidates SET
            name = COALESCE($1, name),
            email = COALESCE($2, email),
            phone = COALESCE($3, phone),
            github_url = COALESCE($4, github_url),
            linkedin_url = COALESCE($5, linkedin_url),
            skills = COALESCE($6, skills),
            experience = COALESCE($7, experience),
            education = COALESCE($8, education),
            status = $9,
            rejection_reason = $10,
            updated_at = now()
        WHERE id = $11
        RETURNING *
        "#,
    )
    .bind(req.name)
    .bind(email)
    .bind(req.phone)
    .bind(req.github_url)
    .bind(req.linkedin_url)
    .bind(req.skills)
    .bind(req.experience)
    .bind(req.education.map(SqlJson))
    .bind(next.as_str())
    .bind(rejection_reason)
    .bind(id)
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;

    if next != current {
        info!("Candidate {id} moved {current} -> {next} by {}", user.email);
    }
    Ok(Json(updated))
}

/// DELETE /api/candidates/:id
pub async fn handle_delete(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    user.require_staff()?;
    let deleted: Option<Uuid> = sqlx::query_scalar("DELETE FROM candidates WHERE id = $1 RETURNING id")
        .bind(id)
        .fetch_optional(&state.db)
        .await?;
    if deleted.is_none() {
        return Err(AppError::NotFound("Candidate not found".to_string()));
    }
    info!("Candidate {id} deleted by {}", user.email);
    Ok(Json(json!({ "message": "Candidate deleted successfully" })))
}

/// POST /api/candidates/:id/rounds
pub async fn handle_add_round(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<AddRoundRequest>,
) -> Result<(StatusCode, Json<RoundResponse>), AppError> {
    user.require_staff()?;

    let mut tx = state.db.begin().await?;
    let candidate = repo::lock_candidate(&mut *tx, id).await?;
    let status = candidate.status()?;
    let next = plan_add_round(status)?;

    let name = req
        .name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| req.round_type.as_str().to_string());

    let round = sqlx::query_as::<_, RoundRow>(
        r#"
        INSERT INTO interview_rounds (id, candidate_id, position, round_type, name, interviewer, scheduled_at)
        VALUES (
            $1, $2,
            (SELECT COALESCE(MAX(position), 0) + 1 FROM interview_rounds WHERE candidate_id = $2),
            $3, $4, $5, $6
        )
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(id)
    .bind(req.round_type.as_str())
    .bind(name)
    .bind(req.interviewer)
    .bind(req.scheduled_at)
    .fetch_one(&mut *tx)
    .await?;

    if next != status {
        repo::transition(&mut *tx, id, status, next).await?;
    }
    tx.commit().await?;

    info!(
        "Round {} '{}' added to candidate {id} by {}",
        round.position, round.name, user.email
    );
    Ok((
        StatusCode::CREATED,
        Json(RoundResponse {
            round,
            candidate_status: next,
        }),
    ))
}

/// PATCH /api/candidates/:id/rounds/:round_id
pub async fn handle_evaluate_round(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, round_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<EvaluateRoundRequest>,
) -> Result<Json<RoundResponse>, AppError> {
    user.require_staff()?;

    let evaluation = Evaluation {
        status: req.status,
        score: req.score,
        feedback: req.feedback.trim().to_string(),
    };
    evaluation.validate()?;

    let mut tx = state.db.begin().await?;
    let candidate = repo::lock_candidate(&mut *tx, id).await?;
    let status = candidate.status()?;
    let rounds = repo::rounds_for(&mut *tx, id).await?;
    check_can_evaluate(status, &repo::round_states(&rounds)?, round_id)?;

    let round = sqlx::query_as::<_, RoundRow>(
        r#"
        UPDATE interview_rounds
        SET status = $1, score = $2, feedback = $3, evaluated_at = now()
        WHERE id = $4 AND candidate_id = $5
        RETURNING *
        "#,
    )
    .bind(evaluation.status.as_str())
    .bind(evaluation.score)
    .bind(&evaluation.feedback)
    .bind(round_id)
    .bind(id)
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;

    info!(
        "Round {} of candidate {id} evaluated {} ({}) by {}",
        round.position, round.status, evaluation.score, user.email
    );
    Ok(Json(RoundResponse {
        round,
        candidate_status: status,
    }))
}

/// POST /api/candidates/:id/chat
pub async fn handle_chat(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    user.require_staff()?;

    if req.message.trim().is_empty() {
        return Err(AppError::Validation("Message is required".to_string()));
    }

    let candidate = repo::find_candidate(&state.db, id).await?;
    let system = hiring_assistant_system(&candidate.full_raw_text);

    let response = state
        .llm
        .chat(&system, &req.history, &req.message, CHAT_MAX_TOKENS)
        .await
        .map_err(|e| AppError::Llm(format!("Candidate chat failed: {e}")))?;

    Ok(Json(ChatResponse { response }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn file(name: &str, content_type: Option<&str>, bytes: &'static [u8]) -> UploadedFile {
        UploadedFile {
            filename: name.into(),
            content_type: content_type.map(str::to_string),
            bytes: Bytes::from_static(bytes),
        }
    }

    #[test]
    fn test_pdf_detection() {
        assert!(looks_like_pdf(&file("cv.bin", None, b"%PDF-1.7")));
        assert!(looks_like_pdf(&file("cv.PDF", None, b"xx")));
        assert!(looks_like_pdf(&file("cv", Some("application/pdf"), b"xx")));
        assert!(!looks_like_pdf(&file("cv.docx", Some("application/msword"), b"PK")));
    }

    #[test]
    fn test_staged_candidate_defaults() {
        let parsed = ParsedResume {
            name: None,
            email: Some("a@b.io".into()),
            phone: None,
            linkedin_url: None,
            github_url: None,
            skills: vec!["Rust".into()],
            experience: "Experience details in resume".into(),
            education: vec![],
            confidence: 0.85,
            raw_text: "text".into(),
        };
        let staged = StagedCandidate::new(parsed, "resumes/x.pdf".into(), "cv.pdf".into());
        assert_eq!(staged.name, "Unknown Candidate");
        assert_eq!(staged.phone, "");
        assert_eq!(staged.status, CandidateStatus::Assessment);
        assert_eq!(staged.parsing_status, "success");
    }

    #[test]
    fn test_add_round_body_uses_type_key() {
        let req: AddRoundRequest =
            serde_json::from_str(r#"{"type":"GD","interviewer":"Asha"}"#).unwrap();
        assert_eq!(req.round_type, RoundType::GroupDiscussion);
        assert!(req.name.is_none());
    }

    #[test]
    fn test_update_request_status_wire_name() {
        let req: UpdateCandidateRequest =
            serde_json::from_str(r#"{"status":"Rejected","rejection_reason":"No show"}"#).unwrap();
        assert_eq!(req.status, Some(CandidateStatus::Rejected));
    }
}
