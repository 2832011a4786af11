use axum::{
    extract::{Multipart, Path, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::password::{hash_password, temporary_password};
use crate::auth::AuthUser;
use crate::boarding::{documents_for, gate_for, onboarding_email_body, DEFAULT_REJECTION_REASON};
use crate::candidates::repo;
use crate::errors::AppError;
use crate::mailer::OutgoingMail;
use crate::models::candidate::CandidateRow;
use crate::models::document::DocumentRow;
use crate::models::user::{Role, UserRow};
use crate::pipeline::{CandidateStatus, DocumentStatus, DocumentType};
use crate::state::AppState;
use crate::storage::{content_type_for, inline_disposition, object_key};
use crate::uploads::read_form;

const ONBOARDING_SUBJECT: &str = "Welcome to Onboarding";

#[derive(Debug, Deserialize)]
pub struct EnableOnboardingRequest {
    pub candidate_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
    pub status: CandidateStatus,
}

#[derive(Debug, Serialize)]
pub struct OnboardingProfile {
    pub id: Uuid,
    pub name: Option<String>,
    pub email: Option<String>,
    pub status: CandidateStatus,
    pub joining_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct OnboardingStatusResponse {
    pub candidate: OnboardingProfile,
    pub documents: Vec<DocumentRow>,
    pub outstanding: Vec<DocumentType>,
}

#[derive(Debug, Serialize)]
pub struct DocumentResponse {
    pub document: DocumentRow,
    pub candidate_status: CandidateStatus,
}

#[derive(Debug, Deserialize)]
pub struct VerifyDocumentRequest {
    pub status: DocumentStatus,
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CandidateDocumentsResponse {
    pub documents: Vec<DocumentRow>,
    pub outstanding: Vec<DocumentType>,
}

/// POST /api/boarding/enable
///
/// Creates the intern login (or resets an existing intern's password), moves
/// the candidate to `Onboarding` and emails the temporary credentials.
pub async fn handle_enable(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<EnableOnboardingRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    user.require_staff()?;

    let temp_password = temporary_password();
    let hash = hash_password(temp_password.clone()).await?;

    let mut tx = state.db.begin().await?;
    let candidate = repo::lock_candidate(&mut *tx, req.candidate_id).await?;
    let status = candidate.status()?;
    status.check_can_enable_onboarding()?;
    let email = candidate.require_email()?.trim().to_lowercase();

    let account = sqlx::query_as::<_, UserRow>(
        r#"
        INSERT INTO users (id, email, password_hash, role)
        VALUES ($1, $2, $3, 'intern')
        ON CONFLICT (email) DO UPDATE SET password_hash = EXCLUDED.password_hash
        WHERE users.role = 'intern'
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&email)
    .bind(&hash)
    .fetch_optional(&mut *tx)
    .await?;

    if account.is_none() {
        return Err(AppError::Validation(
            "User account exists but is not an intern".to_string(),
        ));
    }

    if status != CandidateStatus::Onboarding {
        repo::transition(&mut *tx, candidate.id, status, CandidateStatus::Onboarding).await?;
    } else {
        info!("Re-issuing onboarding credentials for {email}");
    }
    tx.commit().await?;

    state
        .mailer
        .send(OutgoingMail {
            to: email.clone(),
            subject: ONBOARDING_SUBJECT.to_string(),
            text: onboarding_email_body(
                candidate.display_name(),
                &state.config.portal_url,
                &email,
                &temp_password,
            ),
            attachment: None,
        })
        .await?;

    info!("Onboarding enabled for candidate {} by {}", candidate.id, user.email);
    Ok(Json(MessageResponse {
        message: "Onboarding enabled and email sent".to_string(),
        status: CandidateStatus::Onboarding,
    }))
}

async fn candidate_for_caller(state: &AppState, user: &AuthUser) -> Result<CandidateRow, AppError> {
    repo::find_by_email(&state.db, &user.email)
        .await?
        .ok_or_else(|| AppError::NotFound("Candidate profile not found".to_string()))
}

fn ensure_accepts_uploads(candidate: &CandidateRow) -> Result<(), AppError> {
    if candidate.status()?.accepts_document_uploads() {
        Ok(())
    } else {
        Err(AppError::Validation(
            "Documents can only be uploaded while onboarding".to_string(),
        ))
    }
}

/// Storage key for a new document, issued only while the locked candidate
/// still accepts uploads. Nothing reaches storage for a candidate that moved on.
fn upload_key(candidate: &CandidateRow, file_name: &str) -> Result<String, AppError> {
    ensure_accepts_uploads(candidate)?;
    Ok(object_key(&format!("documents/{}", candidate.id), file_name))
}

/// GET /api/boarding/status
///
/// Also repairs a `Ready to Join` status whose documents no longer all verify.
pub async fn handle_status(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<OnboardingStatusResponse>, AppError> {
    let mut candidate = candidate_for_caller(&state, &user).await?;
    let documents = documents_for(&state.db, candidate.id).await?;
    let gate = gate_for(&documents)?;
    let mut status = candidate.status()?;

    if let Some(healed) = gate.healed_status(status) {
        warn!(
            "Reverting candidate {} from {status} to {healed}: outstanding {:?}",
            candidate.id,
            gate.outstanding()
        );
        if let Some(row) = repo::transition(&state.db, candidate.id, status, healed).await? {
            candidate = row;
            status = healed;
        }
    }

    Ok(Json(OnboardingStatusResponse {
        candidate: OnboardingProfile {
            id: candidate.id,
            name: candidate.name,
            email: candidate.email,
            status,
            joining_date: candidate.internship_start_date,
        },
        outstanding: gate.outstanding(),
        documents,
    }))
}

/// POST /api/boarding/upload
///
/// Multipart `file` plus `type`. One record per document type: a re-upload
/// replaces the previous file and sends it back to `pending`.
pub async fn handle_upload(
    State(state): State<AppState>,
    user: AuthUser,
    multipart: Multipart,
) -> Result<Json<DocumentResponse>, AppError> {
    user.require_role(&[Role::Intern])?;

    let (file, fields) = read_form(multipart, "file").await?.require_file("file")?;
    let doc_type: DocumentType = fields
        .get("type")
        .ok_or_else(|| AppError::Validation("Document type is required".to_string()))?
        .parse()?;

    let candidate = candidate_for_caller(&state, &user).await?;
    ensure_accepts_uploads(&candidate)?;

    let mut tx = state.db.begin().await?;
    let candidate = repo::lock_candidate(&mut *tx, candidate.id).await?;
    let key = upload_key(&candidate, &file.filename)?;
    state
        .storage
        .put(&key, file.bytes, content_type_for(&file.filename))
        .await?;
    let document = sqlx::query_as::<_, DocumentRow>(
        r#"
        INSERT INTO candidate_documents
            (id, candidate_id, doc_type, storage_key, original_name, status, rejection_reason)
        VALUES ($1, $2, $3, $4, $5, 'pending', '')
        ON CONFLICT (candidate_id, doc_type) DO UPDATE SET
            storage_key = EXCLUDED.storage_key,
            original_name = EXCLUDED.original_name,
            status = 'pending',
            rejection_reason = '',
            uploaded_at = now(),
            verified_at = NULL
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(candidate.id)
    .bind(doc_type.as_str())
    .bind(&key)
    .bind(&file.filename)
    .fetch_one(&mut *tx)
    .await?;

    let mut status = candidate.status()?;
    let gate = gate_for(&documents_for(&mut *tx, candidate.id).await?)?;
    if let Some(healed) = gate.healed_status(status) {
        warn!(
            "Candidate {} re-uploaded {doc_type}; reverting {status} -> {healed}",
            candidate.id
        );
        repo::transition(&mut *tx, candidate.id, status, healed).await?;
        status = healed;
    }
    tx.commit().await?;

    info!("Candidate {} uploaded {doc_type} as {key}", candidate.id);
    Ok(Json(DocumentResponse {
        document,
        candidate_status: status,
    }))
}

/// PATCH /api/boarding/verify/:document_id
///
/// Locks the candidate, writes the document decision, then re-evaluates the
/// whole document set in the same transaction. Concurrent verifications of
/// sibling documents serialize on the candidate row and cannot both miss the
/// gate.
pub async fn handle_verify(
    State(state): State<AppState>,
    user: AuthUser,
    Path(document_id): Path<Uuid>,
    Json(req): Json<VerifyDocumentRequest>,
) -> Result<Json<DocumentResponse>, AppError> {
    user.require_staff()?;

    let reason = match req.status {
        DocumentStatus::Verified => String::new(),
        DocumentStatus::Rejected => req
            .reason
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| DEFAULT_REJECTION_REASON.to_string()),
        DocumentStatus::Pending => {
            return Err(AppError::Validation(
                "Status must be verified or rejected".to_string(),
            ))
        }
    };

    let mut tx = state.db.begin().await?;
    let candidate_id: Uuid =
        sqlx::query_scalar("SELECT candidate_id FROM candidate_documents WHERE id = $1")
            .bind(document_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound("Document not found".to_string()))?;
    let candidate = repo::lock_candidate(&mut *tx, candidate_id).await?;

    let document = sqlx::query_as::<_, DocumentRow>(
        r#"
        UPDATE candidate_documents
        SET status = $1,
            rejection_reason = $2,
            verified_at = CASE WHEN $1 = 'verified' THEN now() ELSE NULL END
        WHERE id = $3
        RETURNING *
        "#,
    )
    .bind(req.status.as_str())
    .bind(&reason)
    .bind(document_id)
    .fetch_one(&mut *tx)
    .await?;

    let gate = gate_for(&documents_for(&mut *tx, candidate.id).await?)?;
    let mut status = candidate.status()?;

    info!(
        "Document {} ({}) marked {} by {}; outstanding {:?}",
        document.id,
        document.doc_type,
        document.status,
        user.email,
        gate.outstanding()
    );

    let next = gate
        .status_after_verification(status)
        .or_else(|| gate.healed_status(status));
    if let Some(next) = next {
        repo::transition(&mut *tx, candidate.id, status, next).await?;
        status = next;
    }
    tx.commit().await?;

    Ok(Json(DocumentResponse {
        document,
        candidate_status: status,
    }))
}

/// GET /api/boarding/candidate/:candidate_id
pub async fn handle_candidate_documents(
    State(state): State<AppState>,
    user: AuthUser,
    Path(candidate_id): Path<Uuid>,
) -> Result<Json<CandidateDocumentsResponse>, AppError> {
    user.require_staff()?;
    repo::find_candidate(&state.db, candidate_id).await?;

    let documents = documents_for(&state.db, candidate_id).await?;
    let outstanding = gate_for(&documents)?.outstanding();
    Ok(Json(CandidateDocumentsResponse {
        documents,
        outstanding,
    }))
}

/// GET /api/boarding/file/:document_id
pub async fn handle_file(
    State(state): State<AppState>,
    user: AuthUser,
    Path(document_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let document =
        sqlx::query_as::<_, DocumentRow>("SELECT * FROM candidate_documents WHERE id = $1")
            .bind(document_id)
            .fetch_optional(&state.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Document record not found".to_string()))?;

    if !user.role.is_staff() {
        let own = candidate_for_caller(&state, &user).await?;
        if own.id != document.candidate_id {
            return Err(AppError::Forbidden(
                "You can only view your own documents".to_string(),
            ));
        }
    }

    let bytes = state.storage.get(&document.storage_key).await?;
    Ok((
        [
            (
                header::CONTENT_TYPE,
                content_type_for(&document.original_name).to_string(),
            ),
            (
                header::CONTENT_DISPOSITION,
                inline_disposition(&document.original_name),
            ),
        ],
        bytes,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::types::Json as SqlJson;

    fn candidate(status: CandidateStatus) -> CandidateRow {
        let now = Utc::now();
        CandidateRow {
            id: Uuid::new_v4(),
            name: Some("Asha Rao".into()),
            email: Some("asha@example.com".into()),
            phone: None,
            github_url: None,
            linkedin_url: None,
            skills: vec![],
            experience: None,
            education: SqlJson(vec![]),
            resume_url: String::new(),
            status: status.to_string(),
            rejection_reason: None,
            parsing_confidence: 0.0,
            parsing_status: "success".into(),
            full_raw_text: String::new(),
            offer_sent_at: None,
            internship_start_date: None,
            jira_account_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_upload_key_under_candidate_prefix() {
        let c = candidate(CandidateStatus::Onboarding);
        let key = upload_key(&c, "Aadhaar Card.PDF").unwrap();
        assert!(key.starts_with(&format!("documents/{}/", c.id)));
        assert!(key.ends_with(".pdf"));
        assert!(upload_key(&candidate(CandidateStatus::ReadyToJoin), "pan.png").is_ok());
    }

    #[test]
    fn test_no_upload_key_once_candidate_left_onboarding() {
        for status in [CandidateStatus::Active, CandidateStatus::Rejected, CandidateStatus::Offer] {
            let err = upload_key(&candidate(status), "pan.png").unwrap_err();
            assert!(matches!(err, AppError::Validation(_)));
        }
    }
}
