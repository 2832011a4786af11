use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::candidates::repo;
use crate::errors::AppError;
use crate::mailer::{MailAttachment, OutgoingMail};
use crate::models::candidate::CandidateRow;
use crate::offers::template::{OfferLetter, OfferTerms, DEFAULT_EXPIRY_DATE};
use crate::pipeline::CandidateStatus;
use crate::state::AppState;

const OFFER_SUBJECT: &str = "Offer of Employment";
const OFFER_ATTACHMENT: &str = "OfferLetter.pdf";

#[derive(Debug, Deserialize)]
pub struct PreviewOfferRequest {
    pub candidate_name: Option<String>,
    pub position: Option<String>,
    pub offer_date: Option<String>,
    pub joining_date: Option<String>,
    pub expiry_date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SendOfferRequest {
    pub candidate_id: Uuid,
    pub position: Option<String>,
    pub offer_date: Option<String>,
    pub joining_date: Option<String>,
    pub expiry_date: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SendOfferResponse {
    pub message: String,
    pub candidate: CandidateRow,
}

fn offer_email_body(letter: &OfferLetter) -> String {
    format!(
        "Dear {},\n\nCongratulations! We are pleased to offer you the position of {}.\n\n\
         Please find the attached offer letter. Kindly sign and reply to this email by {}.\n\n\
         Best Regards,\nHR Team",
        letter.candidate_name,
        letter.position,
        if letter.expiry_date == DEFAULT_EXPIRY_DATE {
            "the earliest".to_string()
        } else {
            letter.expiry_date.clone()
        }
    )
}

/// POST /api/offers/preview
pub async fn handle_preview(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<PreviewOfferRequest>,
) -> Result<Response, AppError> {
    user.require_staff()?;

    let name = req
        .candidate_name
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| AppError::Validation("Candidate Name is required".to_string()))?;

    let letter = OfferLetter::new(
        &name,
        OfferTerms {
            position: req.position,
            offer_date: req.offer_date,
            joining_date: req.joining_date,
            expiry_date: req.expiry_date,
        },
        Utc::now().date_naive(),
    );
    let pdf = state.offers.render_pdf(&letter).await?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("inline; filename=\"{}\"", letter.pdf_filename()),
            ),
        ],
        pdf,
    )
        .into_response())
}

/// POST /api/offers/send
///
/// Renders the letter, emails it, and only then moves the candidate to
/// `Offer`. A mail failure leaves the status untouched.
pub async fn handle_send(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<SendOfferRequest>,
) -> Result<Json<SendOfferResponse>, AppError> {
    user.require_staff()?;

    let candidate = repo::find_candidate(&state.db, req.candidate_id).await?;
    let status = candidate.status()?;
    status.check_can_send_offer()?;
    let email = candidate.require_email()?.to_string();

    let letter = OfferLetter::new(
        candidate.display_name(),
        OfferTerms {
            position: req.position,
            offer_date: req.offer_date,
            joining_date: req.joining_date,
            expiry_date: req.expiry_date,
        },
        Utc::now().date_naive(),
    );
    let pdf = state.offers.render_pdf(&letter).await?;

    state
        .mailer
        .send(OutgoingMail {
            to: email.clone(),
            subject: OFFER_SUBJECT.to_string(),
            text: offer_email_body(&letter),
            attachment: Some(MailAttachment {
                filename: OFFER_ATTACHMENT.to_string(),
                content_type: "application/pdf".to_string(),
                bytes: pdf,
            }),
        })
        .await?;

    let updated = sqlx::query_as::<_, CandidateRow>(
        "UPDATE candidates SET status = $1, offer_sent_at = now(), updated_at = now() \
         WHERE id = $2 AND status = $3 RETURNING *",
    )
    .bind(CandidateStatus::Offer.as_str())
    .bind(candidate.id)
    .bind(status.as_str())
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| {
        AppError::Conflict("Candidate status changed while the offer was being sent".to_string())
    })?;

    info!(
        "Offer sent to {email} by {}; candidate {} moved {status} -> Offer",
        user.email, candidate.id
    );

    Ok(Json(SendOfferResponse {
        message: "Offer sent successfully".to_string(),
        candidate: updated,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_email_body_mentions_expiry() {
        let letter = OfferLetter::new(
            "Jane Doe",
            OfferTerms {
                expiry_date: Some("March 15, 2026".into()),
                ..Default::default()
            },
            NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
        );
        let body = offer_email_body(&letter);
        assert!(body.starts_with("Dear Jane Doe,"));
        assert!(body.contains("by March 15, 2026."));
    }

    #[test]
    fn test_email_body_without_expiry() {
        let letter = OfferLetter::new(
            "Jane Doe",
            OfferTerms::default(),
            NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
        );
        assert!(offer_email_body(&letter).contains("by the earliest."));
    }
}
