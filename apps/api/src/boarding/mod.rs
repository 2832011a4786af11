//! Onboarding: portal credentials for selected candidates, document uploads
//! and HR verification, and the gate that moves candidates to `Ready to Join`.

pub mod handlers;

use sqlx::PgExecutor;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::document::DocumentRow;
use crate::pipeline::DocumentGate;

pub const DEFAULT_REJECTION_REASON: &str = "Document rejected by HR";

pub async fn documents_for<'e>(
    executor: impl PgExecutor<'e>,
    candidate_id: Uuid,
) -> Result<Vec<DocumentRow>, AppError> {
    let docs = sqlx::query_as::<_, DocumentRow>(
        "SELECT * FROM candidate_documents WHERE candidate_id = $1 ORDER BY uploaded_at",
    )
    .bind(candidate_id)
    .fetch_all(executor)
    .await?;
    Ok(docs)
}

pub fn gate_for(docs: &[DocumentRow]) -> Result<DocumentGate, AppError> {
    let entries = docs
        .iter()
        .map(DocumentRow::gate_entry)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(DocumentGate::new(entries))
}

/// Body of the email carrying the portal login.
pub fn onboarding_email_body(name: &str, portal_url: &str, email: &str, password: &str) -> String {
    format!(
        "Dear {name},\n\nYour offer has been accepted! Please log in to the Onboarding Portal \
         to complete your documentation.\n\nURL: {portal_url}\nEmail: {email}\nPassword: {password}\n\n\
         Please upload your documents immediately.\n\nRegards,\nHR Team"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn doc(doc_type: &str, status: &str) -> DocumentRow {
        DocumentRow {
            id: Uuid::new_v4(),
            candidate_id: Uuid::nil(),
            doc_type: doc_type.into(),
            storage_key: "documents/x/y.pdf".into(),
            original_name: "y.pdf".into(),
            status: status.into(),
            rejection_reason: String::new(),
            uploaded_at: Utc::now(),
            verified_at: None,
        }
    }

    #[test]
    fn test_gate_from_rows() {
        let docs = vec![
            doc("offer_letter", "verified"),
            doc("aadhar", "verified"),
            doc("pan", "verified"),
            doc("certificate", "pending"),
        ];
        let gate = gate_for(&docs).unwrap();
        assert!(!gate.all_required_verified());
        assert_eq!(gate.outstanding().len(), 1);
    }

    #[test]
    fn test_corrupt_row_is_an_error() {
        assert!(gate_for(&[doc("passport", "verified")]).is_err());
    }

    #[test]
    fn test_email_body_has_credentials() {
        let body = onboarding_email_body(
            "Jane",
            "http://portal/login",
            "jane@example.com",
            "Tmp12345",
        );
        assert!(body.contains("URL: http://portal/login"));
        assert!(body.contains("Email: jane@example.com"));
        assert!(body.contains("Password: Tmp12345"));
    }
}
