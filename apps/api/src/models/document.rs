use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::errors::AppError;
use crate::pipeline::{DocumentStatus, DocumentType};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DocumentRow {
    pub id: Uuid,
    pub candidate_id: Uuid,
    pub doc_type: String,
    pub storage_key: String,
    pub original_name: String,
    pub status: String,
    pub rejection_reason: String,
    pub uploaded_at: DateTime<Utc>,
    pub verified_at: Option<DateTime<Utc>>,
}

impl DocumentRow {
    pub fn gate_entry(&self) -> Result<(DocumentType, DocumentStatus), AppError> {
        Ok((self.doc_type.parse()?, self.status.parse()?))
    }
}
