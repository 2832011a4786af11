use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use crate::errors::AppError;
use crate::pipeline::{CandidateStatus, RoundStatus};

/// One education entry as parsed from a resume or edited by a manager.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Education {
    #[serde(default)]
    pub institute: String,
    #[serde(default)]
    pub degree: String,
    #[serde(default)]
    pub year: String,
    /// Percentage (`"85%"`) or CGPA (`"8.7"`) as written on the resume.
    #[serde(default)]
    pub cgpa: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CandidateRow {
    pub id: Uuid,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub github_url: Option<String>,
    pub linkedin_url: Option<String>,
    pub skills: Vec<String>,
    pub experience: Option<String>,
    pub education: Json<Vec<Education>>,
    pub resume_url: String,
    pub status: String,
    pub rejection_reason: Option<String>,
    pub parsing_confidence: f64,
    pub parsing_status: String,
    pub full_raw_text: String,
    pub offer_sent_at: Option<DateTime<Utc>>,
    pub internship_start_date: Option<DateTime<Utc>>,
    pub jira_account_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CandidateRow {
    pub fn status(&self) -> Result<CandidateStatus, AppError> {
        self.status.parse()
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("Candidate")
    }

    pub fn require_email(&self) -> Result<&str, AppError> {
        self.email
            .as_deref()
            .filter(|e| !e.is_empty())
            .ok_or_else(|| AppError::Validation("Candidate has no email".to_string()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RoundRow {
    pub id: Uuid,
    pub candidate_id: Uuid,
    pub position: i32,
    pub round_type: String,
    pub name: String,
    pub interviewer: Option<String>,
    pub status: String,
    pub score: Option<i32>,
    pub feedback: Option<String>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub evaluated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl RoundRow {
    pub fn status(&self) -> Result<RoundStatus, AppError> {
        self.status.parse()
    }
}

/// Candidate together with its interview rounds in position order.
#[derive(Debug, Serialize)]
pub struct CandidateDetail {
    #[serde(flatten)]
    pub candidate: CandidateRow,
    pub rounds: Vec<RoundRow>,
    /// First round still awaiting evaluation.
    pub current_round: Option<Uuid>,
}
