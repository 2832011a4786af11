use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

/// Delivery metrics recorded alongside a weekly review.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JiraMetrics {
    #[serde(default)]
    pub velocity: f64,
    #[serde(default)]
    pub tickets_closed: i32,
    #[serde(default)]
    pub bug_rate: f64,
    #[serde(default)]
    pub cycle_time: f64,
    #[serde(default)]
    pub focus_factor: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ReviewRow {
    pub id: Uuid,
    pub candidate_id: Uuid,
    pub week_number: i32,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub jira_metrics: Json<JiraMetrics>,
    pub score: Option<i16>,
    pub feedback: Option<String>,
    /// Manager-only; stripped from the intern's view.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub internal_notes: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JiraTicket {
    pub key: String,
    pub summary: String,
    pub status: String,
    pub story_points: Option<f64>,
    pub priority: Option<String>,
    pub created: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
    pub resolution_date: Option<DateTime<Utc>>,
    pub link: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JiraSnapshotRow {
    pub candidate_id: Uuid,
    pub last_sync_at: DateTime<Utc>,
    pub total_tickets: i32,
    pub active_tickets: i32,
    pub completed_tickets: i32,
    pub tickets: Json<Vec<JiraTicket>>,
}
