use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    #[default]
    Link,
    File,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    #[serde(rename = "type", default)]
    pub kind: ResourceKind,
    pub label: String,
    pub url: String,
}

pub const TRAINING_ASSIGNED: &str = "Assigned";
pub const TRAINING_COMPLETED: &str = "Completed";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TrainingRow {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub resources: Json<Vec<Resource>>,
    pub assigned_by: Uuid,
    pub assigned_to: Uuid,
    pub status: String,
    pub assigned_date: DateTime<Utc>,
    pub due_date: Option<DateTime<Utc>>,
    pub completion_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Training joined with a summary of its assignee, for the manager overview.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TrainingWithAssignee {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub training: TrainingRow,
    pub assignee_name: Option<String>,
    pub assignee_email: Option<String>,
    pub assignee_status: String,
}
