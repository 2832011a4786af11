use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json as SqlJson;
use sqlx::FromRow;
use tracing::{error, info};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::candidates::repo;
use crate::errors::AppError;
use crate::models::candidate::CandidateRow;
use crate::models::notification::NotificationKind;
use crate::models::performance::{JiraMetrics, JiraSnapshotRow, ReviewRow};
use crate::models::user::Role;
use crate::notifications::{notify, user_for_candidate, Notice};
use crate::performance::{
    training_progress, week_bounds, week_number, MAX_REVIEW_SCORE, MIN_REVIEW_SCORE,
};
use crate::pipeline::CandidateStatus;
use crate::state::AppState;

const REVIEW_SUBMITTED: &str = "Submitted";

#[derive(Debug, Deserialize)]
pub struct StartInternshipRequest {
    pub candidate_id: Uuid,
    #[serde(alias = "jira_email")]
    pub jira_account_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StartInternshipResponse {
    pub message: String,
    pub candidate: CandidateRow,
}

#[derive(Debug, FromRow)]
struct DashboardRow {
    id: Uuid,
    name: Option<String>,
    email: Option<String>,
    status: String,
    jira_account_id: Option<String>,
    internship_start_date: Option<DateTime<Utc>>,
    velocity: i32,
    last_score: Option<i16>,
    trainings_total: i64,
    trainings_completed: i64,
}

#[derive(Debug, Serialize)]
pub struct DashboardIntern {
    pub id: Uuid,
    pub name: Option<String>,
    pub email: Option<String>,
    pub status: String,
    pub jira_account_id: Option<String>,
    pub internship_start_date: Option<DateTime<Utc>>,
    /// Tickets currently in progress.
    pub velocity: i32,
    pub last_score: Option<i16>,
    pub training_progress: i64,
}

impl From<DashboardRow> for DashboardIntern {
    fn from(row: DashboardRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            email: row.email,
            status: row.status,
            jira_account_id: row.jira_account_id,
            internship_start_date: row.internship_start_date,
            velocity: row.velocity,
            last_score: row.last_score,
            training_progress: training_progress(row.trainings_completed, row.trainings_total),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub interns: Vec<DashboardIntern>,
}

#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    pub candidate_id: Uuid,
    pub score: i16,
    pub feedback: Option<String>,
    pub internal_notes: Option<String>,
    pub jira_metrics: Option<JiraMetrics>,
}

impl ReviewRequest {
    fn validate(&self) -> Result<(), AppError> {
        if !(MIN_REVIEW_SCORE..=MAX_REVIEW_SCORE).contains(&self.score) {
            return Err(AppError::Validation(format!(
                "Score must be between {MIN_REVIEW_SCORE} and {MAX_REVIEW_SCORE}"
            )));
        }
        Ok(())
    }
}

#[derive(Debug, FromRow)]
struct UpsertedReview {
    #[sqlx(flatten)]
    review: ReviewRow,
    inserted: bool,
}

#[derive(Debug, Serialize)]
pub struct ReviewResponse {
    pub week: i32,
    pub review: ReviewRow,
}

#[derive(Debug, Serialize)]
pub struct ReviewList {
    pub count: usize,
    pub reviews: Vec<ReviewRow>,
}

/// POST /api/performance/start-internship
pub async fn handle_start_internship(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<StartInternshipRequest>,
) -> Result<Json<StartInternshipResponse>, AppError> {
    user.require_staff()?;

    let jira_account = req
        .jira_account_id
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty());

    let mut tx = state.db.begin().await?;
    let candidate = repo::lock_candidate(&mut *tx, req.candidate_id).await?;
    candidate.status()?.check_can_start_internship()?;

    let candidate = sqlx::query_as::<_, CandidateRow>(
        r#"
        UPDATE candidates SET
            status = $1,
            internship_start_date = now(),
            jira_account_id = COALESCE($2, jira_account_id),
            updated_at = now()
        WHERE id = $3
        RETURNING *
        "#,
    )
    .bind(CandidateStatus::Active.as_str())
    .bind(jira_account)
    .bind(req.candidate_id)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query(
        "INSERT INTO jira_snapshots (candidate_id) VALUES ($1) ON CONFLICT (candidate_id) DO NOTHING",
    )
    .bind(req.candidate_id)
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;

    info!(
        "Internship started for candidate {} by {}",
        req.candidate_id, user.email
    );
    Ok(Json(StartInternshipResponse {
        message: "Internship activated".to_string(),
        candidate,
    }))
}

/// GET /api/performance/dashboard
pub async fn handle_dashboard(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<DashboardResponse>, AppError> {
    user.require_staff()?;

    let rows = sqlx::query_as::<_, DashboardRow>(
        r#"
        SELECT
            c.id, c.name, c.email, c.status, c.jira_account_id, c.internship_start_date,
            COALESCE(s.active_tickets, 0) AS velocity,
            (SELECT r.score FROM performance_reviews r
             WHERE r.candidate_id = c.id ORDER BY r.week_number DESC LIMIT 1) AS last_score,
            (SELECT COUNT(*) FROM trainings t WHERE t.assigned_to = c.id) AS trainings_total,
            (SELECT COUNT(*) FROM trainings t
             WHERE t.assigned_to = c.id AND t.status = 'Completed') AS trainings_completed
        FROM candidates c
        LEFT JOIN jira_snapshots s ON s.candidate_id = c.id
        WHERE c.status = $1
        ORDER BY c.internship_start_date DESC NULLS LAST
        "#,
    )
    .bind(CandidateStatus::Active.as_str())
    .fetch_all(&state.db)
    .await?;

    Ok(Json(DashboardResponse {
        interns: rows.into_iter().map(DashboardIntern::from).collect(),
    }))
}

/// POST /api/performance/review
///
/// One review per internship week; submitting again in the same week
/// overwrites it.
pub async fn handle_review(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<ReviewRequest>,
) -> Result<Json<ReviewResponse>, AppError> {
    user.require_staff()?;
    req.validate()?;

    let candidate = repo::find_candidate(&state.db, req.candidate_id).await?;
    let started = match (candidate.status()?, candidate.internship_start_date) {
        (CandidateStatus::Active, Some(start)) => start,
        _ => return Err(AppError::Validation("Internship is not active".to_string())),
    };

    let week = week_number(started, Utc::now());
    let (week_start, week_end) = week_bounds(started, week);

    let mut tx = state.db.begin().await?;
    let upserted = sqlx::query_as::<_, UpsertedReview>(
        r#"
        INSERT INTO performance_reviews
            (id, candidate_id, week_number, start_date, end_date, jira_metrics,
             score, feedback, internal_notes, status)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        ON CONFLICT (candidate_id, week_number) DO UPDATE SET
            jira_metrics = EXCLUDED.jira_metrics,
            score = EXCLUDED.score,
            feedback = EXCLUDED.feedback,
            internal_notes = EXCLUDED.internal_notes,
            status = EXCLUDED.status,
            updated_at = now()
        RETURNING *, (xmax = 0) AS inserted
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(req.candidate_id)
    .bind(week)
    .bind(week_start)
    .bind(week_end)
    .bind(SqlJson(req.jira_metrics.unwrap_or_default()))
    .bind(req.score)
    .bind(req.feedback)
    .bind(req.internal_notes)
    .bind(REVIEW_SUBMITTED)
    .fetch_one(&mut *tx)
    .await?;

    if let Some(recipient) = user_for_candidate(&mut *tx, req.candidate_id).await? {
        let verb = if upserted.inserted { "submitted" } else { "updated" };
        notify(
            &mut *tx,
            recipient,
            Notice::new(
                NotificationKind::Success,
                format!("Your performance review for Week {week} has been {verb}."),
            )
            .link("/my-performance"),
        )
        .await?;
    }
    tx.commit().await?;

    info!(
        "Week {week} review for candidate {} saved by {}",
        req.candidate_id, user.email
    );
    Ok(Json(ReviewResponse {
        week,
        review: upserted.review,
    }))
}

/// GET /api/performance/reviews/:candidate_id
pub async fn handle_candidate_reviews(
    State(state): State<AppState>,
    user: AuthUser,
    Path(candidate_id): Path<Uuid>,
) -> Result<Json<ReviewList>, AppError> {
    user.require_staff()?;
    let reviews = reviews_for(&state, candidate_id).await?;
    Ok(Json(ReviewList {
        count: reviews.len(),
        reviews,
    }))
}

/// GET /api/performance/my-reviews
pub async fn handle_my_reviews(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<ReviewList>, AppError> {
    let candidate = repo::find_by_email(&state.db, &user.email)
        .await?
        .ok_or_else(|| AppError::NotFound("Candidate not found".to_string()))?;

    let reviews: Vec<ReviewRow> = reviews_for(&state, candidate.id)
        .await?
        .into_iter()
        .map(|mut r| {
            r.internal_notes = None;
            r
        })
        .collect();
    Ok(Json(ReviewList {
        count: reviews.len(),
        reviews,
    }))
}

async fn reviews_for(state: &AppState, candidate_id: Uuid) -> Result<Vec<ReviewRow>, AppError> {
    let reviews = sqlx::query_as::<_, ReviewRow>(
        "SELECT * FROM performance_reviews WHERE candidate_id = $1 ORDER BY week_number DESC",
    )
    .bind(candidate_id)
    .fetch_all(&state.db)
    .await?;
    Ok(reviews)
}

/// POST /api/performance/sync-jira/:id
///
/// Staff may sync any intern; an intern only their own record.
pub async fn handle_sync_jira(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<JiraSnapshotRow>, AppError> {
    let jira = state
        .jira
        .as_ref()
        .ok_or_else(|| AppError::Unavailable("Jira integration is not configured".to_string()))?;

    let candidate = repo::find_candidate(&state.db, id).await?;
    if user.role == Role::Intern
        && !candidate
            .email
            .as_deref()
            .is_some_and(|e| e.eq_ignore_ascii_case(&user.email))
    {
        return Err(AppError::Forbidden("Not authorized".to_string()));
    }
    let account = candidate
        .jira_account_id
        .as_deref()
        .ok_or_else(|| AppError::Validation("Candidate has no Jira account".to_string()))?;

    let summary = jira.assigned_tickets(account).await.map_err(|e| {
        error!("Jira sync for candidate {id} failed: {e}");
        AppError::Upstream(format!("Jira sync failed: {e}"))
    })?;

    let snapshot = sqlx::query_as::<_, JiraSnapshotRow>(
        r#"
        INSERT INTO jira_snapshots
            (candidate_id, last_sync_at, total_tickets, active_tickets, completed_tickets, tickets)
        VALUES ($1, now(), $2, $3, $4, $5)
        ON CONFLICT (candidate_id) DO UPDATE SET
            last_sync_at = now(),
            total_tickets = EXCLUDED.total_tickets,
            active_tickets = EXCLUDED.active_tickets,
            completed_tickets = EXCLUDED.completed_tickets,
            tickets = EXCLUDED.tickets
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(summary.total)
    .bind(summary.active)
    .bind(summary.completed)
    .bind(SqlJson(&summary.tickets))
    .fetch_one(&state.db)
    .await?;

    info!(
        "Jira snapshot for candidate {id}: {} tickets, {} active, {} done",
        snapshot.total_tickets, snapshot.active_tickets, snapshot.completed_tickets
    );
    Ok(Json(snapshot))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn review(score: i16) -> ReviewRequest {
        ReviewRequest {
            candidate_id: Uuid::nil(),
            score,
            feedback: None,
            internal_notes: None,
            jira_metrics: None,
        }
    }

    #[test]
    fn test_review_score_range() {
        assert!(review(1).validate().is_ok());
        assert!(review(5).validate().is_ok());
        assert!(review(0).validate().is_err());
        assert!(review(6).validate().is_err());
    }

    #[test]
    fn test_start_internship_accepts_jira_email_alias() {
        let req: StartInternshipRequest = serde_json::from_str(
            r#"{"candidate_id":"00000000-0000-0000-0000-000000000000","jira_email":"a@b.io"}"#,
        )
        .unwrap();
        assert_eq!(req.jira_account_id.as_deref(), Some("a@b.io"));
    }

    #[test]
    fn test_dashboard_progress() {
        let intern = DashboardIntern::from(DashboardRow {
            id: Uuid::nil(),
            name: Some("Jane".into()),
            email: None,
            status: "Active".into(),
            jira_account_id: None,
            internship_start_date: None,
            velocity: 2,
            last_score: Some(4),
            trainings_total: 4,
            trainings_completed: 1,
        });
        assert_eq!(intern.training_progress, 25);
        assert_eq!(intern.velocity, 2);
    }
}
