//! Candidate queries shared by the pipeline, onboarding and performance routes.

use sqlx::{PgExecutor, PgPool};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::candidate::{CandidateRow, RoundRow};
use crate::pipeline::{CandidateStatus, RoundStatus};

pub async fn find_candidate<'e>(
    executor: impl PgExecutor<'e>,
    id: Uuid,
) -> Result<CandidateRow, AppError> {
    sqlx::query_as::<_, CandidateRow>("SELECT * FROM candidates WHERE id = $1")
        .bind(id)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| AppError::NotFound("Candidate not found".to_string()))
}

/// Row-locking variant for status changes inside a transaction.
pub async fn lock_candidate<'e>(
    executor: impl PgExecutor<'e>,
    id: Uuid,
) -> Result<CandidateRow, AppError> {
    sqlx::query_as::<_, CandidateRow>("SELECT * FROM candidates WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| AppError::NotFound("Candidate not found".to_string()))
}

/// The candidate record belonging to a portal login, matched by email.
pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<CandidateRow>, AppError> {
    let candidate = sqlx::query_as::<_, CandidateRow>(
        "SELECT * FROM candidates WHERE lower(email) = lower($1) ORDER BY created_at DESC LIMIT 1",
    )
    .bind(email)
    .fetch_optional(pool)
    .await?;
    Ok(candidate)
}

/// Compare-and-set status change. Returns `None` when the candidate is no
/// longer in `from`.
pub async fn transition<'e>(
    executor: impl PgExecutor<'e>,
    id: Uuid,
    from: CandidateStatus,
    to: CandidateStatus,
) -> Result<Option<CandidateRow>, AppError> {
    let row = sqlx::query_as::<_, CandidateRow>(
        "UPDATE candidates SET status = $1, updated_at = now() \
         WHERE id = $2 AND status = $3 RETURNING *",
    )
    .bind(to.as_str())
    .bind(id)
    .bind(from.as_str())
    .fetch_optional(executor)
    .await?;
    if row.is_some() {
        info!("Candidate {id} moved {from} -> {to}");
    }
    Ok(row)
}

pub async fn rounds_for<'e>(
    executor: impl PgExecutor<'e>,
    candidate_id: Uuid,
) -> Result<Vec<RoundRow>, AppError> {
    let rounds = sqlx::query_as::<_, RoundRow>(
        "SELECT * FROM interview_rounds WHERE candidate_id = $1 ORDER BY position",
    )
    .bind(candidate_id)
    .fetch_all(executor)
    .await?;
    Ok(rounds)
}

/// `(id, status)` pairs in position order, as the round rules consume them.
pub fn round_states(rounds: &[RoundRow]) -> Result<Vec<(Uuid, RoundStatus)>, AppError> {
    rounds.iter().map(|r| Ok((r.id, r.status()?))).collect()
}
