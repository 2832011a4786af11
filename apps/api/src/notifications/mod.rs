//! In-app notifications. Other modules raise them through [`notify`]; the
//! recipient is always a user account, resolved from a candidate by email.

pub mod handlers;

use chrono::{DateTime, Duration, Utc};
use sqlx::PgExecutor;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::notification::{NotificationKind, NotificationRow};

/// Notifications older than this are purged when the inbox is read.
pub const RETENTION_DAYS: i64 = 7;

pub fn retention_cutoff(now: DateTime<Utc>) -> DateTime<Utc> {
    now - Duration::days(RETENTION_DAYS)
}

/// A notification about to be delivered.
#[derive(Debug, Clone)]
pub struct Notice<'a> {
    pub title: Option<&'a str>,
    pub message: String,
    pub kind: NotificationKind,
    pub related_link: Option<&'a str>,
}

impl<'a> Notice<'a> {
    pub fn new(kind: NotificationKind, message: impl Into<String>) -> Self {
        Self {
            title: None,
            message: message.into(),
            kind,
            related_link: None,
        }
    }

    pub fn title(mut self, title: &'a str) -> Self {
        self.title = Some(title);
        self
    }

    pub fn link(mut self, link: &'a str) -> Self {
        self.related_link = Some(link);
        self
    }
}

pub async fn notify<'e>(
    executor: impl PgExecutor<'e>,
    recipient: Uuid,
    notice: Notice<'_>,
) -> Result<NotificationRow, AppError> {
    let row = sqlx::query_as::<_, NotificationRow>(
        r#"
        INSERT INTO notifications (id, recipient, title, message, kind, related_link)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(recipient)
    .bind(notice.title)
    .bind(&notice.message)
    .bind(notice.kind.as_str())
    .bind(notice.related_link)
    .fetch_one(executor)
    .await?;
    Ok(row)
}

/// The portal account of a candidate, if one has been issued.
pub async fn user_for_candidate<'e>(
    executor: impl PgExecutor<'e>,
    candidate_id: Uuid,
) -> Result<Option<Uuid>, AppError> {
    let user_id = sqlx::query_scalar(
        r#"
        SELECT u.id FROM users u
        JOIN candidates c ON lower(c.email) = u.email
        WHERE c.id = $1
        "#,
    )
    .bind(candidate_id)
    .fetch_optional(executor)
    .await?;
    Ok(user_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_retention_cutoff() {
        let now = Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap();
        assert_eq!(
            retention_cutoff(now),
            Utc.with_ymd_and_hms(2025, 3, 3, 12, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_notice_builder() {
        let n = Notice::new(NotificationKind::Success, "Week 2 reviewed")
            .title("Review")
            .link("/my-performance");
        assert_eq!(n.title, Some("Review"));
        assert_eq!(n.related_link, Some("/my-performance"));
        assert_eq!(n.kind.as_str(), "success");
    }
}
