//! Candidate list filters, compiled into a parameterised SQL `WHERE` clause.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Postgres, QueryBuilder};

use crate::errors::AppError;
use crate::pipeline::CandidateStatus;

const DEFAULT_LIMIT: i64 = 10;
const MAX_LIMIT: i64 = 100;
/// Keeps `(page - 1) * limit` inside an i64 OFFSET.
const MAX_PAGE: i64 = i64::MAX / MAX_LIMIT;

/// Institutes containing any of these are schools, not colleges.
const SCHOOL_KEYWORDS: &[&str] = &[
    "school",
    "vidyalaya",
    "academy",
    "matriculation",
    "secondary",
    "high",
];

/// Raw query string of `GET /api/candidates`. `all` or an empty value
/// disables a filter.
#[derive(Debug, Default, Deserialize)]
pub struct CandidateListQuery {
    pub status: Option<String>,
    pub search: Option<String>,
    pub college: Option<String>,
    pub date_range: Option<String>,
    pub min_cgpa: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListFilter {
    pub status: Option<CandidateStatus>,
    pub search: Option<String>,
    pub college: Option<String>,
    pub created: Option<(DateTime<Utc>, DateTime<Utc>)>,
    pub min_cgpa: Option<f64>,
    pub page: i64,
    pub limit: i64,
}

#[derive(Debug, Serialize)]
pub struct Pagination {
    pub total: i64,
    pub page: i64,
    pub pages: i64,
}

fn active(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("all"))
}

/// `YYYY-MM` to the half-open range `[first of month, first of next month)`.
pub fn month_range(value: &str) -> Result<(DateTime<Utc>, DateTime<Utc>), AppError> {
    let invalid = || AppError::Validation(format!("date_range '{value}' must be YYYY-MM"));

    let (year, month) = value.split_once('-').ok_or_else(invalid)?;
    let year: i32 = year.parse().map_err(|_| invalid())?;
    let month: u32 = month.parse().map_err(|_| invalid())?;

    let start = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?;
    let end = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .ok_or_else(invalid)?;

    let midnight = |d: NaiveDate| Utc.from_utc_datetime(&d.and_hms_opt(0, 0, 0).unwrap_or_default());
    Ok((midnight(start), midnight(end)))
}

/// `%term%` for ILIKE, with LIKE wildcards in the term taken literally.
fn contains_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

impl TryFrom<CandidateListQuery> for ListFilter {
    type Error = AppError;

    fn try_from(q: CandidateListQuery) -> Result<Self, Self::Error> {
        let status = active(q.status).map(|s| s.parse()).transpose()?;
        let created = active(q.date_range)
            .map(|d| month_range(&d))
            .transpose()?;
        let min_cgpa = active(q.min_cgpa)
            .map(|v| {
                v.parse::<f64>()
                    .map_err(|_| AppError::Validation(format!("min_cgpa '{v}' is not a number")))
            })
            .transpose()?;

        Ok(ListFilter {
            status,
            search: active(q.search),
            college: active(q.college),
            created,
            min_cgpa,
            page: q.page.unwrap_or(1).clamp(1, MAX_PAGE),
            limit: q.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT),
        })
    }
}

impl ListFilter {
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    /// Appends ` AND ...` conditions; the builder must already end in a
    /// `WHERE` clause.
    pub fn push_conditions(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        if let Some(status) = self.status {
            qb.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(search) = &self.search {
            let pattern = contains_pattern(search);
            qb.push(" AND (name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR email ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR EXISTS (SELECT 1 FROM unnest(skills) AS skill WHERE skill ILIKE ")
                .push_bind(pattern)
                .push("))");
        }
        if let Some(college) = &self.college {
            qb.push(
                " AND EXISTS (SELECT 1 FROM jsonb_array_elements(education) AS edu \
                 WHERE edu->>'institute' ILIKE ",
            )
            .push_bind(contains_pattern(college))
            .push(")");
        }
        if let Some((from, to)) = self.created {
            qb.push(" AND created_at >= ")
                .push_bind(from)
                .push(" AND created_at < ")
                .push_bind(to);
        }
        if let Some(min) = self.min_cgpa {
            // Only the first education entry counts; unparseable scores never match.
            qb.push(
                " AND substring(education->0->>'cgpa' from '^\\s*([0-9]+(\\.[0-9]+)?)')::float8 >= ",
            )
            .push_bind(min);
        }
    }
}

pub fn page_count(total: i64, limit: i64) -> i64 {
    if limit <= 0 {
        return 0;
    }
    (total + limit - 1) / limit
}

/// Distinct college names, excluding schools, sorted.
pub fn filter_colleges<I>(institutes: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut colleges: Vec<String> = institutes
        .into_iter()
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .filter(|c| {
            let lower = c.to_lowercase();
            !SCHOOL_KEYWORDS.iter().any(|kw| lower.contains(kw))
        })
        .collect();
    colleges.sort();
    colleges.dedup();
    colleges
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(q: CandidateListQuery) -> ListFilter {
        ListFilter::try_from(q).unwrap()
    }

    #[test]
    fn test_all_disables_filters() {
        let f = filter(CandidateListQuery {
            status: Some("all".into()),
            college: Some("ALL".into()),
            date_range: Some("all".into()),
            search: Some("   ".into()),
            ..Default::default()
        });
        assert_eq!(f.status, None);
        assert_eq!(f.college, None);
        assert_eq!(f.created, None);
        assert_eq!(f.search, None);
        assert_eq!((f.page, f.limit), (1, DEFAULT_LIMIT));
    }

    #[test]
    fn test_status_parsed() {
        let f = filter(CandidateListQuery {
            status: Some("Ready to Join".into()),
            ..Default::default()
        });
        assert_eq!(f.status, Some(CandidateStatus::ReadyToJoin));
        assert!(ListFilter::try_from(CandidateListQuery {
            status: Some("Hired".into()),
            ..Default::default()
        })
        .is_err());
    }

    #[test]
    fn test_month_range() {
        let (from, to) = month_range("2025-12").unwrap();
        assert_eq!(from.to_rfc3339(), "2025-12-01T00:00:00+00:00");
        assert_eq!(to.to_rfc3339(), "2026-01-01T00:00:00+00:00");
        assert!(month_range("2025-13").is_err());
        assert!(month_range("december").is_err());
    }

    #[test]
    fn test_paging_clamped() {
        let f = filter(CandidateListQuery {
            page: Some(0),
            limit: Some(1000),
            ..Default::default()
        });
        assert_eq!(f.page, 1);
        assert_eq!(f.limit, MAX_LIMIT);
        let f = filter(CandidateListQuery {
            page: Some(3),
            limit: Some(20),
            ..Default::default()
        });
        assert_eq!(f.offset(), 40);
    }

    #[test]
    fn test_huge_page_does_not_overflow_offset() {
        let f = filter(CandidateListQuery {
            page: Some(i64::MAX),
            limit: Some(MAX_LIMIT),
            ..Default::default()
        });
        assert_eq!(f.page, MAX_PAGE);
        assert!(f.offset() >= 0);
        assert!(f.offset() <= i64::MAX - MAX_LIMIT);
    }

    #[test]
    fn test_page_count() {
        assert_eq!(page_count(0, 10), 0);
        assert_eq!(page_count(10, 10), 1);
        assert_eq!(page_count(11, 10), 2);
    }

    #[test]
    fn test_bad_min_cgpa() {
        assert!(ListFilter::try_from(CandidateListQuery {
            min_cgpa: Some("eight".into()),
            ..Default::default()
        })
        .is_err());
    }

    #[test]
    fn test_conditions_are_bound_not_inlined() {
        let f = filter(CandidateListQuery {
            status: Some("Interview".into()),
            search: Some("rust'; DROP TABLE candidates; --".into()),
            college: Some("IIT".into()),
            date_range: Some("2025-06".into()),
            min_cgpa: Some("7.5".into()),
            ..Default::default()
        });
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM candidates WHERE TRUE");
        f.push_conditions(&mut qb);
        let sql = qb.sql();
        assert!(!sql.contains("DROP TABLE"));
        assert!(sql.contains("status = $1"));
        assert!(sql.contains("unnest(skills)"));
        assert!(sql.contains("jsonb_array_elements(education)"));
        assert!(sql.contains("created_at < $7"));
        assert!(sql.contains("::float8 >= $8"));
    }

    #[test]
    fn test_like_wildcards_escaped() {
        assert_eq!(contains_pattern("50%_x"), "%50\\%\\_x%");
    }

    #[test]
    fn test_filter_colleges() {
        let colleges = filter_colleges(vec![
            "Indian Institute of Technology".to_string(),
            "Kendriya Vidyalaya".to_string(),
            "St. Mary High School".to_string(),
            "".to_string(),
            "Anna University".to_string(),
            "Indian Institute of Technology".to_string(),
        ]);
        assert_eq!(
            colleges,
            vec!["Anna University", "Indian Institute of Technology"]
        );
    }
}
