//! Training modules assigned by managers and completed by interns.

pub mod handlers;

use chrono::{DateTime, Utc};

use crate::errors::AppError;
use crate::models::training::{Resource, ResourceKind};

pub fn assignment_message(title: &str, due: Option<DateTime<Utc>>) -> String {
    let due = due
        .map(|d| d.format("%B %-d, %Y").to_string())
        .unwrap_or_else(|| "No due date".to_string());
    format!("You have been assigned a new training module: \"{title}\". Due date: {due}")
}

pub fn deletion_message(title: &str) -> String {
    format!("The training module \"{title}\" has been deleted by the manager.")
}

/// Trims labels and drops resources without a URL; a file resource must point
/// at an uploaded training object.
pub fn clean_resources(resources: Vec<Resource>) -> Result<Vec<Resource>, AppError> {
    resources
        .into_iter()
        .filter(|r| !r.url.trim().is_empty())
        .map(|r| {
            let url = r.url.trim().to_string();
            if r.kind == ResourceKind::File
                && !url.starts_with(&format!("{}/", crate::storage::TRAINING_PREFIX))
            {
                return Err(AppError::Validation(format!(
                    "File resource '{url}' was not uploaded as a training resource"
                )));
            }
            let label = match r.label.trim() {
                "" => url.clone(),
                l => l.to_string(),
            };
            Ok(Resource {
                kind: r.kind,
                label,
                url,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn res(kind: ResourceKind, label: &str, url: &str) -> Resource {
        Resource {
            kind,
            label: label.into(),
            url: url.into(),
        }
    }

    #[test]
    fn test_assignment_message() {
        let due = Utc.with_ymd_and_hms(2025, 7, 4, 0, 0, 0).unwrap();
        assert_eq!(
            assignment_message("Git Basics", Some(due)),
            "You have been assigned a new training module: \"Git Basics\". Due date: July 4, 2025"
        );
        assert!(assignment_message("Git Basics", None).ends_with("No due date"));
    }

    #[test]
    fn test_clean_resources() {
        let cleaned = clean_resources(vec![
            res(ResourceKind::Link, "  ", "https://doc.rust-lang.org/book/ "),
            res(ResourceKind::Link, "empty", "   "),
            res(ResourceKind::File, "Slides", "training/abc.pdf"),
        ])
        .unwrap();
        assert_eq!(cleaned.len(), 2);
        assert_eq!(cleaned[0].label, "https://doc.rust-lang.org/book/");
        assert_eq!(cleaned[1].label, "Slides");
    }

    #[test]
    fn test_file_resource_outside_training_prefix() {
        assert!(clean_resources(vec![res(ResourceKind::File, "x", "resumes/abc.pdf")]).is_err());
    }
}
