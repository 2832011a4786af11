//! Jira Cloud search client used to refresh an intern's ticket snapshot.

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::JiraConfig;
use crate::models::performance::JiraTicket;

/// Enhanced JQL search; pages with `nextPageToken` instead of `startAt`.
const SEARCH_PATH: &str = "/rest/api/3/search/jql";
const MAX_RESULTS: u32 = 100;
/// Upper bound on pages fetched per sync.
const MAX_PAGES: usize = 5;
/// Story points live in a custom field; this id is the Jira Cloud default.
const STORY_POINTS_FIELD: &str = "customfield_10016";

#[derive(Debug, Error)]
pub enum JiraError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Jira returned status {status}: {message}")]
    Api { status: u16, message: String },
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    issues: Vec<Issue>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
    #[serde(rename = "isLast", default)]
    is_last: bool,
}

impl SearchResponse {
    /// Token for the following page, if Jira reported one.
    fn next_page(&self) -> Option<&str> {
        if self.is_last {
            return None;
        }
        self.next_page_token.as_deref().filter(|t| !t.is_empty())
    }
}

fn search_url(base_url: &str) -> String {
    format!("{}{SEARCH_PATH}", base_url.trim_end_matches('/'))
}

#[derive(Debug, Deserialize)]
struct Issue {
    key: String,
    fields: IssueFields,
}

#[derive(Debug, Deserialize)]
struct IssueFields {
    #[serde(default)]
    summary: String,
    status: Option<IssueStatus>,
    priority: Option<Named>,
    created: Option<String>,
    updated: Option<String>,
    resolutiondate: Option<String>,
    #[serde(rename = "customfield_10016")]
    story_points: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct IssueStatus {
    name: String,
    #[serde(rename = "statusCategory")]
    category: Option<StatusCategory>,
}

#[derive(Debug, Deserialize)]
struct StatusCategory {
    key: String,
}

#[derive(Debug, Deserialize)]
struct Named {
    name: String,
}

/// Tickets plus the counters stored on the snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct TicketSummary {
    pub tickets: Vec<JiraTicket>,
    pub total: i32,
    pub active: i32,
    pub completed: i32,
}

#[derive(Clone)]
pub struct JiraClient {
    client: Client,
    config: JiraConfig,
}

impl JiraClient {
    pub fn new(config: JiraConfig) -> anyhow::Result<Self> {
        Ok(Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()?,
            config,
        })
    }

    /// Issues assigned to `account`, most recently updated first.
    pub async fn assigned_tickets(&self, account: &str) -> Result<TicketSummary, JiraError> {
        let base = self.config.base_url.trim_end_matches('/');
        let jql = format!("assignee = \"{}\" ORDER BY updated DESC", account.replace('"', ""));
        let fields = format!(
            "summary,status,priority,created,updated,resolutiondate,{STORY_POINTS_FIELD}"
        );

        let mut issues = Vec::new();
        let mut token: Option<String> = None;
        for _ in 0..MAX_PAGES {
            let page = self.search_page(account, &jql, &fields, token.as_deref()).await?;
            token = page.next_page().map(str::to_string);
            issues.extend(page.issues);
            if token.is_none() {
                break;
            }
        }
        if token.is_some() {
            warn!("Jira search for {account} truncated after {MAX_PAGES} pages");
        }

        debug!("Jira returned {} issues for {account}", issues.len());
        Ok(summarize(base, issues))
    }

    async fn search_page(
        &self,
        account: &str,
        jql: &str,
        fields: &str,
        page_token: Option<&str>,
    ) -> Result<SearchResponse, JiraError> {
        let max_results = MAX_RESULTS.to_string();
        let mut query = vec![
            ("jql", jql),
            ("fields", fields),
            ("maxResults", max_results.as_str()),
        ];
        if let Some(page_token) = page_token {
            query.push(("nextPageToken", page_token));
        }

        let response = self
            .client
            .get(search_url(&self.config.base_url))
            .basic_auth(&self.config.email, Some(&self.config.api_token))
            .header("accept", "application/json")
            .query(&query)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!("Jira search for {account} returned {status}");
            return Err(JiraError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json().await?)
    }
}

/// Jira timestamps look like `2025-01-10T09:12:33.000+0000`.
fn parse_jira_time(value: Option<&str>) -> Option<DateTime<Utc>> {
    let value = value?;
    DateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f%z")
        .or_else(|_| DateTime::parse_from_rfc3339(value))
        .map(|t| t.with_timezone(&Utc))
        .ok()
}

fn summarize(base_url: &str, issues: Vec<Issue>) -> TicketSummary {
    let mut active = 0;
    let mut completed = 0;

    let tickets: Vec<JiraTicket> = issues
        .into_iter()
        .map(|issue| {
            let f = issue.fields;
            match f
                .status
                .as_ref()
                .and_then(|s| s.category.as_ref())
                .map(|c| c.key.as_str())
            {
                Some("done") => completed += 1,
                Some("indeterminate") => active += 1,
                _ => {}
            }
            JiraTicket {
                link: format!("{base_url}/browse/{}", issue.key),
                key: issue.key,
                summary: f.summary,
                status: f.status.map(|s| s.name).unwrap_or_default(),
                story_points: f.story_points,
                priority: f.priority.map(|p| p.name),
                created: parse_jira_time(f.created.as_deref()),
                updated: parse_jira_time(f.updated.as_deref()),
                resolution_date: parse_jira_time(f.resolutiondate.as_deref()),
            }
        })
        .collect();

    TicketSummary {
        total: tickets.len() as i32,
        tickets,
        active,
        completed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "total": 3,
        "issues": [
            {"key": "TD-1", "fields": {"summary": "Login page",
                "status": {"name": "In Progress", "statusCategory": {"key": "indeterminate"}},
                "priority": {"name": "High"}, "created": "2025-01-10T09:12:33.000+0000",
                "customfield_10016": 3.0}},
            {"key": "TD-2", "fields": {"summary": "Fix typo",
                "status": {"name": "Done", "statusCategory": {"key": "done"}},
                "resolutiondate": "2025-01-12T17:00:00.000+0530"}},
            {"key": "TD-3", "fields": {"summary": "Spike",
                "status": {"name": "To Do", "statusCategory": {"key": "new"}}}}
        ]
    }"#;

    #[test]
    fn test_summarize_counts_by_category() {
        let body: SearchResponse = serde_json::from_str(SAMPLE).unwrap();
        let summary = summarize("https://acme.atlassian.net", body.issues);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.active, 1);
        assert_eq!(summary.completed, 1);
        assert_eq!(summary.tickets[0].link, "https://acme.atlassian.net/browse/TD-1");
        assert_eq!(summary.tickets[0].story_points, Some(3.0));
        assert_eq!(summary.tickets[0].priority.as_deref(), Some("High"));
    }

    #[test]
    fn test_search_uses_jql_endpoint() {
        assert_eq!(
            search_url("https://acme.atlassian.net/"),
            "https://acme.atlassian.net/rest/api/3/search/jql"
        );
    }

    #[test]
    fn test_next_page_token() {
        let body: SearchResponse = serde_json::from_str(
            r#"{"issues": [{"key": "TD-9", "fields": {"summary": "Paged"}}],
                "nextPageToken": "CAEaAggD", "isLast": false}"#,
        )
        .unwrap();
        assert_eq!(body.next_page(), Some("CAEaAggD"));
        assert_eq!(body.issues.len(), 1);

        let last: SearchResponse =
            serde_json::from_str(r#"{"issues": [], "nextPageToken": "x", "isLast": true}"#)
                .unwrap();
        assert_eq!(last.next_page(), None);

        let bare: SearchResponse = serde_json::from_str(SAMPLE).unwrap();
        assert_eq!(bare.next_page(), None);
    }

    #[test]
    fn test_jira_time_formats() {
        let t = parse_jira_time(Some("2025-01-12T17:00:00.000+0530")).unwrap();
        assert_eq!(t.to_rfc3339(), "2025-01-12T11:30:00+00:00");
        assert!(parse_jira_time(Some("2025-01-12T11:30:00Z")).is_some());
        assert!(parse_jira_time(Some("yesterday")).is_none());
        assert!(parse_jira_time(None).is_none());
    }
}
