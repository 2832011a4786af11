use anyhow::Context;
use chrono::NaiveDate;
use handlebars::Handlebars;
use serde::Serialize;
use tracing::{debug, info};

use crate::errors::AppError;

const TEMPLATE_NAME: &str = "offer_letter";
const EMBEDDED_TEMPLATE: &str = include_str!("../../templates/offer_letter.hbs");

pub const DEFAULT_POSITION: &str = "Trainee Analyst";
pub const DEFAULT_JOINING_DATE: &str = "To be Decided";
pub const DEFAULT_EXPIRY_DATE: &str = "Immediate";

/// Values substituted into the offer letter template.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OfferLetter {
    pub candidate_name: String,
    pub position: String,
    pub offer_date: String,
    pub joining_date: String,
    pub expiry_date: String,
}

/// Optional overrides supplied by the manager.
#[derive(Debug, Clone, Default)]
pub struct OfferTerms {
    pub position: Option<String>,
    pub offer_date: Option<String>,
    pub joining_date: Option<String>,
    pub expiry_date: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// `January 5, 2026`
pub fn format_offer_date(date: NaiveDate) -> String {
    date.format("%B %-d, %Y").to_string()
}

impl OfferLetter {
    pub fn new(candidate_name: &str, terms: OfferTerms, today: NaiveDate) -> Self {
        Self {
            candidate_name: candidate_name.trim().to_string(),
            position: non_empty(terms.position).unwrap_or_else(|| DEFAULT_POSITION.to_string()),
            offer_date: non_empty(terms.offer_date).unwrap_or_else(|| format_offer_date(today)),
            joining_date: non_empty(terms.joining_date)
                .unwrap_or_else(|| DEFAULT_JOINING_DATE.to_string()),
            expiry_date: non_empty(terms.expiry_date)
                .unwrap_or_else(|| DEFAULT_EXPIRY_DATE.to_string()),
        }
    }

    /// `Offer_Jane_Doe.pdf`
    pub fn pdf_filename(&self) -> String {
        let name = self
            .candidate_name
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("_")
            .replace(['"', '\\', '/'], "");
        format!("Offer_{name}.pdf")
    }
}

pub struct OfferTemplate {
    hbs: Handlebars<'static>,
}

impl OfferTemplate {
    /// Loads the template from `path` when given, otherwise the built-in one.
    pub fn load(path: Option<&str>) -> anyhow::Result<Self> {
        let source = match path {
            Some(path) => {
                info!("Loading offer letter template from {path}");
                std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read offer template {path}"))?
            }
            None => EMBEDDED_TEMPLATE.to_string(),
        };

        let mut hbs = Handlebars::new();
        hbs.set_strict_mode(true);
        hbs.register_template_string(TEMPLATE_NAME, source)
            .context("Offer letter template does not compile")?;
        Ok(Self { hbs })
    }

    pub fn render(&self, letter: &OfferLetter) -> Result<String, AppError> {
        debug!("Rendering offer letter for {}", letter.candidate_name);
        self.hbs
            .render(TEMPLATE_NAME, letter)
            .map_err(|e| AppError::Render(format!("Offer template failed: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 5).unwrap()
    }

    #[test]
    fn test_defaults_applied() {
        let letter = OfferLetter::new(
            "Jane Doe",
            OfferTerms {
                joining_date: Some("  ".into()),
                ..Default::default()
            },
            today(),
        );
        assert_eq!(letter.offer_date, "January 5, 2026");
        assert_eq!(letter.joining_date, DEFAULT_JOINING_DATE);
        assert_eq!(letter.expiry_date, DEFAULT_EXPIRY_DATE);
        assert_eq!(letter.position, DEFAULT_POSITION);
    }

    #[test]
    fn test_explicit_terms_win() {
        let letter = OfferLetter::new(
            "Jane Doe",
            OfferTerms {
                offer_date: Some("March 1, 2026".into()),
                expiry_date: Some("March 15, 2026".into()),
                ..Default::default()
            },
            today(),
        );
        assert_eq!(letter.offer_date, "March 1, 2026");
        assert_eq!(letter.expiry_date, "March 15, 2026");
    }

    #[test]
    fn test_pdf_filename_underscores() {
        let letter = OfferLetter::new("  Mary  Ann Smith ", OfferTerms::default(), today());
        assert_eq!(letter.pdf_filename(), "Offer_Mary_Ann_Smith.pdf");
    }

    #[test]
    fn test_embedded_template_renders_and_escapes() {
        let template = OfferTemplate::load(None).unwrap();
        let letter = OfferLetter::new("Tom <b>Jones</b>", OfferTerms::default(), today());
        let html = template.render(&letter).unwrap();
        assert!(html.contains("January 5, 2026"));
        assert!(html.contains("To be Decided"));
        assert!(html.contains("Tom &lt;b&gt;Jones&lt;/b&gt;"));
    }

    #[test]
    fn test_missing_template_file_fails() {
        assert!(OfferTemplate::load(Some("/nonexistent/offer.hbs")).is_err());
    }
}
