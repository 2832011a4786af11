//! Resume parser: pulls text out of a PDF and extracts contact details,
//! skills, experience and education with regex heuristics.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::models::candidate::Education;

/// Below this confidence the upload is refused as "not a resume".
pub const MIN_CONFIDENCE: f64 = 0.8;
const MIN_TEXT_LEN: usize = 20;
const MAX_SKILLS: usize = 10;

#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("Failed to parse PDF: {0}")]
    Pdf(String),

    #[error("PDF appears to be empty or unreadable (text length < {MIN_TEXT_LEN})")]
    TooShort,

    #[error("Document does not appear to be a valid resume (Low confidence: {0}%)")]
    LowConfidence(u32),
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ParsedResume {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub linkedin_url: Option<String>,
    pub github_url: Option<String>,
    pub skills: Vec<String>,
    pub experience: String,
    pub education: Vec<Education>,
    pub confidence: f64,
    pub raw_text: String,
}

const COMMON_SKILLS: &[&str] = &[
    "JavaScript", "TypeScript", "Python", "Java", "C#", "C++", "Go", "Rust", "PHP", "Ruby",
    "Swift", "Kotlin", "React", "Angular", "Vue", "Node.js", "Express", "Django", "Flask",
    "Spring", "Laravel", ".NET", "MongoDB", "PostgreSQL", "MySQL", "Redis", "Elasticsearch",
    "SQL", "NoSQL", "AWS", "Azure", "GCP", "Docker", "Kubernetes", "Jenkins", "CI/CD", "DevOps",
    "Git", "GitHub", "GitLab", "Agile", "Scrum", "REST", "GraphQL", "API", "HTML", "CSS", "Sass",
    "Tailwind", "Bootstrap", "Material-UI", "TDD", "Jest", "Mocha", "Pytest", "JUnit", "Testing",
    "Machine Learning", "AI", "Data Science", "TensorFlow", "PyTorch",
];

const INSTITUTION_KEYWORDS: &[&str] = &[
    "University",
    "College",
    "Institute",
    "School",
    "Academy",
    "Vidyalaya",
    "High School",
    "Secondary",
];

const CLASS_KEYWORDS: &[&str] = &["Class X", "Class XII", "10th", "12th"];

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[a-zA-Z0-9._-]+@[a-zA-Z0-9._-]+\.[a-zA-Z0-9_-]+").expect("email pattern")
});
static PHONE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\+?\d{1,3}[-.\s]?)?\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4}").expect("phone pattern")
});
static LINKEDIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:www\.)?linkedin\.com/in/([^/\s]+)").expect("linkedin pattern")
});
static GITHUB: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)github\.com/([^/\s]+)").expect("github pattern"));
static NAME_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z][a-z]+ [A-Z][a-z]+").expect("name line pattern"));
static NAME_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i:name|candidate|applicant)[\s:]+([A-Z][a-z]+ [A-Z][a-z]+(?: [A-Z][a-z]+)?)")
        .expect("name label pattern")
});
static SKILLS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    COMMON_SKILLS
        .iter()
        .map(|skill| {
            // Consume the boundary characters instead of `\b` so skills that
            // start or end in punctuation (C++, .NET) still match.
            let pattern = format!(
                r"(?i)(?:^|[^A-Za-z0-9_]){}(?:$|[^A-Za-z0-9_])",
                regex::escape(skill)
            );
            (*skill, Regex::new(&pattern).expect("skill pattern"))
        })
        .collect()
});
static YEARS_OF_EXPERIENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+)\+?\s*(?:years?|yrs?)(?:\s+of)?\s+(?:experience|exp)")
        .expect("experience pattern")
});
static EXPERIENCE_SECTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:EXPERIENCE|WORK HISTORY)[\s\S]{0,200}").expect("section pattern")
});
static CLASS_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:10th|12th|X|XII)\b").expect("class marker pattern"));
static TRAILING_DATES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:2\s*0\s*[0-2]\s*[0-9]|1\s*9\s*[0-9]\s*[0-9])[\s\S]*").expect("date pattern")
});
static NON_NAME_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s.,&-]").expect("symbol pattern"));
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("ws pattern"));
static TRAILING_SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[-,\s]+$").expect("separator pattern"));
static YEAR_RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b20[0-2][0-9]\s*[-–to]+\s*(Present|Current|Now|20[0-2][0-9])\b")
        .expect("year range pattern")
});
static SINGLE_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(20[0-2][0-9])\b").expect("year pattern"));
static PERCENTAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{2}(?:\.\d+)?)\s*%").expect("percentage pattern"));
static CGPA_LABELLED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:CGPA|SGPA|GPA)[:\s-]*([0-9]\.[0-9]{1,2})").expect("cgpa pattern")
});
static CGPA_OUT_OF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:10(?:\.0{1,2})?|[0-9](?:\.[0-9]{1,2})?)\s*(?:/|of|CGPA)")
        .expect("cgpa scale pattern")
});
static DEGREES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)\b(?:Bachelor|B\.?S\.?|B\.?A\.?|B\.?Tech|B\.?E\.?)(?:\s+(?:of|in))?\s+[A-Za-z\s]+",
        r"(?i)\b(?:Master|M\.?S\.?|M\.?A\.?|M\.?Tech)(?:\s+(?:of|in))?\s+[A-Za-z\s]+",
        r"(?i)\b(?:Ph\.?D\.?|Doctorate)",
        r"(?i)(?:Class\s*XII|Class\s*X|10th|12th|HSC|SSC)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("degree pattern"))
    .collect()
});
static CLASS_XII: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)12th|XII").expect("class xii pattern"));
static CLASS_X: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)10th|X\b").expect("class x pattern"));
static SCHOOLING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)School|Vidyalaya").expect("schooling pattern"));

/// Extracts plain text from PDF bytes. CPU-bound; call from `spawn_blocking`.
pub fn extract_text(pdf: &[u8]) -> Result<String, ParseError> {
    pdf_extract::extract_text_from_mem(pdf).map_err(|e| ParseError::Pdf(e.to_string()))
}

/// Runs every heuristic over the text and applies the confidence gate.
pub fn parse_resume(text: &str) -> Result<ParsedResume, ParseError> {
    debug!("Extracted text length: {}", text.len());

    if text.trim().chars().count() < MIN_TEXT_LEN {
        warn!("Resume text is empty or too short");
        return Err(ParseError::TooShort);
    }

    let email = EMAIL.find(text).map(|m| m.as_str().to_string());
    let phone = PHONE.find(text).map(|m| m.as_str().trim().to_string());
    let linkedin_url = LINKEDIN
        .captures(text)
        .map(|c| format!("https://www.linkedin.com/in/{}", &c[1]));
    let github_url = GITHUB
        .captures(text)
        .map(|c| format!("https://github.com/{}", &c[1]));

    let mut parsed = ParsedResume {
        name: extract_name(text),
        email,
        phone,
        linkedin_url,
        github_url,
        skills: extract_skills(text),
        experience: extract_experience(text),
        education: extract_education(text),
        confidence: 0.0,
        raw_text: text.to_string(),
    };
    parsed.confidence = confidence(&parsed);

    info!(
        "Parsed resume: name={:?} email={:?} skills={} confidence={:.2}",
        parsed.name,
        parsed.email,
        parsed.skills.len(),
        parsed.confidence
    );

    if parsed.confidence < MIN_CONFIDENCE {
        return Err(ParseError::LowConfidence(
            (parsed.confidence * 100.0).round() as u32,
        ));
    }
    Ok(parsed)
}

fn extract_name(text: &str) -> Option<String> {
    if let Some(first) = text.lines().map(str::trim).find(|l| !l.is_empty()) {
        if first.chars().count() < 50 && NAME_LINE.is_match(first) {
            return Some(first.to_string());
        }
    }
    NAME_LABEL
        .captures(text)
        .map(|c| c[1].trim().to_string())
}

fn extract_skills(text: &str) -> Vec<String> {
    SKILLS
        .iter()
        .filter(|(_, re)| re.is_match(text))
        .map(|(skill, _)| skill.to_string())
        .take(MAX_SKILLS)
        .collect()
}

fn extract_experience(text: &str) -> String {
    if let Some(c) = YEARS_OF_EXPERIENCE.captures(text) {
        return format!("{} years of experience", &c[1]);
    }
    if let Some(m) = EXPERIENCE_SECTION.find(text) {
        let head: String = m.as_str().chars().take(100).collect();
        return format!("{}...", head.trim());
    }
    "Experience details in resume".to_string()
}

fn is_institution_line(line: &str) -> bool {
    INSTITUTION_KEYWORDS.iter().any(|k| line.contains(k))
}

fn is_education_line(line: &str) -> bool {
    is_institution_line(line)
        || CLASS_KEYWORDS.iter().any(|k| line.contains(k))
        || CLASS_MARKER.is_match(line)
}

fn clean_institute(line: &str) -> String {
    let without_dates = TRAILING_DATES.replace(line, "");
    let without_symbols = NON_NAME_CHARS.replace_all(&without_dates, "");
    let collapsed = WHITESPACE.replace_all(&without_symbols, " ");
    TRAILING_SEPARATORS
        .replace(collapsed.trim(), "")
        .into_owned()
}

fn extract_year(window: &str) -> String {
    if let Some(c) = YEAR_RANGE.captures(window) {
        let end = &c[1];
        return match end.to_ascii_lowercase().as_str() {
            "present" | "current" | "now" => "Present".to_string(),
            _ => end.to_string(),
        };
    }
    SINGLE_YEAR
        .captures(window)
        .map(|c| c[1].to_string())
        .unwrap_or_default()
}

fn extract_score(window: &str) -> String {
    if let Some(c) = PERCENTAGE.captures(window) {
        return format!("{}%", &c[1]);
    }
    if let Some(c) = CGPA_LABELLED.captures(window) {
        return c[1].to_string();
    }
    CGPA_OUT_OF
        .find(window)
        .map(|m| {
            m.as_str()
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '.')
                .collect()
        })
        .unwrap_or_default()
}

fn extract_degree(window: &str, institute: &str) -> String {
    if let Some(m) = DEGREES.iter().find_map(|re| re.find(window)) {
        return m.as_str().trim().to_string();
    }
    if CLASS_XII.is_match(window) {
        "Class XII".to_string()
    } else if CLASS_X.is_match(window) {
        "Class X".to_string()
    } else if SCHOOLING.is_match(institute) {
        "Schooling".to_string()
    } else {
        "Degree Not Specified".to_string()
    }
}

fn extract_education(text: &str) -> Vec<Education> {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    let mut education: Vec<Education> = Vec::new();

    for (i, line) in lines.iter().enumerate() {
        if !is_education_line(line) {
            continue;
        }
        // A bare "Class XII 92%" line right under an institution is a detail
        // of that entry, already covered by its window.
        if !is_institution_line(line)
            && lines[i.saturating_sub(2)..i]
                .iter()
                .any(|l| is_institution_line(l))
        {
            continue;
        }

        let institute = clean_institute(line);
        if institute.chars().count() < 3 {
            continue;
        }

        let window = lines[i..(i + 3).min(lines.len())].join(" ");
        let entry = Education {
            degree: extract_degree(&window, &institute),
            year: extract_year(&window),
            cgpa: extract_score(&window),
            institute,
        };

        if !education.iter().any(|e| e.institute == entry.institute) {
            education.push(entry);
        }
    }
    education
}

fn confidence(parsed: &ParsedResume) -> f64 {
    let mut score = 0.5;
    if parsed.name.is_some() {
        score += 0.2;
    }
    if parsed.email.is_some() {
        score += 0.15;
    }
    if parsed.phone.is_some() {
        score += 0.05;
    }
    if !parsed.skills.is_empty() {
        score += 0.1;
    }
    if parsed.skills.len() >= 5 {
        score += 0.05;
    }
    f64::min(score, 0.99)
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESUME: &str = "Jane Doe
jane.doe@example.com | +1 555-123-4567
linkedin.com/in/janedoe  github.com/janedoe
Skills: Rust, Python, Docker, PostgreSQL, React, Git, C++
3+ years of experience building backend services
EDUCATION
Indian Institute of Technology 2019 - 2023
B.Tech in Computer Science CGPA: 8.75
Kendriya Vidyalaya 2017 - 2019
Class XII 92%
";

    #[test]
    fn test_parses_contact_details() {
        let parsed = parse_resume(RESUME).unwrap();
        assert_eq!(parsed.name.as_deref(), Some("Jane Doe"));
        assert_eq!(parsed.email.as_deref(), Some("jane.doe@example.com"));
        assert_eq!(parsed.phone.as_deref(), Some("+1 555-123-4567"));
        assert_eq!(
            parsed.linkedin_url.as_deref(),
            Some("https://www.linkedin.com/in/janedoe")
        );
        assert_eq!(
            parsed.github_url.as_deref(),
            Some("https://github.com/janedoe")
        );
        assert!((parsed.confidence - 0.99).abs() < f64::EPSILON);
    }

    #[test]
    fn test_skills_use_word_boundaries() {
        let parsed = parse_resume(RESUME).unwrap();
        for skill in ["Rust", "Python", "Docker", "PostgreSQL", "C++"] {
            assert!(parsed.skills.contains(&skill.to_string()), "missing {skill}");
        }
        // "SQL" is only present inside "PostgreSQL".
        assert!(!parsed.skills.contains(&"SQL".to_string()));
        assert!(parsed.skills.len() <= MAX_SKILLS);
    }

    #[test]
    fn test_experience_years() {
        assert_eq!(
            parse_resume(RESUME).unwrap().experience,
            "3 years of experience"
        );
        assert_eq!(
            extract_experience("Nothing relevant here"),
            "Experience details in resume"
        );
        assert!(extract_experience("WORK HISTORY\nAcme Corp, intern").starts_with("WORK HISTORY"));
    }

    #[test]
    fn test_education_entries() {
        let education = parse_resume(RESUME).unwrap().education;
        assert_eq!(education.len(), 2, "{education:?}");

        assert_eq!(education[0].institute, "Indian Institute of Technology");
        assert!(education[0].degree.starts_with("B.Tech in Computer Science"));
        assert_eq!(education[0].year, "2023");
        assert_eq!(education[0].cgpa, "8.75");

        assert_eq!(education[1].institute, "Kendriya Vidyalaya");
        assert_eq!(education[1].degree, "Class XII");
        assert_eq!(education[1].year, "2019");
        assert_eq!(education[1].cgpa, "92%");
    }

    #[test]
    fn test_year_range_present() {
        assert_eq!(extract_year("State University 2022 - Now"), "Present");
        assert_eq!(extract_year("Graduated 2021"), "2021");
        assert_eq!(extract_year("no dates"), "");
    }

    #[test]
    fn test_cgpa_out_of_scale() {
        assert_eq!(extract_score("Scored 9.1 / 10 overall"), "9.1");
    }

    #[test]
    fn test_degree_fallbacks() {
        assert_eq!(
            extract_degree("St. Mary School", "St. Mary School"),
            "Schooling"
        );
        assert_eq!(
            extract_degree("Riverside College", "Riverside College"),
            "Degree Not Specified"
        );
    }

    #[test]
    fn test_name_from_label() {
        let text = "CURRICULUM VITAE\nName: John Smith\nEmail john@x.io";
        assert_eq!(extract_name(text).as_deref(), Some("John Smith"));
    }

    #[test]
    fn test_short_text_rejected() {
        assert_eq!(parse_resume("   tiny   "), Err(ParseError::TooShort));
    }

    #[test]
    fn test_length_counts_inner_whitespace() {
        // 11 visible characters, 21 once trimmed.
        let spaced = "  a b c d e f g h i j k  ";
        assert_ne!(parse_resume(spaced), Err(ParseError::TooShort));
        assert_eq!(parse_resume(" a b c d e f g h i j "), Err(ParseError::TooShort));
    }

    #[test]
    fn test_low_confidence_rejected() {
        let err = parse_resume("this is a shopping list with milk, eggs and bread").unwrap_err();
        assert_eq!(err, ParseError::LowConfidence(50));
        assert!(err.to_string().contains("50%"));
    }
}
