// Prompts for the candidate hiring assistant.

use std::sync::LazyLock;

use regex::Regex;

pub const CHAT_MAX_TOKENS: u32 = 1000;
const MAX_RESUME_CHARS: usize = 10_000;
const TRUNCATION_MARKER: &str = "... [Resume text truncated for length]";

pub const OFF_TOPIC_REPLY: &str =
    "I only answer queries related to your hiring doubts of students.";

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("ws pattern"));

const HIRING_ASSISTANT_SYSTEM: &str = r#"You are a specialized "Hiring Assistant" for an Intern Management system.
Your goal is to answer questions about a candidate STRICTLY based on the provided resume text.

RESUME CONTENT:
---
{resume}
---

FORMATTING RULES:
1. **Natural & Concise**: Speak professionally but naturally. Keep answers short and direct.
2. **Selective Boldness**: Use **Bold Headings** only for structured insights or lists. For basic questions or greetings, just reply naturally.
3. **Evidence-Based**: Always base your analytical insights on the provided resume content.
4. **Clean Layout**: Use clear paragraph breaks or simple lists. Avoid excessive nesting.

GUARDRAILS:
1. ONLY answer questions related to hiring, skills, suitability, OR provide polite greetings.
2. If asked anything completely unrelated to hiring or the student, reply: "{off_topic}"
"#;

/// Collapses whitespace and caps the resume at a size that keeps requests
/// well inside rate limits.
pub fn clean_resume_text(raw: &str) -> String {
    let collapsed = WHITESPACE.replace_all(raw, " ");
    let collapsed = collapsed.trim();
    if collapsed.chars().count() <= MAX_RESUME_CHARS {
        return collapsed.to_string();
    }
    let head: String = collapsed.chars().take(MAX_RESUME_CHARS).collect();
    format!("{head}{TRUNCATION_MARKER}")
}

pub fn hiring_assistant_system(resume_text: &str) -> String {
    HIRING_ASSISTANT_SYSTEM
        .replace("{off_topic}", OFF_TOPIC_REPLY)
        .replace("{resume}", &clean_resume_text(resume_text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_collapses_whitespace() {
        assert_eq!(clean_resume_text("  Jane\n\n Doe\t Rust  "), "Jane Doe Rust");
    }

    #[test]
    fn test_clean_truncates_long_text() {
        let long = "a".repeat(MAX_RESUME_CHARS + 50);
        let cleaned = clean_resume_text(&long);
        assert!(cleaned.ends_with(TRUNCATION_MARKER));
        assert_eq!(
            cleaned.chars().count(),
            MAX_RESUME_CHARS + TRUNCATION_MARKER.chars().count()
        );
    }

    #[test]
    fn test_system_prompt_embeds_resume_and_guardrail() {
        let system = hiring_assistant_system("Jane Doe\nRust developer");
        assert!(system.contains("Jane Doe Rust developer"));
        assert!(system.contains(OFF_TOPIC_REPLY));
        assert!(!system.contains("{resume}"));
    }
}
