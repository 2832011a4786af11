/// LLM client: the single point of entry for all Claude API calls in Talentdesk.
///
/// No other module may call the Anthropic API directly.
///
/// Model: claude-sonnet-4-5 (hardcoded, not configurable)
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub mod prompts;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
pub const MODEL: &str = "claude-sonnet-4-5";
const MAX_RETRIES: u32 = 3;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("LLM returned empty content")]
    EmptyContent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    /// `model` is what browser chat widgets built for Gemini send.
    #[serde(alias = "model")]
    Assistant,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatPart {
    pub text: String,
}

/// One prior turn of a conversation as sent by the client. Accepts either a
/// plain `content` string or a list of text `parts`.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub parts: Vec<ChatPart>,
}

impl ChatTurn {
    pub fn text(&self) -> String {
        match &self.content {
            Some(content) => content.clone(),
            None => self
                .parts
                .iter()
                .map(|p| p.text.as_str())
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: &'a [AnthropicMessage],
}

#[derive(Debug, Clone, PartialEq, Serialize)]
struct AnthropicMessage {
    role: ChatRole,
    content: String,
}

#[derive(Debug, Deserialize)]
pub struct LlmResponse {
    pub content: Vec<ContentBlock>,
    pub usage: Usage,
}

#[derive(Debug, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub block_type: String,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl LlmResponse {
    /// Extracts the text content from the first text block.
    pub fn text(&self) -> Option<&str> {
        self.content
            .iter()
            .find(|b| b.block_type == "text")
            .and_then(|b| b.text.as_deref())
    }
}

#[derive(Debug, Deserialize)]
struct AnthropicError {
    error: AnthropicErrorBody,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorBody {
    message: String,
}

/// Wraps the Anthropic Messages API with retry logic.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
}

impl LlmClient {
    pub fn new(api_key: String) -> anyhow::Result<Self> {
        Ok(Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .build()?,
            api_key,
        })
    }

    /// Continues a conversation: prior `history` followed by the new user
    /// `message`. Returns the assistant's reply text.
    pub async fn chat(
        &self,
        system: &str,
        history: &[ChatTurn],
        message: &str,
        max_tokens: u32,
    ) -> Result<String, LlmError> {
        let messages = build_messages(history, message);
        let response = self.call(&messages, system, max_tokens).await?;
        response
            .text()
            .map(str::to_string)
            .ok_or(LlmError::EmptyContent)
    }

    /// Makes a raw call to the Claude API, returning the full response object.
    /// Retries on 429 (rate limit) and 5xx errors with exponential backoff.
    async fn call(
        &self,
        messages: &[AnthropicMessage],
        system: &str,
        max_tokens: u32,
    ) -> Result<LlmResponse, LlmError> {
        let request_body = AnthropicRequest {
            model: MODEL,
            max_tokens,
            system,
            messages,
        };

        let mut last_error: Option<LlmError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s
                let delay = std::time::Duration::from_millis(1000 * (1 << (attempt - 1)));
                warn!(
                    "LLM call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = self
                .client
                .post(ANTHROPIC_API_URL)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .header("content-type", "application/json")
                .json(&request_body)
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(LlmError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("LLM API returned {}: {}", status, body);
                last_error = Some(LlmError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<AnthropicError>(&body)
                    .map(|e| e.error.message)
                    .unwrap_or(body);
                return Err(LlmError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            let llm_response: LlmResponse = response.json().await?;

            debug!(
                "LLM call succeeded: input_tokens={}, output_tokens={}",
                llm_response.usage.input_tokens, llm_response.usage.output_tokens
            );

            return Ok(llm_response);
        }

        Err(last_error.unwrap_or(LlmError::RateLimited {
            retries: MAX_RETRIES,
        }))
    }
}

/// Turns client history into a message list the Messages API accepts: it must
/// open with a user turn and alternate roles, so leading assistant turns are
/// dropped, empty turns skipped and consecutive same-role turns merged.
fn build_messages(history: &[ChatTurn], message: &str) -> Vec<AnthropicMessage> {
    let mut messages: Vec<AnthropicMessage> = Vec::with_capacity(history.len() + 1);

    let turns = history
        .iter()
        .map(|t| (t.role, t.text()))
        .chain(std::iter::once((ChatRole::User, message.to_string())));

    for (role, text) in turns {
        let text = text.trim();
        if text.is_empty() || (messages.is_empty() && role == ChatRole::Assistant) {
            continue;
        }
        match messages.last_mut() {
            Some(last) if last.role == role => {
                last.content.push_str("\n\n");
                last.content.push_str(text);
            }
            _ => messages.push(AnthropicMessage {
                role,
                content: text.to_string(),
            }),
        }
    }
    messages
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn(role: ChatRole, text: &str) -> ChatTurn {
        ChatTurn {
            role,
            content: Some(text.to_string()),
            parts: Vec::new(),
        }
    }

    #[test]
    fn test_gemini_style_history_deserializes() {
        let turns: Vec<ChatTurn> = serde_json::from_str(
            r#"[{"role":"user","parts":[{"text":"Hi"}]},{"role":"model","parts":[{"text":"Hello!"}]}]"#,
        )
        .unwrap();
        assert_eq!(turns[1].role, ChatRole::Assistant);
        assert_eq!(turns[1].text(), "Hello!");
    }

    #[test]
    fn test_build_messages_appends_new_question() {
        let history = vec![
            turn(ChatRole::User, "Does she know Rust?"),
            turn(ChatRole::Assistant, "Yes, listed under skills."),
        ];
        let msgs = build_messages(&history, "Any internships?");
        assert_eq!(msgs.len(), 3);
        assert_eq!(msgs[2].role, ChatRole::User);
        assert_eq!(msgs[2].content, "Any internships?");
    }

    #[test]
    fn test_build_messages_drops_leading_assistant_and_merges() {
        let history = vec![
            turn(ChatRole::Assistant, "Welcome"),
            turn(ChatRole::User, "First"),
            turn(ChatRole::User, "Second"),
            turn(ChatRole::Assistant, "  "),
        ];
        let msgs = build_messages(&history, "Third");
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].role, ChatRole::User);
        assert_eq!(msgs[0].content, "First\n\nSecond\n\nThird");
    }

    #[test]
    fn test_role_serializes_for_anthropic() {
        let msg = AnthropicMessage {
            role: ChatRole::Assistant,
            content: "ok".into(),
        };
        assert_eq!(
            serde_json::to_string(&msg).unwrap(),
            r#"{"role":"assistant","content":"ok"}"#
        );
    }
}
