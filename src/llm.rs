use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Result, ScrapeError};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Minimal chat-completion client. Credentials and endpoint are explicit
/// constructor inputs; the client never reads process environment itself.
pub struct LlmClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl LlmClient {
    pub fn new(api_key: impl Into<String>, base_url: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check the access key against the service by listing models. Run once
    /// before the first pipeline call.
    pub async fn validate_key(&self) -> Result<()> {
        let response = self
            .http
            .get(format!("{}/models", self.base_url))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| ScrapeError::Api(e.to_string()))?;

        let status = response.status();
        let detail = || format!("{} from {}/models", status, self.base_url);
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(ScrapeError::Credential(detail()));
        }
        if !status.is_success() {
            return Err(ScrapeError::Api(detail()));
        }
        debug!("Validated credentials against {}", self.base_url);
        Ok(())
    }

    /// Issue a chat completion and return the first choice's content.
    pub async fn complete(&self, request: &ChatRequest) -> Result<String> {
        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                warn!("Completion request failed: {}", e);
                ScrapeError::Api(e.to_string())
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(ScrapeError::Credential(format!("{status} from chat/completions")));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Completion API error {}: {}", status, body);
            return Err(ScrapeError::Api(format!("{status}: {body}")));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| ScrapeError::Api(format!("malformed completion response: {e}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| ScrapeError::Api("no choices in completion response".into()))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub response_format: ResponseFormat,
}

#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub role: &'static str,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system",
            content: content.into(),
        }
    }
}

/// Structured-output hint asking the service for a bare JSON object.
#[derive(Debug, Clone, Serialize)]
pub struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

impl ResponseFormat {
    pub fn json_object() -> Self {
        Self { kind: "json_object" }
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: String,
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_and_custom_base_url() {
        let client = LlmClient::new("sk-test", None);
        assert_eq!(client.base_url(), DEFAULT_BASE_URL);
        let client = LlmClient::new("sk-test", Some("https://proxy.local/v1".into()));
        assert_eq!(client.base_url(), "https://proxy.local/v1");
    }

    #[test]
    fn request_serializes_structured_output_hint() {
        let request = ChatRequest {
            model: "gpt-4o".into(),
            messages: vec![Message::system("fill the gaps")],
            max_tokens: 200,
            temperature: 0.25,
            response_format: ResponseFormat::json_object(),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["response_format"]["type"], "json_object");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["max_tokens"], 200);
    }

    #[test]
    fn response_parses_first_choice() {
        let body = r#"{"choices": [{"message": {"role": "assistant", "content": "{}"}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.choices[0].message.content, "{}");
    }
}
