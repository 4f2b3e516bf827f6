//! The optional LLM explainer: an injected capability behind a narrow trait.
//!
//! The orchestration layer only sees [`Explainer`], so tests run against a
//! stub and the real client is swapped in when a credential exists. One
//! outbound request per submission, and only when the caller asks for it.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

/// Environment variable holding the API credential. Absence disables LLM
/// mode; it never causes a failure.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";

const SYSTEM_PROMPT: &str = "You are a precise yet friendly Python tutor. \
Explain code step by step, annotate lines, highlight pitfalls, and suggest \
small refactors. Keep it concise and actionable.";

/// What the explainer is asked to narrate.
#[derive(Debug, Clone)]
pub struct ExplainRequest<'a> {
    /// The submitted code, verbatim.
    pub code: &'a str,
    /// Optional structural context (the summary digest) to ground the answer.
    pub context: Option<String>,
}

/// Ways the LLM call can fail. None of these block the other results.
#[derive(Debug, thiserror::Error)]
pub enum ExplainError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("provider returned {status}: {body}")]
    Provider { status: u16, body: String },

    #[error("malformed provider response: {0}")]
    MalformedResponse(String),
}

/// The narrow capability the orchestration layer depends on.
#[async_trait]
pub trait Explainer: Send + Sync {
    async fn explain(&self, request: ExplainRequest<'_>) -> Result<String, ExplainError>;
}

/// Chat-completions client for OpenAI-compatible endpoints.
pub struct OpenAiExplainer {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiExplainer {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Build from the environment, or `None` when no credential is set.
    pub fn from_env() -> Option<Self> {
        match std::env::var(API_KEY_ENV) {
            Ok(key) if !key.is_empty() => Some(Self::new(key)),
            _ => {
                debug!("{} not set; LLM mode disabled", API_KEY_ENV);
                None
            }
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn user_prompt(request: &ExplainRequest<'_>) -> String {
        let mut prompt = String::from("Explain this Python code for a beginner:\n\n");
        prompt.push_str(request.code);
        if let Some(context) = &request.context {
            prompt.push_str("\n\nStructural notes from a parser:\n");
            prompt.push_str(context);
        }
        prompt.push_str(
            "\n\nFormat:\n\
             1) Summary (2-3 sentences)\n\
             2) Step-by-step walkthrough (bullets)\n\
             3) Key concepts learned\n\
             4) Potential bugs / edge cases\n\
             5) Tiny refactor suggestions",
        );
        prompt
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: String,
}

#[async_trait]
impl Explainer for OpenAiExplainer {
    async fn explain(&self, request: ExplainRequest<'_>) -> Result<String, ExplainError> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": Self::user_prompt(&request) },
            ],
            "temperature": 0.3,
        });

        debug!(model = %self.model, "requesting explanation");
        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExplainError::Provider {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| ExplainError::MalformedResponse(e.to_string()))?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| ExplainError::MalformedResponse("no choices returned".to_string()))?;
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_includes_code_and_context() {
        let prompt = OpenAiExplainer::user_prompt(&ExplainRequest {
            code: "print(1)",
            context: Some("Calls detected: print".to_string()),
        });
        assert!(prompt.contains("print(1)"));
        assert!(prompt.contains("Calls detected: print"));
        assert!(prompt.contains("Step-by-step"));
    }
}
