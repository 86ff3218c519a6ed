//! Optional LLM-backed label refinement.
//!
//! A [`Summarizer`] takes a cluster's keyword-derived label and a handful of
//! representative memory snippets and may return a sharper label. Any
//! failure here is swallowed by the caller: labeling must never block a
//! graph build on an LLM being unreachable.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::error::TopicsError;

#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, label_hint: &str, snippets: &[String]) -> Result<String, TopicsError>;
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

/// Summarizer backed by an OpenAI-compatible `/chat/completions` endpoint.
pub struct LlmSummarizer {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
}

impl LlmSummarizer {
    pub fn new(endpoint: String, api_key: Option<String>, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
            api_key,
            model,
        }
    }

    const MAX_SNIPPETS: usize = 5;
}

#[async_trait]
impl Summarizer for LlmSummarizer {
    async fn summarize(&self, label_hint: &str, snippets: &[String]) -> Result<String, TopicsError> {
        let body = snippets
            .iter()
            .take(Self::MAX_SNIPPETS)
            .enumerate()
            .map(|(i, s)| format!("{}. {}", i + 1, s))
            .collect::<Vec<_>>()
            .join("\n");

        let prompt = format!(
            "These memories were grouped under the working label \"{label_hint}\". \
             Suggest a short (2-5 word) topic label that captures them:\n{body}"
        );

        let req = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens: 16,
        };

        let mut http_req = self.client.post(&self.endpoint).json(&req);
        if let Some(key) = &self.api_key {
            http_req = http_req.bearer_auth(key);
        }

        let resp = http_req
            .send()
            .await
            .map_err(|e| TopicsError::Backend(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(TopicsError::Backend(format!(
                "summarizer endpoint returned {}",
                resp.status()
            )));
        }

        let parsed: ChatResponse = resp
            .json()
            .await
            .map_err(|e| TopicsError::Backend(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| TopicsError::Backend("empty summarizer response".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingSummarizer;

    #[async_trait]
    impl Summarizer for FailingSummarizer {
        async fn summarize(&self, _label_hint: &str, _snippets: &[String]) -> Result<String, TopicsError> {
            Err(TopicsError::Backend("unreachable".to_string()))
        }
    }

    #[tokio::test]
    async fn test_failing_summarizer_returns_error_not_panic() {
        let summarizer = FailingSummarizer;
        let result = summarizer.summarize("apples", &["eating an apple".to_string()]).await;
        assert!(result.is_err());
    }
}
