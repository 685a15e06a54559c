use crate::domain::ports::TextGenerator;
use crate::utils::error::{PlannerError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_CHAT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "gpt-4";
pub const DEFAULT_GENERATOR_TIMEOUT_SECS: u64 = 30;

const SERVICE: &str = "generator";

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// Chat-completions client implementing [`TextGenerator`].
pub struct OpenAiGenerator {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    timeout: Duration,
}

impl OpenAiGenerator {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            model: model.into(),
            timeout: Duration::from_secs(DEFAULT_GENERATOR_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl TextGenerator for OpenAiGenerator {
    async fn generate(&self, prompt: &str, temperature: f32) -> Result<String> {
        let body = ChatRequest {
            model: &self.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature,
        };

        tracing::debug!("📡 Calling {} (model {}, temperature {})", self.endpoint, self.model, temperature);

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| PlannerError::external(SERVICE, e))?;

        let status = response.status();
        tracing::debug!("📡 Generator response status: {}", status);

        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(PlannerError::ExternalServiceError {
                service: SERVICE.to_string(),
                message: format!("status {}: {}", status, detail.trim()),
            });
        }

        let completion: ChatResponse = response
            .json()
            .await
            .map_err(|e| PlannerError::external(SERVICE, e))?;

        // 沒有任何 choice 代表服務端異常，不是生成內容的格式問題
        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| PlannerError::ExternalServiceError {
                service: SERVICE.to_string(),
                message: "completion contained no message content".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn completion(content: &str) -> serde_json::Value {
        serde_json::json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "choices": [
                {"index": 0, "message": {"role": "assistant", "content": content}, "finish_reason": "stop"}
            ]
        })
    }

    #[tokio::test]
    async fn test_generate_returns_first_choice_content() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(POST)
                .path("/v1/chat/completions")
                .header("authorization", "Bearer test-key")
                .json_body_partial(r#"{"model": "gpt-4", "temperature": 0.5}"#)
                .body_contains("grocery trip");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(completion(r#"["tofu"]"#));
        });

        let generator = OpenAiGenerator::new(server.url("/v1/chat/completions"), "test-key", "gpt-4");
        let text = generator.generate("plan a grocery trip", 0.5).await.unwrap();

        api_mock.assert();
        assert_eq!(text, r#"["tofu"]"#);
    }

    #[tokio::test]
    async fn test_generate_non_success_is_external_error() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(429).body("rate limited");
        });

        let generator = OpenAiGenerator::new(server.url("/v1/chat/completions"), "test-key", "gpt-4");
        let err = generator.generate("hello", 0.7).await.unwrap_err();

        api_mock.assert();
        match err {
            PlannerError::ExternalServiceError { service, message } => {
                assert_eq!(service, "generator");
                assert!(message.contains("429"));
                assert!(message.contains("rate limited"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_generate_without_choices_is_external_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(200).json_body(serde_json::json!({"choices": []}));
        });

        let generator = OpenAiGenerator::new(server.url("/v1/chat/completions"), "test-key", "gpt-4");
        let err = generator.generate("hello", 0.7).await.unwrap_err();

        assert!(matches!(err, PlannerError::ExternalServiceError { .. }));
    }

    #[tokio::test]
    async fn test_generate_timeout_is_external_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(200)
                .delay(Duration::from_millis(1500))
                .json_body(completion("too late"));
        });

        let generator = OpenAiGenerator::new(server.url("/v1/chat/completions"), "test-key", "gpt-4")
            .with_timeout(Duration::from_millis(200));
        let err = generator.generate("hello", 0.7).await.unwrap_err();

        match err {
            PlannerError::ExternalServiceError { message, .. } => {
                assert!(message.contains("timed out"))
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
