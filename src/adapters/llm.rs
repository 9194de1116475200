use crate::domain::model::{ChatMessage, ChatOptions};
use crate::domain::ports::ChatClient;
use crate::utils::error::{MetricsError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Settings for an OpenAI-compatible chat-completions endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    /// Base URL including the version segment, e.g. `https://api.openai.com/v1`.
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: Option<f32>,
    pub timeout_seconds: u64,
    pub max_retries: u32,
    /// First backoff delay; doubles on each retry.
    pub retry_base_delay_ms: u64,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            temperature: None,
            timeout_seconds: 60,
            max_retries: 2,
            retry_base_delay_ms: 1000,
        }
    }
}

impl OpenAiConfig {
    /// Defaults overridden by `OPENAI_BASE_URL`, `OPENAI_API_KEY` and `LLM_MODEL`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(base_url) = std::env::var("OPENAI_BASE_URL") {
            config.base_url = base_url;
        }
        config.api_key = std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty());
        if let Ok(model) = std::env::var("LLM_MODEL") {
            config.model = model;
        }
        config
    }

    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

pub struct OpenAiChatClient {
    config: OpenAiConfig,
    client: Client,
}

impl OpenAiChatClient {
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &OpenAiConfig {
        &self.config
    }

    fn build_messages(prompt: &str, options: &ChatOptions) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(options.history.len() + 2);
        if let Some(system) = &options.system_message {
            messages.push(ChatMessage::system(system.clone()));
        }
        messages.extend(options.history.iter().cloned());
        messages.push(ChatMessage::user(prompt));
        messages
    }

    async fn try_request(&self, request: &ChatCompletionsRequest<'_>) -> Result<String> {
        let url = self.config.completions_url();

        let mut request_builder = self.client.post(&url).json(request);
        if let Some(api_key) = &self.config.api_key {
            request_builder = request_builder.bearer_auth(api_key);
        }

        let response = request_builder.send().await?;
        let status = response.status();

        tracing::info!(
            "HTTP Request: POST {} \"{} {}\"",
            url,
            status.as_u16(),
            status.canonical_reason().unwrap_or("")
        );

        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(MetricsError::LlmError {
                status: status.as_u16(),
                message,
            });
        }

        let completion: ChatCompletionsResponse = response.json().await?;
        if let Some(usage) = &completion.usage {
            tracing::debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                total_tokens = usage.total_tokens,
                "chat completion usage"
            );
        }

        Ok(completion
            .choices
            .into_iter()
            .filter_map(|choice| choice.message.content)
            .collect::<Vec<_>>()
            .join(""))
    }
}

fn is_retryable(err: &MetricsError) -> bool {
    match err {
        MetricsError::ApiError(_) => true,
        MetricsError::LlmError { status, .. } => *status == 429 || *status >= 500,
        _ => false,
    }
}

#[async_trait]
impl ChatClient for OpenAiChatClient {
    async fn chat(&self, prompt: &str, options: &ChatOptions) -> Result<String> {
        let messages = Self::build_messages(prompt, options);
        let request = ChatCompletionsRequest {
            model: options.model.as_deref().unwrap_or(&self.config.model),
            messages: &messages,
            stream: false,
            temperature: self.config.temperature,
        };

        let mut attempt = 0;
        loop {
            match self.try_request(&request).await {
                Ok(content) => return Ok(content),
                Err(e) if attempt < self.config.max_retries && is_retryable(&e) => {
                    let delay = self.config.retry_base_delay_ms.saturating_mul(1 << attempt);
                    attempt += 1;
                    tracing::warn!(
                        "Chat completion failed (attempt {}/{}): {}, retrying in {}ms",
                        attempt,
                        self.config.max_retries + 1,
                        e,
                        delay
                    );
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionsRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionsResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: usize,
    completion_tokens: usize,
    total_tokens: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn client_for(server: &MockServer, max_retries: u32) -> OpenAiChatClient {
        OpenAiChatClient::new(OpenAiConfig {
            base_url: server.url("/v1"),
            api_key: Some("sk-test".to_string()),
            max_retries,
            retry_base_delay_ms: 5,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_completions_url_trims_trailing_slash() {
        let config = OpenAiConfig {
            base_url: "http://localhost:1234/v1/".to_string(),
            ..Default::default()
        };
        assert_eq!(config.completions_url(), "http://localhost:1234/v1/chat/completions");
    }

    #[test]
    fn test_build_messages_order() {
        let options = ChatOptions {
            model: None,
            system_message: Some("be brief".to_string()),
            history: vec![ChatMessage::user("earlier question")],
        };
        let messages = OpenAiChatClient::build_messages("what is Base tvl", &options);

        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0], ChatMessage::system("be brief"));
        assert_eq!(messages[1].content, "earlier question");
        assert_eq!(messages[2], ChatMessage::user("what is Base tvl"));
    }

    #[tokio::test]
    async fn test_chat_sends_bearer_auth_and_joins_choices() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(POST)
                .path("/v1/chat/completions")
                .header("Authorization", "Bearer sk-test")
                .json_body_partial(r#"{"model": "gpt-4o-mini", "stream": false}"#);
            then.status(200).json_body(json!({
                "id": "chatcmpl-1",
                "choices": [
                    {"index": 0, "message": {"role": "assistant", "content": "Base TVL "}},
                    {"index": 1, "message": {"role": "assistant", "content": "is $3.1B"}},
                    {"index": 2, "message": {"role": "assistant", "content": null}}
                ],
                "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
            }));
        });

        let client = client_for(&server, 0);
        let reply = client.chat("what is Base tvl", &ChatOptions::default()).await.unwrap();

        api_mock.assert();
        assert_eq!(reply, "Base TVL is $3.1B");
    }

    #[tokio::test]
    async fn test_model_override_is_sent() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(POST)
                .path("/v1/chat/completions")
                .json_body_partial(r#"{"model": "gpt-4o"}"#);
            then.status(200)
                .json_body(json!({"choices": [{"message": {"content": "ok"}}]}));
        });

        let client = client_for(&server, 0);
        let reply = client.chat("hi", &ChatOptions::with_model("gpt-4o")).await.unwrap();

        api_mock.assert();
        assert_eq!(reply, "ok");
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(401).body("invalid api key");
        });

        let client = client_for(&server, 3);
        let err = client.chat("hi", &ChatOptions::default()).await.unwrap_err();

        api_mock.assert_hits(1);
        match err {
            MetricsError::LlmError { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "invalid api key");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_server_error_is_retried() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(503);
        });

        let client = client_for(&server, 2);
        let err = client.chat("hi", &ChatOptions::default()).await.unwrap_err();

        api_mock.assert_hits(3);
        assert!(matches!(err, MetricsError::LlmError { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_rate_limit_is_retried_up_to_max_retries() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(429).body("rate limited");
        });

        let client = client_for(&server, 3);
        let err = client.chat("hi", &ChatOptions::default()).await.unwrap_err();

        // 第一次 + 3 次重試
        api_mock.assert_hits(4);
        assert!(matches!(err, MetricsError::LlmError { status: 429, .. }));
    }
}
