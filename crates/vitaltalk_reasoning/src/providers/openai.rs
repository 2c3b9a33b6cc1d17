//! OpenAI-compatible chat completions provider.
//!
//! Works against api.openai.com and any server exposing the same
//! `/chat/completions` shape (Ollama, vLLM, LM Studio).

use crate::api_types::{Completion, Message, Role, Usage};
use crate::llm::{CompletionParams, LlmClient};
use crate::retry::{with_retry, RetryConfig};
use anyhow::{Context, Result};
use reqwest::Client;
use serde_json::{json, Value};
use std::env;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    retry: RetryConfig,
}

impl OpenAiClient {
    /// Key from `OPENAI_API_KEY`; base URL from the argument, then
    /// `OPENAI_BASE_URL`, then the public endpoint.
    pub fn new(model: &str, base_url: Option<&str>) -> Result<Self> {
        let api_key = env::var("OPENAI_API_KEY").context("OPENAI_API_KEY is not set")?;
        let base_url = base_url
            .map(str::to_string)
            .or_else(|| env::var("OPENAI_BASE_URL").ok())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Self::with_credentials(model, &base_url, &api_key)
    }

    pub fn with_credentials(model: &str, base_url: &str, api_key: &str) -> Result<Self> {
        Ok(Self {
            client: Client::builder().timeout(Duration::from_secs(60)).build()?,
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            retry: RetryConfig::default(),
        })
    }

    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

fn build_openai_messages(system: &str, messages: Vec<Message>) -> Vec<Value> {
    let mut out = vec![json!({"role": "system", "content": system})];
    out.extend(messages.into_iter().map(|m| {
        let role = match m.role {
            Role::User => "user",
            Role::Assistant => "assistant",
        };
        json!({"role": role, "content": m.content})
    }));
    out
}

fn parse_openai_response(body: &Value) -> Result<Completion> {
    let choice = body["choices"]
        .get(0)
        .context("OpenAI response has no choices")?;
    let text = choice["message"]["content"]
        .as_str()
        .unwrap_or_default()
        .to_string();
    let stop_reason = choice["finish_reason"].as_str().map(str::to_string);
    let usage = body.get("usage").map(|u| Usage {
        prompt_tokens: u["prompt_tokens"].as_u64().unwrap_or(0) as u32,
        completion_tokens: u["completion_tokens"].as_u64().unwrap_or(0) as u32,
    });
    Ok(Completion {
        text,
        stop_reason,
        usage,
    })
}

#[async_trait::async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(
        &self,
        system: &str,
        messages: Vec<Message>,
        params: CompletionParams,
    ) -> Result<Completion> {
        let payload = json!({
            "model": self.model,
            "messages": build_openai_messages(system, messages),
            "temperature": params.temperature,
            "max_tokens": params.max_tokens,
        });
        let url = format!("{}/chat/completions", self.base_url);

        let response = with_retry(&self.retry, "OpenAI", || {
            let req = self
                .client
                .post(&url)
                .bearer_auth(&self.api_key)
                .json(&payload);
            async move { req.send().await.context("Failed to send request to OpenAI") }
        })
        .await?;

        let body: Value = response
            .json()
            .await
            .context("Failed to decode OpenAI response")?;
        let completion = parse_openai_response(&body)?;
        if let Some(usage) = completion.usage {
            tracing::debug!(
                "OpenAI {} usage: prompt={} completion={}",
                self.model,
                usage.prompt_tokens,
                usage.completion_tokens
            );
        }
        Ok(completion)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fast_retry() -> RetryConfig {
        RetryConfig {
            max_attempts: 3,
            initial_delay: Duration::from_millis(5),
            max_delay: Duration::from_millis(20),
            backoff_factor: 2.0,
        }
    }

    fn ok_body(text: &str) -> Value {
        json!({
            "choices": [{"message": {"role": "assistant", "content": text}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 12, "completion_tokens": 4}
        })
    }

    #[test]
    fn test_message_conversion() {
        let msgs = build_openai_messages(
            "sys",
            vec![Message::user("hi"), Message::assistant("hello")],
        );
        assert_eq!(msgs.len(), 3);
        assert_eq!(msgs[0]["role"], "system");
        assert_eq!(msgs[1]["content"], "hi");
        assert_eq!(msgs[2]["role"], "assistant");
    }

    #[tokio::test]
    async fn test_complete_against_mock_server() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok_body("SAFE")))
            .mount(&server)
            .await;

        let client = OpenAiClient::with_credentials("gpt-test", &server.uri(), "test-key")
            .unwrap()
            .with_retry_config(fast_retry());
        let completion = client
            .complete("sys", vec![Message::user("reply?")], CompletionParams::default())
            .await
            .unwrap();
        assert_eq!(completion.text, "SAFE");
        assert_eq!(completion.stop_reason.as_deref(), Some("stop"));
        assert_eq!(completion.usage.map(|u| u.prompt_tokens), Some(12));
    }

    #[tokio::test]
    async fn test_retries_server_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok_body("recovered")))
            .mount(&server)
            .await;

        let client = OpenAiClient::with_credentials("gpt-test", &server.uri(), "k")
            .unwrap()
            .with_retry_config(fast_retry());
        let completion = client
            .complete("sys", vec![], CompletionParams::default())
            .await
            .unwrap();
        assert_eq!(completion.text, "recovered");
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .expect(1)
            .mount(&server)
            .await;

        let client = OpenAiClient::with_credentials("gpt-test", &server.uri(), "k")
            .unwrap()
            .with_retry_config(fast_retry());
        let err = client
            .complete("sys", vec![], CompletionParams::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("401"));
    }
}
