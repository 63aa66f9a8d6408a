use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use shelfsense_core::config::{LlmConfig, LlmProvider};
use thiserror::Error;
use tracing::{debug, info, warn};

const BACKOFF_BASE_MS: u64 = 250;
const BACKOFF_CAP_MS: u64 = 4_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: MessageRole::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: MessageRole::User, content: content.into() }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub stop: Vec<String>,
    pub temperature: f32,
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("no API key configured for provider `{provider}`")]
    MissingApiKey { provider: String },
    #[error("provider rejected credentials (HTTP {status})")]
    Authentication { status: u16 },
    #[error("provider unreachable: {0}")]
    Unreachable(String),
    #[error("provider returned HTTP {status}: {body}")]
    Api { status: u16, body: String },
    #[error("unexpected provider response: {0}")]
    InvalidResponse(String),
}

impl LlmError {
    /// Missing or rejected credentials; the planner cannot be built.
    pub fn is_authentication(&self) -> bool {
        matches!(self, Self::MissingApiKey { .. } | Self::Authentication { .. })
    }
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    fn model(&self) -> &str;

    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError>;
}

fn backoff(attempt: u32) -> Duration {
    let factor = 1_u64 << attempt.min(16);
    Duration::from_millis(BACKOFF_BASE_MS.saturating_mul(factor).min(BACKOFF_CAP_MS))
}

/// Sends the request built by `build`, retrying throttling, server errors and
/// transport failures up to `max_retries` extra attempts.
async fn send_with_retry<F>(build: F, max_retries: u32) -> Result<Response, LlmError>
where
    F: Fn() -> RequestBuilder,
{
    let mut attempt = 0;
    loop {
        match build().send().await {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    return Ok(response);
                }
                if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                    return Err(LlmError::Authentication { status: status.as_u16() });
                }
                let retryable = status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error();
                if !retryable || attempt >= max_retries {
                    let body = response.text().await.unwrap_or_default();
                    return Err(LlmError::Api { status: status.as_u16(), body });
                }
                warn!(
                    event_name = "llm.request.retry",
                    status = status.as_u16(),
                    attempt,
                    "provider returned a retryable status"
                );
            }
            Err(error) => {
                if attempt >= max_retries {
                    return Err(LlmError::Unreachable(error.to_string()));
                }
                warn!(
                    event_name = "llm.request.retry",
                    error = %error,
                    attempt,
                    "provider request failed"
                );
            }
        }
        tokio::time::sleep(backoff(attempt)).await;
        attempt += 1;
    }
}

fn http_client(timeout_secs: u64) -> Result<Client, LlmError> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs.max(1)))
        .build()
        .map_err(|error| LlmError::Unreachable(error.to_string()))
}

/// Chat-completions client for Groq, OpenAI and other compatible endpoints.
pub struct OpenAiCompatibleClient {
    http: Client,
    base_url: String,
    model: String,
    api_key: SecretString,
    max_retries: u32,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatCompletionChoice>,
}

#[derive(Deserialize)]
struct ChatCompletionChoice {
    message: ChatMessagePayload,
}

#[derive(Deserialize)]
struct ChatMessagePayload {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiCompatibleClient {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: SecretString,
        timeout_secs: u64,
        max_retries: u32,
    ) -> Result<Self, LlmError> {
        Ok(Self {
            http: http_client(timeout_secs)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key,
            max_retries,
        })
    }

    /// Lists models to confirm the endpoint is reachable and the key accepted.
    pub async fn probe(&self) -> Result<(), LlmError> {
        let url = format!("{}/models", self.base_url);
        send_with_retry(
            || self.http.get(&url).bearer_auth(self.api_key.expose_secret()),
            self.max_retries,
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl LlmClient for OpenAiCompatibleClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);
        let mut body = json!({
            "model": self.model,
            "messages": request.messages,
            "temperature": request.temperature,
        });
        if !request.stop.is_empty() {
            body["stop"] = json!(request.stop);
        }

        let response = send_with_retry(
            || self.http.post(&url).bearer_auth(self.api_key.expose_secret()).json(&body),
            self.max_retries,
        )
        .await?;
        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|error| LlmError::InvalidResponse(error.to_string()))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| LlmError::InvalidResponse("response carried no choices".to_string()))?;
        debug!(event_name = "llm.completion", model = %self.model, chars = content.len(), "completion received");
        Ok(content)
    }
}

/// Client for a local Ollama server.
pub struct OllamaClient {
    http: Client,
    base_url: String,
    model: String,
    max_retries: u32,
}

#[derive(Deserialize)]
struct OllamaChatResponse {
    message: ChatMessagePayload,
}

impl OllamaClient {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        timeout_secs: u64,
        max_retries: u32,
    ) -> Result<Self, LlmError> {
        Ok(Self {
            http: http_client(timeout_secs)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            max_retries,
        })
    }

    pub async fn probe(&self) -> Result<(), LlmError> {
        let url = format!("{}/api/tags", self.base_url);
        send_with_retry(|| self.http.get(&url), self.max_retries).await?;
        Ok(())
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        let url = format!("{}/api/chat", self.base_url);
        let mut options = json!({ "temperature": request.temperature });
        if !request.stop.is_empty() {
            options["stop"] = json!(request.stop);
        }
        let body: Value = json!({
            "model": self.model,
            "messages": request.messages,
            "stream": false,
            "options": options,
        });

        let response =
            send_with_retry(|| self.http.post(&url).json(&body), self.max_retries).await?;
        let parsed: OllamaChatResponse = response
            .json()
            .await
            .map_err(|error| LlmError::InvalidResponse(error.to_string()))?;
        parsed
            .message
            .content
            .ok_or_else(|| LlmError::InvalidResponse("response carried no message".to_string()))
    }
}

/// Builds the configured client and probes it. Hosted providers refuse to
/// construct without an API key.
pub async fn connect_llm(config: &LlmConfig) -> Result<Arc<dyn LlmClient>, LlmError> {
    let base_url = config.effective_base_url().to_string();

    let client: Arc<dyn LlmClient> = match config.provider {
        LlmProvider::Groq | LlmProvider::OpenAi => {
            let api_key = config
                .api_key
                .clone()
                .filter(|_| config.has_api_key())
                .ok_or_else(|| LlmError::MissingApiKey {
                    provider: format!("{:?}", config.provider).to_lowercase(),
                })?;
            let client = OpenAiCompatibleClient::new(
                base_url.clone(),
                config.model.clone(),
                api_key,
                config.timeout_secs,
                config.max_retries,
            )?;
            client.probe().await?;
            Arc::new(client)
        }
        LlmProvider::Ollama => {
            let client = OllamaClient::new(
                base_url.clone(),
                config.model.clone(),
                config.timeout_secs,
                config.max_retries,
            )?;
            client.probe().await?;
            Arc::new(client)
        }
    };

    info!(
        event_name = "llm.client.ready",
        provider = ?config.provider,
        model = %config.model,
        base_url = %base_url,
        "language model client ready"
    );
    Ok(client)
}
