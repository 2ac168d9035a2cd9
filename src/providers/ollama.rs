use async_trait::async_trait;
use log::{debug, error};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::errors::ProviderError;
use crate::providers::{CompletionRequest, Provider};

/// Default Ollama endpoint
pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434";

/// Default request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Ollama client for interacting with Ollama API
#[derive(Debug, Clone)]
pub struct Ollama {
    /// Base URL of the Ollama API, without a trailing slash
    base_url: String,
    /// HTTP client for making requests
    client: Client,
}

/// Generation options for the Ollama API
#[derive(Debug, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Temperature for generation
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

/// Chat message object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message sender (system, user or assistant)
    pub role: String,
    /// Content of the message
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system".to_string(), content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".to_string(), content: content.into() }
    }
}

/// Chat request for the Ollama API
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Model name to use for generation
    model: String,
    /// Messages of the conversation
    messages: Vec<ChatMessage>,
    /// Whether to stream the response
    stream: bool,
    /// Additional model parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<GenerationOptions>,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            stream: false,
            options: None,
        }
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.options = Some(GenerationOptions { temperature: Some(temperature) });
        self
    }
}

impl From<CompletionRequest> for ChatRequest {
    fn from(request: CompletionRequest) -> Self {
        Self::new(
            request.model,
            vec![ChatMessage::system(request.system), ChatMessage::user(request.user)],
        )
        .temperature(request.temperature)
    }
}

/// Chat response from the Ollama API
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Model name
    #[serde(default)]
    pub model: String,
    /// Response message
    pub message: ChatMessage,
    /// Whether the generation is complete
    #[serde(default)]
    pub done: bool,
}

/// One installed model, as listed by `/api/tags`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub modified_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelInfo>,
}

/// Normalize a user-supplied endpoint into a base URL.
///
/// A missing scheme defaults to http, and a trailing `/api/chat` or `/api` is
/// dropped so both `localhost:11434` and `http://host:11434/api/chat` work.
pub fn normalize_endpoint(endpoint: &str) -> Result<String, ProviderError> {
    let endpoint = endpoint.trim();
    if endpoint.is_empty() {
        return Err(ProviderError::ConnectionError("Endpoint cannot be empty".to_string()));
    }

    let url = if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        Url::parse(endpoint)
    } else {
        Url::parse(&format!("http://{}", endpoint))
    }
    .map_err(|e| ProviderError::ConnectionError(format!("Invalid endpoint {}: {}", endpoint, e)))?;

    if url.host_str().is_none() {
        return Err(ProviderError::ConnectionError(format!("Invalid host in endpoint: {}", endpoint)));
    }

    let mut base = url.as_str().trim_end_matches('/').to_string();
    for suffix in ["/api/chat", "/api"] {
        if let Some(stripped) = base.strip_suffix(suffix) {
            base = stripped.to_string();
            break;
        }
    }
    Ok(base)
}

/// Keep log lines short when a service answers with a wall of text
fn preview(text: &str) -> String {
    if text.chars().count() > 500 {
        text.chars().take(500).collect()
    } else {
        text.to_string()
    }
}

/// Pull the message out of an Ollama error body (`{"error": "..."}`)
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| value.get("error").and_then(|v| v.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

/// Parse a chat response body.
///
/// Some proxies ignore `stream: false` and send JSON lines instead; in that
/// case the message fragments are concatenated in order.
fn parse_chat_body(body: &str) -> Result<String, ProviderError> {
    match serde_json::from_str::<ChatResponse>(body) {
        Ok(response) => Ok(response.message.content),
        Err(e) => {
            let mut content = String::new();
            let mut found = false;
            for line in body.lines().filter(|line| !line.trim().is_empty()) {
                let Ok(value) = serde_json::from_str::<serde_json::Value>(line) else {
                    continue;
                };
                if let Some(part) = value.get("message").and_then(|m| m.get("content")).and_then(|v| v.as_str()) {
                    content.push_str(part);
                    found = true;
                }
            }

            if found {
                debug!("Parsed streamed chat response ({} chars)", content.len());
                Ok(content)
            } else {
                error!("Failed to parse Ollama API chat response: {}. Raw response (first 500 chars): {}", e, preview(body));
                Err(ProviderError::ParseError(format!("Response has no message content: {}", e)))
            }
        }
    }
}

impl Ollama {
    /// Create a client for the given endpoint with the default timeout
    pub fn new(endpoint: &str) -> Result<Self, ProviderError> {
        Self::new_with_config(endpoint, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create a client with an explicit per-request timeout
    pub fn new_with_config(endpoint: &str, timeout: Duration) -> Result<Self, ProviderError> {
        let base_url = normalize_endpoint(endpoint)?;
        let client = Client::builder()
            .timeout(timeout)
            // Ollama speaks HTTP/1.1
            .http1_only()
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .build()
            .map_err(|e| ProviderError::ConnectionError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { base_url, client })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn read_error(response: reqwest::Response) -> ProviderError {
        let status = response.status();
        let body = response.text().await.unwrap_or_else(|_| "Failed to get error response text".to_string());
        let message = error_message(&body);
        error!("Ollama API error ({}): {}", status, message);
        ProviderError::ApiError { status_code: status.as_u16(), message }
    }

    /// Send one chat request. No retries happen here.
    pub async fn chat(&self, request: ChatRequest) -> Result<String, ProviderError> {
        let url = format!("{}/api/chat", self.base_url);
        debug!("POST {} (model {})", url, request.model);

        let response = self.client.post(&url).json(&request).send().await?;
        if !response.status().is_success() {
            return Err(Self::read_error(response).await);
        }

        let body = response.text().await?;
        parse_chat_body(&body)
    }

    /// List the models installed on the server
    pub async fn list_models(&self) -> Result<Vec<ModelInfo>, ProviderError> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(Self::read_error(response).await);
        }

        let body = response.text().await?;
        let tags: TagsResponse = serde_json::from_str(&body)
            .map_err(|e| ProviderError::ParseError(format!("Invalid model list: {}", e)))?;
        Ok(tags.models)
    }

    /// Get the Ollama API version
    pub async fn version(&self) -> Result<String, ProviderError> {
        let url = format!("{}/api/version", self.base_url);
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(Self::read_error(response).await);
        }

        let value: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(format!("Failed to parse Ollama version response: {}", e)))?;

        value["version"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ProviderError::ParseError("Invalid version format in response".to_string()))
    }
}

#[async_trait]
impl Provider for Ollama {
    async fn complete(&self, request: CompletionRequest) -> Result<String, ProviderError> {
        self.chat(ChatRequest::from(request)).await
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        let version = self.version().await?;
        debug!("Connected to Ollama {} at {}", version, self.base_url);
        Ok(())
    }
}
