//! Chat completions client for the hosted inference endpoint
//!
//! Thin request/response wrapper: no retry beyond what reqwest itself
//! does, one `ModelError` surface for every failure shape. Streaming
//! yields fragments over an mpsc channel in emission order; the stream is
//! finite and non-restartable.

use crate::sse::{SseParser, StreamEvent};
use crate::types::{ChatMessage, ChatRequest, ChatResponse};
use futures::StreamExt;
use skiff_core::config::ModelEndpointConfig;
use skiff_core::{Result, SkiffConfig, SkiffError};
use std::env;
use std::time::Duration;
use tokio::sync::mpsc;

/// Capacity of the chunk channel handed to the caller
const STREAM_CHANNEL_CAPACITY: usize = 32;

/// Seam between the agent loop and the inference endpoint
///
/// Production uses [`ModelClient`]; tests substitute a scripted fake.
#[async_trait::async_trait]
pub trait ChatBackend: Send + Sync + 'static {
    /// One-shot completion
    async fn complete(&self, messages: Vec<ChatMessage>) -> Result<String>;

    /// Streamed completion; fragments concatenate in arrival order to the
    /// full reply
    async fn complete_stream(
        &self,
        messages: Vec<ChatMessage>,
    ) -> Result<mpsc::Receiver<Result<String>>>;

    /// Vision completion over one inline image
    async fn describe(&self, prompt: &str, mime: &str, image_base64: &str) -> Result<String>;
}

/// Client for an OpenAI-compatible chat completions endpoint
#[derive(Debug, Clone)]
pub struct ModelClient {
    http: reqwest::Client,
    text: ModelEndpointConfig,
    vision: ModelEndpointConfig,
}

impl ModelClient {
    /// Build a client from the `[model]` / `[vision]` config sections
    pub fn from_config(config: &SkiffConfig) -> Result<Self> {
        // No client-level timeout: it would cap the whole streamed body.
        // Non-streaming requests get a per-request timeout instead.
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| SkiffError::Model(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            text: config.model.clone(),
            vision: config.vision_or_model().clone(),
        })
    }

    fn completions_url(cfg: &ModelEndpointConfig) -> String {
        format!("{}/chat/completions", cfg.base_url.trim_end_matches('/'))
    }

    /// Resolve the API key from the environment variable named in config
    fn api_key(cfg: &ModelEndpointConfig) -> Result<String> {
        env::var(&cfg.api_key_env).map_err(|_| {
            SkiffError::Auth(format!(
                "No API key found. Set {} in the environment.",
                cfg.api_key_env
            ))
        })
    }

    async fn request_completion(
        &self,
        cfg: &ModelEndpointConfig,
        messages: Vec<ChatMessage>,
    ) -> Result<String> {
        let api_key = Self::api_key(cfg)?;
        let request = ChatRequest {
            model: cfg.model.clone(),
            messages,
            max_tokens: cfg.max_tokens,
            temperature: cfg.temperature,
            stream: false,
        };

        tracing::debug!("Requesting completion from model {}", cfg.model);

        let response = self
            .http
            .post(Self::completions_url(cfg))
            .bearer_auth(&api_key)
            .timeout(Duration::from_secs(cfg.request_timeout_secs))
            .json(&request)
            .send()
            .await
            .map_err(|e| SkiffError::Model(format!("Failed to send request: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown".to_string());
            if status.as_u16() == 401 || status.as_u16() == 403 {
                return Err(SkiffError::Auth(format!(
                    "Endpoint rejected credentials ({}): {}",
                    status, error_text
                )));
            }
            return Err(SkiffError::Model(format!(
                "Endpoint error {}: {}",
                status, error_text
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| SkiffError::Model(format!("Failed to parse response: {}", e)))?;

        let content = parsed
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .ok_or_else(|| SkiffError::Model("No content in response".to_string()))?;

        if let Some(usage) = parsed.usage {
            tracing::info!(
                "Completion done ({} chars, {} prompt tokens, {} completion tokens)",
                content.len(),
                usage.prompt_tokens,
                usage.completion_tokens
            );
        }

        Ok(content)
    }
}

#[async_trait::async_trait]
impl ChatBackend for ModelClient {
    async fn complete(&self, messages: Vec<ChatMessage>) -> Result<String> {
        self.request_completion(&self.text, messages).await
    }

    async fn complete_stream(
        &self,
        messages: Vec<ChatMessage>,
    ) -> Result<mpsc::Receiver<Result<String>>> {
        let cfg = &self.text;
        let api_key = Self::api_key(cfg)?;
        let request = ChatRequest {
            model: cfg.model.clone(),
            messages,
            max_tokens: cfg.max_tokens,
            temperature: cfg.temperature,
            stream: true,
        };

        tracing::debug!("Opening completion stream from model {}", cfg.model);

        let response = self
            .http
            .post(Self::completions_url(cfg))
            .bearer_auth(&api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| SkiffError::Model(format!("Failed to open stream: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown".to_string());
            return Err(SkiffError::Model(format!(
                "Endpoint error {}: {}",
                status, error_text
            )));
        }

        let (tx, rx) = mpsc::channel(STREAM_CHANNEL_CAPACITY);

        tokio::spawn(async move {
            let mut body = response.bytes_stream();
            let mut parser = SseParser::new();

            while let Some(chunk) = body.next().await {
                let bytes = match chunk {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        let _ = tx
                            .send(Err(SkiffError::Model(format!(
                                "Stream transport error: {}",
                                e
                            ))))
                            .await;
                        return;
                    }
                };

                for event in parser.feed(&bytes) {
                    match event {
                        StreamEvent::Content(fragment) => {
                            // Receiver dropped means the channel went away
                            if tx.send(Ok(fragment)).await.is_err() {
                                return;
                            }
                        }
                        StreamEvent::Done => return,
                    }
                }
            }
        });

        Ok(rx)
    }

    async fn describe(&self, prompt: &str, mime: &str, image_base64: &str) -> Result<String> {
        let message = ChatMessage::user_with_image(prompt, mime, image_base64);
        self.request_completion(&self.vision, vec![message]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completions_url_joining() {
        let mut cfg = ModelEndpointConfig::default();
        cfg.base_url = "https://api.openai.com/v1".to_string();
        assert_eq!(
            ModelClient::completions_url(&cfg),
            "https://api.openai.com/v1/chat/completions"
        );

        cfg.base_url = "http://localhost:8080/v1/".to_string();
        assert_eq!(
            ModelClient::completions_url(&cfg),
            "http://localhost:8080/v1/chat/completions"
        );
    }

    #[test]
    fn test_missing_api_key_is_auth_error() {
        let mut cfg = ModelEndpointConfig::default();
        cfg.api_key_env = "SKIFF_TEST_KEY_THAT_DOES_NOT_EXIST".to_string();
        let err = ModelClient::api_key(&cfg).unwrap_err();
        assert!(matches!(err, SkiffError::Auth(_)));
    }
}
