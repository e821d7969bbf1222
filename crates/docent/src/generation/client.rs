//! OpenAI-compatible chat client
//!
//! One client serves both flavors of provider call: non-streaming
//! completions with 429-aware exponential backoff, and streaming
//! completions that push each content delta into a `TokenHandler` as it
//! arrives off the wire.

use std::time::Duration;

use bytes::Bytes;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use url::Url;

use crate::config::GenerationConfig;
use crate::error::{DocentError, Result};
use crate::streaming::TokenHandler;

use super::sse::{SseDecoder, SseEvent, parse_content_delta};

const MAX_RETRIES: u32 = 3;

/// Chat message in the provider request
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    role: String,
    content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Chat completion request body
#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    temperature: f32,
    stream: bool,
}

/// Non-streaming chat completion response
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

/// Client for an OpenAI-compatible chat completions endpoint.
#[derive(Debug)]
pub struct ChatClient {
    client: Client,
    config: GenerationConfig,
    api_key: String,
}

impl ChatClient {
    /// Create a client with an explicit API key.
    pub fn new(config: GenerationConfig, api_key: impl Into<String>) -> Result<Self> {
        Url::parse(&config.api_url)
            .map_err(|e| DocentError::Config(format!("Invalid api_url '{}': {e}", config.api_url)))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DocentError::Generation(format!("Failed to create HTTP client: {e}")))?;

        info!(
            "ChatClient initialized with api_url: {}, answer_model: {}",
            config.api_url, config.answer_model
        );

        Ok(Self {
            client,
            config,
            api_key: api_key.into(),
        })
    }

    /// Create a client reading the API key from the environment variable
    /// named in the config.
    pub fn from_env(config: GenerationConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            DocentError::Config(format!("API key env var '{}' not set", config.api_key_env))
        })?;
        Self::new(config, api_key)
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    fn completions_url(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.api_url.trim_end_matches('/')
        )
    }

    /// Non-streaming completion with exponential backoff on rate limiting.
    ///
    /// Makes up to 3 attempts with backoff delays of 1s, 2s on 429 errors
    /// and transport failures.
    pub async fn complete(
        &self,
        model: &str,
        messages: &[Message],
        temperature: f32,
    ) -> Result<String> {
        let request = ChatCompletionRequest {
            model,
            messages,
            temperature,
            stream: false,
        };

        let url = self.completions_url();
        debug!("Calling completion endpoint at: {}", url);

        let mut last_error = None;
        let mut delay = Duration::from_secs(1);

        for attempt in 0..MAX_RETRIES {
            match self
                .client
                .post(&url)
                .header("Authorization", format!("Bearer {}", self.api_key))
                .json(&request)
                .send()
                .await
            {
                Ok(response) => {
                    let status = response.status();

                    if status == 429 {
                        warn!(
                            "Rate limited on attempt {}/{}, waiting {:?}",
                            attempt + 1,
                            MAX_RETRIES,
                            delay
                        );
                        tokio::time::sleep(delay).await;
                        delay *= 2;
                        continue;
                    }

                    if !status.is_success() {
                        let error_text = response
                            .text()
                            .await
                            .unwrap_or_else(|_| "Unknown error".to_string());
                        return Err(DocentError::Generation(format!(
                            "API returned {status}: {error_text}"
                        )));
                    }

                    let completion: ChatCompletionResponse = response
                        .json()
                        .await
                        .map_err(|e| DocentError::Generation(format!("Invalid response: {e}")))?;

                    return completion
                        .choices
                        .into_iter()
                        .next()
                        .map(|c| c.message.content)
                        .ok_or_else(|| DocentError::Generation("Empty response".to_string()));
                }
                Err(e) => {
                    let err_msg = e.to_string();
                    last_error = Some(err_msg.clone());
                    if attempt < MAX_RETRIES - 1 {
                        warn!(
                            "Request failed on attempt {}/{}, retrying: {}",
                            attempt + 1,
                            MAX_RETRIES,
                            err_msg
                        );
                        tokio::time::sleep(delay).await;
                        delay *= 2;
                    }
                }
            }
        }

        Err(DocentError::Generation(format!(
            "Failed after {} retries: {}",
            MAX_RETRIES,
            last_error.unwrap_or_else(|| "Unknown error".to_string())
        )))
    }

    /// Streaming completion. Each content delta is pushed into `handler`
    /// in arrival order; the accumulated text is returned once the stream
    /// finishes. Mid-stream failures return an error; termination of the
    /// client-facing stream is the orchestrator's job, not this method's.
    pub async fn stream<H>(
        &self,
        model: &str,
        messages: &[Message],
        temperature: f32,
        handler: &mut H,
    ) -> Result<String>
    where
        H: TokenHandler + ?Sized,
    {
        let request = ChatCompletionRequest {
            model,
            messages,
            temperature,
            stream: true,
        };

        let url = self.completions_url();
        debug!("Calling streaming endpoint at: {}", url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| DocentError::Generation(format!("Request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(DocentError::Generation(format!(
                "API returned {status}: {error_text}"
            )));
        }

        let mut body = response.bytes_stream();
        let mut decoder = SseDecoder::new();
        let mut pending: Vec<u8> = Vec::new();
        let mut full = String::new();

        while let Some(chunk) = body.next().await {
            let chunk: Bytes =
                chunk.map_err(|e| DocentError::Generation(format!("Stream read failed: {e}")))?;

            // Carry incomplete UTF-8 sequences over to the next chunk
            pending.extend_from_slice(&chunk);
            let valid_len = match std::str::from_utf8(&pending) {
                Ok(_) => pending.len(),
                Err(e) => e.valid_up_to(),
            };
            let text = String::from_utf8_lossy(&pending[..valid_len]).into_owned();
            pending.drain(..valid_len);

            for event in decoder.feed(&text) {
                match event {
                    SseEvent::Done => return Ok(full),
                    SseEvent::Data(data) => {
                        if let Some(delta) = parse_content_delta(&data) {
                            full.push_str(&delta);
                            handler.on_token(&delta);
                        }
                    }
                }
            }
        }

        // Provider closed the connection without [DONE]; treat whatever
        // arrived as the completion.
        if let Some(SseEvent::Data(data)) = decoder.finish() {
            if let Some(delta) = parse_content_delta(&data) {
                full.push_str(&delta);
                handler.on_token(&delta);
            }
        }

        Ok(full)
    }
}
