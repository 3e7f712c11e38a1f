//! HTTP client for OpenAI-compatible chat completion endpoints

use super::{CompletionRequest, CompletionResponse, LlmService, TokenStream};
use crate::config::LlmConfig;
use crate::error::{PipelineError, Result};
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    max_tokens: u32,
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

/// Chat completion client with retry logic
pub struct OpenAiCompatibleClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    max_retries: u32,
    retry_delay_ms: u64,
}

impl OpenAiCompatibleClient {
    /// Create a new client from configuration
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| PipelineError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            max_retries: config.max_retries,
            retry_delay_ms: config.retry_delay_ms,
        })
    }

    fn chat_request<'a>(&'a self, request: &'a CompletionRequest, stream: bool) -> ChatRequest<'a> {
        let mut messages = Vec::with_capacity(2);
        if !request.system_prompt.is_empty() {
            messages.push(Message {
                role: "system",
                content: &request.system_prompt,
            });
        }
        messages.push(Message {
            role: "user",
            content: &request.prompt,
        });

        ChatRequest {
            model: &self.model,
            messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            stream,
        }
    }

    async fn send(&self, body: &ChatRequest<'_>) -> Result<reqwest::Response> {
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| PipelineError::Llm(format!("API request failed: {e}")))?;

        match response.status() {
            status if status.is_success() => Ok(response),
            StatusCode::TOO_MANY_REQUESTS => {
                Err(PipelineError::Llm("Rate limit exceeded".to_string()))
            }
            StatusCode::UNAUTHORIZED => {
                Err(PipelineError::Config("Invalid LLM API key".to_string()))
            }
            status => {
                let error_text = response.text().await.unwrap_or_default();
                Err(PipelineError::Llm(format!("API error {status}: {error_text}")))
            }
        }
    }

    /// Send with exponential backoff on transient failures
    async fn send_with_retry(&self, body: &ChatRequest<'_>) -> Result<reqwest::Response> {
        let mut retry_count = 0;
        loop {
            match self.send(body).await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    if retry_count >= self.max_retries || !is_retryable_error(&e) {
                        return Err(e);
                    }

                    retry_count += 1;
                    let delay = calculate_backoff(self.retry_delay_ms, retry_count);
                    warn!("LLM request failed ({e}), retry {retry_count} in {delay}ms");
                    sleep(Duration::from_millis(delay)).await;
                }
            }
        }
    }
}

#[async_trait]
impl LlmService for OpenAiCompatibleClient {
    async fn generate_completion(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let body = self.chat_request(&request, false);
        let response = self.send_with_retry(&body).await?;

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::Llm(format!("Failed to parse response: {e}")))?;

        let content = api_response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .unwrap_or_default();

        debug!("Completion returned {} chars", content.len());
        Ok(CompletionResponse { content })
    }

    async fn generate_streaming_completion(
        &self,
        request: CompletionRequest,
    ) -> Result<TokenStream> {
        let body = self.chat_request(&request, true);
        let response = self.send_with_retry(&body).await?;
        Ok(sse_token_stream(response.bytes_stream()).boxed())
    }
}

/// Check if an error is retryable
fn is_retryable_error(error: &PipelineError) -> bool {
    match error {
        PipelineError::Llm(msg) => {
            msg.contains("Rate limit")
                || msg.contains("timed out")
                || msg.contains("connection")
                || msg.contains("API error 5")
        }
        _ => false,
    }
}

/// Calculate exponential backoff delay
fn calculate_backoff(retry_delay_ms: u64, retry_count: u32) -> u64 {
    retry_delay_ms * 2u64.pow(retry_count.saturating_sub(1))
}

/// One decoded server-sent-events line
#[derive(Debug, PartialEq)]
enum SseLine {
    Token(String),
    Done,
    Ignore,
}

fn parse_sse_line(line: &str) -> Result<SseLine> {
    let Some(data) = line.trim().strip_prefix("data:") else {
        return Ok(SseLine::Ignore);
    };
    let data = data.trim();
    if data == "[DONE]" {
        return Ok(SseLine::Done);
    }
    if data.is_empty() {
        return Ok(SseLine::Ignore);
    }

    let chunk: StreamChunk = serde_json::from_str(data)
        .map_err(|e| PipelineError::Stream(format!("Malformed stream chunk: {e}")))?;
    let token = chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta)
        .and_then(|delta| delta.content)
        .unwrap_or_default();

    Ok(if token.is_empty() {
        SseLine::Ignore
    } else {
        SseLine::Token(token)
    })
}

/// Turn a byte stream of SSE frames into content tokens
///
/// Bytes are buffered per line so multi-byte characters split across
/// network chunks are decoded intact.
fn sse_token_stream<S, B, E>(bytes: S) -> impl Stream<Item = Result<String>> + Send + 'static
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    struct State<S> {
        bytes: std::pin::Pin<Box<S>>,
        buffer: Vec<u8>,
        finished: bool,
    }

    let state = State {
        bytes: Box::pin(bytes),
        buffer: Vec::new(),
        finished: false,
    };

    futures::stream::unfold(state, |mut state| async move {
        loop {
            if state.finished {
                return None;
            }

            if let Some(pos) = state.buffer.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = state.buffer.drain(..=pos).collect();
                match parse_sse_line(&String::from_utf8_lossy(&line)) {
                    Ok(SseLine::Token(token)) => return Some((Ok(token), state)),
                    Ok(SseLine::Done) => return None,
                    Ok(SseLine::Ignore) => continue,
                    Err(e) => {
                        state.finished = true;
                        return Some((Err(e), state));
                    }
                }
            }

            match state.bytes.next().await {
                Some(Ok(chunk)) => state.buffer.extend_from_slice(chunk.as_ref()),
                Some(Err(e)) => {
                    state.finished = true;
                    return Some((Err(PipelineError::Stream(e.to_string())), state));
                }
                None => {
                    // Flush a final line that arrived without a newline
                    state.finished = true;
                    let line = std::mem::take(&mut state.buffer);
                    if let Ok(SseLine::Token(token)) =
                        parse_sse_line(&String::from_utf8_lossy(&line))
                    {
                        return Some((Ok(token), state));
                    }
                    return None;
                }
            }
        }
    })
}

// Internal API response structures
#[derive(Debug, Deserialize)]
struct ApiResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: Option<ChoiceMessage>,
}
