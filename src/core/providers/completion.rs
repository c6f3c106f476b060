//! Text completion provider client
//!
//! OpenAI-style chat completions over HTTP. Defaults for model,
//! temperature, and token budget come from [`CompletionConfig`], resolved
//! once at construction; requests may override any of them explicitly.

use super::{Provider, ProviderKind};
use crate::config::CompletionConfig;
use crate::utils::error::{GatewayError, Result, classify_status, classify_transport};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::debug;

/// A completion request; immutable value object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// System prompt
    pub system_prompt: String,
    /// User prompt
    pub user_prompt: String,
    /// Sampling temperature override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Completion budget override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Model override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// Token accounting for one completion
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Normalized completion response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionResponse {
    /// Generated text
    pub content: String,
    /// Token usage
    pub tokens: TokenUsage,
    /// Model that produced the response
    pub model: String,
    /// Provider-reported finish reason
    pub finish_reason: String,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireChoiceMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
    #[serde(default)]
    total_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    choices: Vec<WireChoice>,
    #[serde(default)]
    usage: Option<WireUsage>,
    #[serde(default)]
    model: Option<String>,
}

/// HTTP client for the completion provider
pub struct CompletionClient {
    http: reqwest::Client,
    config: CompletionConfig,
}

impl CompletionClient {
    /// Build the client; the HTTP pool is created once and reused
    pub fn new(config: CompletionConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| GatewayError::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { http, config })
    }

    fn resolved_model<'a>(&'a self, request: &'a CompletionRequest) -> &'a str {
        request.model.as_deref().unwrap_or(&self.config.model)
    }

    fn resolved_temperature(&self, request: &CompletionRequest) -> f32 {
        request.temperature.unwrap_or(self.config.temperature)
    }

    fn resolved_max_tokens(&self, request: &CompletionRequest) -> u32 {
        request.max_tokens.unwrap_or(self.config.max_tokens)
    }

    async fn read_error(&self, response: reqwest::Response) -> GatewayError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        let category = classify_status(status, &body);
        GatewayError::provider(
            category,
            format!("completion provider returned HTTP {}", status),
        )
        .with_detail(body)
    }
}

#[async_trait]
impl Provider for CompletionClient {
    type Request = CompletionRequest;
    type Response = CompletionResponse;

    fn kind(&self) -> ProviderKind {
        ProviderKind::Completion
    }

    fn key_fields(&self, request: &Self::Request) -> Vec<String> {
        // Effective parameters, not raw overrides: a request relying on the
        // configured default and one naming it explicitly are the same call.
        vec![
            request.system_prompt.clone(),
            request.user_prompt.clone(),
            self.resolved_model(request).to_string(),
            format!("{:.2}", self.resolved_temperature(request)),
            self.resolved_max_tokens(request).to_string(),
        ]
    }

    async fn call(&self, request: &Self::Request) -> Result<Self::Response> {
        let model = self.resolved_model(request);
        let body = WireRequest {
            model,
            messages: vec![
                WireMessage {
                    role: "system",
                    content: &request.system_prompt,
                },
                WireMessage {
                    role: "user",
                    content: &request.user_prompt,
                },
            ],
            temperature: self.resolved_temperature(request),
            max_tokens: self.resolved_max_tokens(request),
        };

        debug!(model, "calling completion provider");
        let response = self
            .http
            .post(format!("{}/chat/completions", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                GatewayError::provider(classify_transport(&e), "completion request failed")
                    .with_detail(e.to_string())
            })?;

        if !response.status().is_success() {
            return Err(self.read_error(response).await);
        }

        let wire: WireResponse = response.json().await.map_err(|e| {
            GatewayError::provider(
                crate::utils::error::ErrorCategory::Server,
                "completion provider returned an unreadable response",
            )
            .with_detail(e.to_string())
        })?;

        let choice = wire.choices.into_iter().next().ok_or_else(|| {
            GatewayError::provider(
                crate::utils::error::ErrorCategory::Server,
                "completion provider returned no choices",
            )
        })?;
        let usage = wire.usage.unwrap_or(WireUsage {
            prompt_tokens: 0,
            completion_tokens: 0,
            total_tokens: 0,
        });

        Ok(CompletionResponse {
            content: choice.message.content.unwrap_or_default(),
            tokens: TokenUsage {
                prompt_tokens: usage.prompt_tokens,
                completion_tokens: usage.completion_tokens,
                total_tokens: usage.total_tokens,
            },
            model: wire.model.unwrap_or_else(|| model.to_string()),
            finish_reason: choice.finish_reason.unwrap_or_else(|| "stop".to_string()),
        })
    }

    async fn ping(&self) -> Result<Duration> {
        let started = Instant::now();
        let response = self
            .http
            .get(format!("{}/models", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .send()
            .await
            .map_err(|e| {
                GatewayError::provider(classify_transport(&e), "completion ping failed")
                    .with_detail(e.to_string())
            })?;

        if !response.status().is_success() {
            return Err(self.read_error(response).await);
        }
        Ok(started.elapsed())
    }
}
