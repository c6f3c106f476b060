//! Web search provider client
//!
//! Serper-style JSON search API. Responses are flattened into a small
//! normalized shape; `SearchResponse::fallback` builds the degraded
//! response served when search is unavailable.

use super::{Provider, ProviderKind};
use crate::config::SearchConfig;
use crate::utils::error::{ErrorCategory, GatewayError, Result, classify_status, classify_transport};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::debug;

/// Kind of search to run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchType {
    /// General web results
    #[default]
    Web,
    /// News results
    News,
}

impl SearchType {
    fn endpoint(&self) -> &'static str {
        match self {
            SearchType::Web => "search",
            SearchType::News => "news",
        }
    }
}

impl fmt::Display for SearchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.endpoint())
    }
}

/// A search request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Query text
    pub query: String,
    /// Kind of search; defaults to web
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_type: Option<SearchType>,
    /// Result count override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_results: Option<u32>,
}

/// One search hit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

/// Normalized search response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResponse {
    /// Ranked results; empty in fallback responses
    pub results: Vec<SearchResult>,
    /// Short answer or snippet digest, when the provider offers one
    pub summary: String,
    /// Source URLs in result order
    pub sources: Vec<String>,
    /// True when this response was synthesized because search was unavailable
    pub is_fallback: bool,
}

impl SearchResponse {
    /// Degraded response served when the provider cannot be reached.
    /// Callers can distinguish it via `is_fallback` and degrade gracefully.
    pub fn fallback(reason: &str) -> Self {
        Self {
            results: Vec::new(),
            summary: format!("Search is temporarily unavailable: {}", reason),
            sources: Vec::new(),
            is_fallback: true,
        }
    }
}

#[derive(Debug, Serialize)]
struct WireRequest<'a> {
    q: &'a str,
    num: u32,
}

#[derive(Debug, Deserialize)]
struct WireOrganic {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    snippet: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireAnswerBox {
    #[serde(default)]
    answer: Option<String>,
    #[serde(default)]
    snippet: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireResponse {
    #[serde(default)]
    organic: Vec<WireOrganic>,
    #[serde(default)]
    news: Vec<WireOrganic>,
    #[serde(default)]
    answer_box: Option<WireAnswerBox>,
}

/// HTTP client for the search provider
pub struct SearchClient {
    http: reqwest::Client,
    config: SearchConfig,
}

impl SearchClient {
    pub fn new(config: SearchConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| GatewayError::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { http, config })
    }

    fn resolved_type(&self, request: &SearchRequest) -> SearchType {
        request.search_type.unwrap_or_default()
    }

    fn resolved_num(&self, request: &SearchRequest) -> u32 {
        request.num_results.unwrap_or(self.config.num_results)
    }

    async fn read_error(&self, response: reqwest::Response) -> GatewayError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        let category = classify_status(status, &body);
        GatewayError::provider(category, format!("search provider returned HTTP {}", status))
            .with_detail(body)
    }
}

fn summarize(answer_box: Option<WireAnswerBox>, hits: &[WireOrganic]) -> String {
    if let Some(answer_box) = answer_box {
        if let Some(answer) = answer_box.answer.filter(|a| !a.is_empty()) {
            return answer;
        }
        if let Some(snippet) = answer_box.snippet.filter(|s| !s.is_empty()) {
            return snippet;
        }
    }
    hits.iter()
        .map(|h| h.snippet.as_str())
        .filter(|s| !s.is_empty())
        .take(3)
        .collect::<Vec<_>>()
        .join(" ")
}

#[async_trait]
impl Provider for SearchClient {
    type Request = SearchRequest;
    type Response = SearchResponse;

    fn kind(&self) -> ProviderKind {
        ProviderKind::Search
    }

    fn key_fields(&self, request: &Self::Request) -> Vec<String> {
        vec![
            request.query.clone(),
            self.resolved_type(request).to_string(),
            self.resolved_num(request).to_string(),
        ]
    }

    fn is_degraded(&self, response: &Self::Response) -> bool {
        response.is_fallback
    }

    async fn call(&self, request: &Self::Request) -> Result<Self::Response> {
        let search_type = self.resolved_type(request);
        let body = WireRequest {
            q: &request.query,
            num: self.resolved_num(request),
        };

        debug!(%search_type, "calling search provider");
        let response = self
            .http
            .post(format!("{}/{}", self.config.base_url, search_type.endpoint()))
            .header("X-API-KEY", &self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                GatewayError::provider(classify_transport(&e), "search request failed")
                    .with_detail(e.to_string())
            })?;

        if !response.status().is_success() {
            return Err(self.read_error(response).await);
        }

        let wire: WireResponse = response.json().await.map_err(|e| {
            GatewayError::provider(
                ErrorCategory::Server,
                "search provider returned an unreadable response",
            )
            .with_detail(e.to_string())
        })?;

        let hits = if wire.organic.is_empty() {
            wire.news
        } else {
            wire.organic
        };
        let summary = summarize(wire.answer_box, &hits);
        let results: Vec<SearchResult> = hits
            .into_iter()
            .map(|h| SearchResult {
                title: h.title,
                url: h.link,
                snippet: h.snippet,
            })
            .collect();
        let sources = results.iter().map(|r| r.url.clone()).collect();

        Ok(SearchResponse {
            results,
            summary,
            sources,
            is_fallback: false,
        })
    }

    async fn ping(&self) -> Result<Duration> {
        let started = Instant::now();
        let body = WireRequest { q: "ping", num: 1 };
        let response = self
            .http
            .post(format!("{}/search", self.config.base_url))
            .header("X-API-KEY", &self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                GatewayError::provider(classify_transport(&e), "search ping failed")
                    .with_detail(e.to_string())
            })?;

        if !response.status().is_success() {
            return Err(self.read_error(response).await);
        }
        Ok(started.elapsed())
    }
}
