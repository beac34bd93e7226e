//! Web search with a primary/fallback provider chain.
//!
//! Results are normalized to one schema regardless of which provider
//! answered; providers are strategy objects walked in order until one
//! succeeds.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::cache::TtlCache;

const SEARCH_TIMEOUT: Duration = Duration::from_secs(20);

/// A normalized search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

/// Represents an error from the search layer.
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("query cannot be empty")]
    EmptyQuery,

    /// No provider has a configured credential.
    #[error("no search provider configured (set LANGSEARCH_API_KEY or TAVILY_API_KEY)")]
    NotConfigured,

    /// Every configured provider failed for this query.
    #[error("all configured search providers are unreachable")]
    AllProvidersFailed,

    /// A single provider failed; used inside the chain, not surfaced.
    #[error("search provider {provider} failed: {message}")]
    Provider { provider: &'static str, message: String },
}

/// One search backend in the fallback chain.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Fetches up to `limit` results. An empty list is a successful
    /// (empty) answer, not a failure.
    async fn fetch(
        &self,
        query: &str,
        limit: usize,
        freshness: Option<&str>,
    ) -> Result<Vec<SearchResult>, SearchError>;
}

fn first_string(item: &Value, keys: &[&str]) -> String {
    keys.iter()
        .find_map(|k| item.get(*k).and_then(Value::as_str).filter(|s| !s.is_empty()))
        .unwrap_or_default()
        .to_string()
}

// Providers disagree on both the array key and the per-item field
// names; normalize through a key-preference list.
fn normalize_items(items: &[Value]) -> Vec<SearchResult> {
    items
        .iter()
        .map(|item| SearchResult {
            title: first_string(item, &["title", "name"]),
            url: first_string(item, &["url", "link", "source"]),
            snippet: first_string(item, &["snippet", "summary", "content", "description"]),
        })
        .collect()
}

/// LangSearch web-search API (primary provider).
pub struct LangSearchProvider {
    url: String,
    api_key: String,
    client: Client,
}

impl LangSearchProvider {
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self { url: url.into(), api_key: api_key.into(), client: Client::new() }
    }
}

#[async_trait]
impl SearchProvider for LangSearchProvider {
    fn name(&self) -> &'static str {
        "langsearch"
    }

    async fn fetch(
        &self,
        query: &str,
        limit: usize,
        freshness: Option<&str>,
    ) -> Result<Vec<SearchResult>, SearchError> {
        let mut payload = serde_json::json!({
            "query": query,
            "count": limit,
            "summary": true,
        });
        if let Some(freshness) = freshness {
            payload["freshness"] = Value::String(freshness.to_string());
        }

        let resp = self
            .client
            .post(&self.url)
            .timeout(SEARCH_TIMEOUT)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| SearchError::Provider { provider: self.name(), message: e.to_string() })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(SearchError::Provider {
                provider: self.name(),
                message: format!("HTTP {status}"),
            });
        }

        let data: Value = resp
            .json()
            .await
            .map_err(|e| SearchError::Provider { provider: self.name(), message: e.to_string() })?;
        let items = ["value", "results", "items", "data"]
            .iter()
            .find_map(|k| data.get(*k).and_then(Value::as_array));
        Ok(items.map(|arr| normalize_items(arr)).unwrap_or_default())
    }
}

/// Tavily search API (fallback provider).
pub struct TavilyProvider {
    url: String,
    api_key: String,
    client: Client,
}

impl TavilyProvider {
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self { url: url.into(), api_key: api_key.into(), client: Client::new() }
    }
}

#[async_trait]
impl SearchProvider for TavilyProvider {
    fn name(&self) -> &'static str {
        "tavily"
    }

    async fn fetch(
        &self,
        query: &str,
        limit: usize,
        _freshness: Option<&str>,
    ) -> Result<Vec<SearchResult>, SearchError> {
        let payload = serde_json::json!({
            "query": query,
            "search_depth": "basic",
            "include_answer": false,
            "max_results": limit.max(1),
        });

        let resp = self
            .client
            .post(&self.url)
            .timeout(SEARCH_TIMEOUT)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| SearchError::Provider { provider: self.name(), message: e.to_string() })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(SearchError::Provider {
                provider: self.name(),
                message: format!("HTTP {status}"),
            });
        }

        let data: Value = resp
            .json()
            .await
            .map_err(|e| SearchError::Provider { provider: self.name(), message: e.to_string() })?;
        let items = data.get("results").and_then(Value::as_array);
        Ok(items.map(|arr| normalize_items(arr)).unwrap_or_default())
    }
}

/// Walks an ordered provider list and returns the first success.
pub struct SearchClient {
    providers: Vec<Box<dyn SearchProvider>>,
    cache: TtlCache<(String, usize, Option<String>), Vec<SearchResult>>,
}

impl SearchClient {
    pub fn new(providers: Vec<Box<dyn SearchProvider>>, cache_ttl: Duration) -> Self {
        Self { providers, cache: TtlCache::new(cache_ttl) }
    }

    /// True when at least one provider is configured.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        !self.providers.is_empty()
    }

    pub async fn search(
        &self,
        query: &str,
        limit: usize,
        freshness: Option<&str>,
    ) -> Result<Vec<SearchResult>, SearchError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(SearchError::EmptyQuery);
        }
        if self.providers.is_empty() {
            return Err(SearchError::NotConfigured);
        }

        let key = (query.to_lowercase(), limit, freshness.map(str::to_string));
        if let Some(hit) = self.cache.get(&key) {
            debug!(query = %query, "search cache hit");
            return Ok(hit);
        }

        for provider in &self.providers {
            match provider.fetch(query, limit, freshness).await {
                Ok(results) => {
                    debug!(provider = provider.name(), hits = results.len(), "search succeeded");
                    self.cache.insert(key, results.clone());
                    return Ok(results);
                }
                Err(e) => {
                    warn!(provider = provider.name(), error = %e, "search provider failed");
                }
            }
        }
        Err(SearchError::AllProvidersFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_prefers_the_first_populated_key() {
        let items = vec![
            serde_json::json!({
                "name": "Fallback title",
                "link": "https://example.com/a",
                "content": "body text",
            }),
            serde_json::json!({
                "title": "Primary title",
                "url": "https://example.com/b",
                "snippet": "snippet text",
                "description": "ignored",
            }),
        ];
        let normalized = normalize_items(&items);
        assert_eq!(
            normalized,
            vec![
                SearchResult {
                    title: "Fallback title".to_string(),
                    url: "https://example.com/a".to_string(),
                    snippet: "body text".to_string(),
                },
                SearchResult {
                    title: "Primary title".to_string(),
                    url: "https://example.com/b".to_string(),
                    snippet: "snippet text".to_string(),
                },
            ]
        );
    }

    #[test]
    fn missing_fields_normalize_to_empty_strings() {
        let items = vec![serde_json::json!({ "irrelevant": true })];
        let normalized = normalize_items(&items);
        assert_eq!(normalized[0].title, "");
        assert_eq!(normalized[0].url, "");
        assert_eq!(normalized[0].snippet, "");
    }

    #[tokio::test]
    async fn empty_query_is_rejected_before_any_provider_call() {
        let client = SearchClient::new(Vec::new(), Duration::from_secs(60));
        assert!(matches!(client.search("  ", 5, None).await, Err(SearchError::EmptyQuery)));
    }

    #[tokio::test]
    async fn no_providers_means_not_configured() {
        let client = SearchClient::new(Vec::new(), Duration::from_secs(60));
        assert!(matches!(client.search("rust", 5, None).await, Err(SearchError::NotConfigured)));
        assert!(!client.is_configured());
    }
}
