//! Knowledge retrieval ahead of reasoning.
//!
//! Retrieval is best-effort: the pipeline treats any error as an empty
//! result, so a slow or broken knowledge service never costs the user a
//! reply.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum KnowledgeError {
    #[error("Knowledge request failed: {0}")]
    Request(String),
    #[error("Knowledge service error ({status}): {body}")]
    Service { status: u16, body: String },
    #[error("Knowledge retrieval timed out after {0:?}")]
    Timeout(Duration),
}

/// Ranked snippet search over a set of knowledge bases.
#[async_trait]
pub trait KnowledgeRetriever: Send + Sync {
    /// Return up to `k` snippets for `query`, best first.
    async fn retrieve(
        &self,
        query: &str,
        knowledge_base_ids: &[String],
        k: usize,
    ) -> Result<Vec<String>, KnowledgeError>;
}

/// Retriever used when no knowledge service is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRetriever;

#[async_trait]
impl KnowledgeRetriever for NoopRetriever {
    async fn retrieve(
        &self,
        _query: &str,
        _knowledge_base_ids: &[String],
        _k: usize,
    ) -> Result<Vec<String>, KnowledgeError> {
        Ok(Vec::new())
    }
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    knowledge_base_ids: &'a [String],
    k: usize,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    snippets: Vec<String>,
}

/// Retriever backed by an HTTP search endpoint.
///
/// `POST {url}` with `{query, knowledge_base_ids, k}`; the response carries
/// `{snippets: [...]}`.
pub struct HttpKnowledgeRetriever {
    url: String,
    client: Client,
}

impl HttpKnowledgeRetriever {
    pub fn new(url: impl Into<String>) -> Result<Self, KnowledgeError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| KnowledgeError::Request(format!("HTTP client: {e}")))?;
        Ok(Self {
            url: url.into(),
            client,
        })
    }
}

#[async_trait]
impl KnowledgeRetriever for HttpKnowledgeRetriever {
    async fn retrieve(
        &self,
        query: &str,
        knowledge_base_ids: &[String],
        k: usize,
    ) -> Result<Vec<String>, KnowledgeError> {
        if knowledge_base_ids.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let response = self
            .client
            .post(&self.url)
            .json(&SearchRequest {
                query,
                knowledge_base_ids,
                k,
            })
            .send()
            .await
            .map_err(|e| KnowledgeError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(KnowledgeError::Service {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| KnowledgeError::Request(format!("Invalid response: {e}")))?;

        let mut snippets = parsed.snippets;
        snippets.truncate(k);
        debug!(count = snippets.len(), "Knowledge snippets retrieved");
        Ok(snippets)
    }
}
