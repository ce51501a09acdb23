//! OpenAI-compatible HTTP embedding backend.

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};

use crate::config::EmbeddingConfig;
use crate::error::{FhError, Result};
use crate::search::embeddings::Embedder;

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: usize,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

/// Embedder backed by a `/v1/embeddings` style endpoint.
pub struct ApiEmbedder {
    endpoint: String,
    model: String,
    dims: usize,
    client: reqwest::blocking::Client,
}

impl std::fmt::Debug for ApiEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiEmbedder")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("dims", &self.dims)
            .finish_non_exhaustive()
    }
}

impl ApiEmbedder {
    /// Build from `[embedding]` config, reading the key from `api_key_env`.
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self> {
        if config.api_url.trim().is_empty() {
            return Err(FhError::MissingConfig("embedding.api_url".to_string()));
        }
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty());
        if api_key.is_none() {
            return Err(FhError::MissingConfig(config.api_key_env.clone()));
        }
        Self::new(
            &config.api_url,
            &config.model,
            api_key.as_deref(),
            config.dims as usize,
            config.timeout_secs,
        )
    }

    pub fn new(
        endpoint: &str,
        model: &str,
        api_key: Option<&str>,
        dims: usize,
        timeout_secs: u64,
    ) -> Result<Self> {
        if endpoint.starts_with("http://") && api_key.is_some() {
            tracing::warn!(endpoint, "embedding endpoint uses unencrypted HTTP");
        }

        let mut headers = HeaderMap::new();
        if let Some(key) = api_key {
            let value = HeaderValue::from_str(&format!("Bearer {key}"))
                .map_err(|err| FhError::Config(format!("invalid embedding API key: {err}")))?;
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs.max(1)))
            .default_headers(headers)
            .build()
            .map_err(|err| FhError::Config(format!("embedding http client: {err}")))?;

        Ok(Self {
            endpoint: endpoint.to_string(),
            model: model.to_string(),
            dims,
            client,
        })
    }
}

impl Embedder for ApiEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let request = EmbeddingRequest {
            model: &self.model,
            input: vec![text],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .map_err(|err| FhError::EmbeddingUnavailable(format!("request failed: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&body)
                .map_or(body, |parsed| parsed.error.message);
            return Err(FhError::EmbeddingUnavailable(format!(
                "HTTP {status}: {detail}"
            )));
        }

        let parsed: EmbeddingResponse = response
            .json()
            .map_err(|err| FhError::EmbeddingUnavailable(format!("response parse: {err}")))?;

        let embedding = parsed
            .data
            .into_iter()
            .min_by_key(|d| d.index)
            .map(|d| d.embedding)
            .ok_or_else(|| FhError::EmbeddingUnavailable("no embedding returned".to_string()))?;

        if embedding.len() != self.dims {
            return Err(FhError::EmbeddingUnavailable(format!(
                "expected {} dims, provider returned {}",
                self.dims,
                embedding.len()
            )));
        }
        Ok(embedding)
    }

    fn dims(&self) -> usize {
        self.dims
    }

    fn name(&self) -> &str {
        "api"
    }
}
