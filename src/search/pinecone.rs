//! Pinecone-compatible vector index client.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};

use crate::config::VectorConfig;
use crate::error::{FhError, Result};
use crate::search::vector::{VectorMatch, VectorSearch};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_values: bool,
    include_metadata: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Debug, Deserialize)]
struct QueryMatch {
    id: String,
    #[serde(default)]
    score: f32,
}

#[derive(Debug, Serialize)]
struct UpsertRequest<'a> {
    vectors: Vec<UpsertVector<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct UpsertVector<'a> {
    id: &'a str,
    values: &'a [f32],
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    #[serde(default)]
    upserted_count: usize,
}

/// Vectors per upsert request.
const UPSERT_BATCH: usize = 100;

pub struct PineconeIndex {
    query_url: String,
    upsert_url: String,
    namespace: Option<String>,
    client: reqwest::blocking::Client,
}

impl std::fmt::Debug for PineconeIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PineconeIndex")
            .field("query_url", &self.query_url)
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

impl PineconeIndex {
    pub fn from_config(config: &VectorConfig) -> Result<Self> {
        if config.pinecone_host.trim().is_empty() {
            return Err(FhError::MissingConfig("vector.pinecone_host".to_string()));
        }
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| FhError::MissingConfig(config.api_key_env.clone()))?;
        Self::new(
            &config.pinecone_host,
            &api_key,
            config.namespace.as_deref(),
            config.timeout_secs,
        )
    }

    pub fn new(
        host: &str,
        api_key: &str,
        namespace: Option<&str>,
        timeout_secs: u64,
    ) -> Result<Self> {
        let host = host.trim().trim_end_matches('/');
        let base = if host.starts_with("http://") || host.starts_with("https://") {
            host.to_string()
        } else {
            format!("https://{host}")
        };

        let mut headers = HeaderMap::new();
        let value = HeaderValue::from_str(api_key)
            .map_err(|err| FhError::Config(format!("invalid Pinecone API key: {err}")))?;
        headers.insert("api-key", value);

        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs.max(1)))
            .default_headers(headers)
            .build()
            .map_err(|err| FhError::Config(format!("pinecone http client: {err}")))?;

        Ok(Self {
            query_url: format!("{base}/query"),
            upsert_url: format!("{base}/vectors/upsert"),
            namespace: namespace.map(ToString::to_string),
            client,
        })
    }
}

impl PineconeIndex {
    /// Write `(id, values)` pairs to the index in batches. Returns the number
    /// of vectors the service reports as upserted.
    pub fn upsert(&self, vectors: &[(String, Vec<f32>)]) -> Result<usize> {
        let mut upserted = 0;
        for batch in vectors.chunks(UPSERT_BATCH) {
            let request = UpsertRequest {
                vectors: batch
                    .iter()
                    .map(|(id, values)| UpsertVector { id, values })
                    .collect(),
                namespace: self.namespace.as_deref(),
            };

            let response = self
                .client
                .post(&self.upsert_url)
                .json(&request)
                .send()
                .map_err(|err| FhError::VectorSearch(format!("pinecone upsert failed: {err}")))?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().unwrap_or_default();
                return Err(FhError::VectorSearch(format!(
                    "pinecone upsert HTTP {status}: {body}"
                )));
            }

            let parsed: UpsertResponse = response
                .json()
                .map_err(|err| FhError::VectorSearch(format!("pinecone upsert parse: {err}")))?;
            upserted += parsed.upserted_count;
            tracing::debug!(batch = batch.len(), "pinecone upsert batch");
        }
        Ok(upserted)
    }
}

impl VectorSearch for PineconeIndex {
    fn search(&self, vector: &[f32], k: usize) -> Result<Vec<VectorMatch>> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let request = QueryRequest {
            vector,
            top_k: k,
            include_values: false,
            include_metadata: false,
            namespace: self.namespace.as_deref(),
        };

        let response = self
            .client
            .post(&self.query_url)
            .json(&request)
            .send()
            .map_err(|err| FhError::VectorSearch(format!("pinecone request failed: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(FhError::VectorSearch(format!(
                "pinecone HTTP {status}: {body}"
            )));
        }

        let parsed: QueryResponse = response
            .json()
            .map_err(|err| FhError::VectorSearch(format!("pinecone response parse: {err}")))?;

        let mut matches: Vec<VectorMatch> = parsed
            .matches
            .into_iter()
            .map(|m| VectorMatch::new(m.id, m.score))
            .collect();
        matches.truncate(k);
        Ok(matches)
    }

    fn name(&self) -> &str {
        "pinecone"
    }
}
