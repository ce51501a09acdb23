//! Retrieval orchestrator.
//!
//! `retrieve` runs the relational path and the vector path independently,
//! then merges and reranks. It never fails: a path that errors contributes
//! nothing, and the caller always gets a well-formed (possibly empty) list.

use std::time::Instant;

use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::config::SearchConfig;
use crate::error::Result;
use crate::search::embeddings::Embedder;
use crate::search::keywords::KeywordExtractor;
use crate::search::relational::{TermStore, search_by_keywords};
use crate::search::rerank::{
    Provenance, RerankConfig, ScoredCandidate, merge_candidates, rerank,
};
use crate::search::vector::{VectorMatch, VectorSearch};
use crate::storage::GlossaryTerm;

pub const NO_MATCHES_MESSAGE: &str = "No matches found.";

/// Orchestrator tuning, usually taken from `[search]`.
#[derive(Debug, Clone)]
pub struct RetrievalConfig {
    pub relational_boost: f32,
    /// Cap the merged list at `top_k` (otherwise `top_k` only bounds the
    /// vector fan-out).
    pub truncate_to_top_k: bool,
    pub parallel: bool,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self::from(&SearchConfig::default())
    }
}

impl From<&SearchConfig> for RetrievalConfig {
    fn from(config: &SearchConfig) -> Self {
        Self {
            relational_boost: config.relational_boost,
            truncate_to_top_k: config.truncate_to_top_k,
            parallel: config.parallel,
        }
    }
}

/// One ranked result as exposed to callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub term: String,
    pub definition: String,
    pub simplified_explanation: Option<String>,
    pub contextual_example: Option<JsonValue>,
    pub score: f32,
    /// `relational` or `vector`
    pub source: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_score: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label_similarity: Option<f32>,
}

impl From<ScoredCandidate> for SearchHit {
    fn from(scored: ScoredCandidate) -> Self {
        let index_score = match scored.provenance {
            Provenance::Vector { index_score } => Some(index_score),
            Provenance::Relational => None,
        };
        Self {
            term: scored.term.term,
            definition: scored.term.definition,
            simplified_explanation: scored.term.simplified_explanation,
            contextual_example: scored.term.contextual_examples,
            score: scored.score,
            source: scored.provenance.as_str(),
            index_score,
            label_similarity: scored.label_similarity,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievalResponse {
    pub query: String,
    pub results: Vec<SearchHit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl RetrievalResponse {
    fn new(query: &str, results: Vec<SearchHit>) -> Self {
        let message = results.is_empty().then(|| NO_MATCHES_MESSAGE.to_string());
        Self {
            query: query.to_string(),
            results,
            message,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// Hybrid retriever over injected capabilities.
///
/// The caller owns every capability; the retriever only borrows them for the
/// duration of a request.
pub struct HybridRetriever<'a> {
    extractor: &'a dyn KeywordExtractor,
    store: &'a dyn TermStore,
    embedder: &'a dyn Embedder,
    vector: &'a dyn VectorSearch,
    config: RetrievalConfig,
}

struct VectorPath {
    query_embedding: Option<Vec<f32>>,
    neighbors: Result<(Vec<VectorMatch>, Vec<GlossaryTerm>)>,
}

impl<'a> HybridRetriever<'a> {
    pub fn new(
        extractor: &'a dyn KeywordExtractor,
        store: &'a dyn TermStore,
        embedder: &'a dyn Embedder,
        vector: &'a dyn VectorSearch,
    ) -> Self {
        Self {
            extractor,
            store,
            embedder,
            vector,
            config: RetrievalConfig::default(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: RetrievalConfig) -> Self {
        self.config = config;
        self
    }

    pub const fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Retrieve ranked glossary terms for a free-text query.
    ///
    /// `top_k` bounds the vector fan-out; it caps the merged list only when
    /// `truncate_to_top_k` is set.
    pub fn retrieve(&self, query: &str, top_k: usize) -> RetrievalResponse {
        let started = Instant::now();
        if query.trim().is_empty() {
            tracing::debug!("blank query; skipping retrieval");
            return RetrievalResponse::new(query, Vec::new());
        }

        let keywords = self.extractor.extract(query);
        if keywords.is_empty() {
            tracing::debug!(strategy = self.extractor.name(), "no keywords extracted");
        } else {
            tracing::debug!(?keywords, strategy = self.extractor.name(), "extracted keywords");
        }

        let (relational, vector) = if self.config.parallel {
            rayon::join(
                || search_by_keywords(self.store, &keywords),
                || self.vector_path(query, top_k),
            )
        } else {
            (
                search_by_keywords(self.store, &keywords),
                self.vector_path(query, top_k),
            )
        };

        let relational_failed = relational.is_err();
        let relational = relational.unwrap_or_else(|err| {
            tracing::warn!(
                error = %err,
                upstream = err.is_upstream(),
                "relational path failed; continuing without it"
            );
            Vec::new()
        });

        let VectorPath {
            query_embedding,
            neighbors,
        } = vector;
        let vector_failed = neighbors.is_err();
        let (neighbors, hydrated) = neighbors.unwrap_or_else(|err| {
            tracing::warn!(
                error = %err,
                upstream = err.is_upstream(),
                "vector path failed; continuing without it"
            );
            (Vec::new(), Vec::new())
        });

        if relational_failed && vector_failed {
            tracing::error!(query, "both retrieval paths failed");
        }

        tracing::debug!(
            relational = relational.len(),
            neighbors = neighbors.len(),
            hydrated = hydrated.len(),
            "retrieval paths complete"
        );

        let candidates = merge_candidates(relational, &neighbors, hydrated);
        let rerank_config = RerankConfig {
            relational_boost: self.config.relational_boost,
            limit: self.config.truncate_to_top_k.then_some(top_k),
            parallel: self.config.parallel,
        };
        let scored = rerank(
            candidates,
            query_embedding.as_deref(),
            self.embedder,
            &rerank_config,
        );

        let results: Vec<SearchHit> = scored.into_iter().map(SearchHit::from).collect();
        tracing::info!(
            results = results.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "retrieval complete"
        );
        RetrievalResponse::new(query, results)
    }

    fn vector_path(&self, query: &str, top_k: usize) -> VectorPath {
        let query_embedding = match self.embedder.embed(query) {
            Ok(embedding) => embedding,
            Err(err) => {
                return VectorPath {
                    query_embedding: None,
                    neighbors: Err(err),
                };
            }
        };

        let neighbors = self
            .vector
            .search(&query_embedding, top_k)
            .and_then(|matches| {
                let ids: Vec<String> = matches.iter().map(|m| m.id.clone()).collect();
                let hydrated = self.store.hydrate(&ids)?;
                Ok((matches, hydrated))
            });

        VectorPath {
            query_embedding: Some(query_embedding),
            neighbors,
        }
    }
}
