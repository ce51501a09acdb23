//! Shared test utilities for finhub.
//!
//! Deterministic doubles for every capability the retriever consumes, plus
//! glossary fixtures.

pub mod fixtures;

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::error::{FhError, Result};
use crate::search::embeddings::{Embedder, HashEmbedder};
use crate::search::relational::TermStore;
use crate::search::vector::{VectorMatch, VectorSearch};
use crate::storage::GlossaryTerm;

pub use fixtures::{index_terms, sample_terms, seeded_database, term};

/// Hash embedder that fails for chosen texts.
#[derive(Debug, Clone)]
pub struct FlakyEmbedder {
    inner: HashEmbedder,
    failing: HashSet<String>,
}

impl FlakyEmbedder {
    pub fn new(dims: usize) -> Self {
        Self {
            inner: HashEmbedder::new(dims),
            failing: HashSet::new(),
        }
    }

    #[must_use]
    pub fn fail_on(mut self, text: &str) -> Self {
        self.failing.insert(text.to_string());
        self
    }

    pub const fn inner(&self) -> &HashEmbedder {
        &self.inner
    }
}

impl Embedder for FlakyEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if self.failing.contains(text) {
            return Err(FhError::EmbeddingUnavailable(format!(
                "scripted failure for '{text}'"
            )));
        }
        Ok(self.inner.embed_text(text))
    }

    fn dims(&self) -> usize {
        self.inner.dims()
    }

    fn name(&self) -> &str {
        "flaky"
    }
}

/// Embedder with a fixed text-to-vector table. Unknown text fails.
#[derive(Debug, Clone, Default)]
pub struct TableEmbedder {
    dims: usize,
    vectors: HashMap<String, Vec<f32>>,
}

impl TableEmbedder {
    pub fn new(dims: usize) -> Self {
        Self {
            dims,
            vectors: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.vectors.insert(text.to_string(), vector);
        self
    }

    /// Table entry for `text`; empty when absent.
    pub fn vector(&self, text: &str) -> Vec<f32> {
        self.vectors.get(text).cloned().unwrap_or_default()
    }
}

impl Embedder for TableEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.vectors
            .get(text)
            .cloned()
            .ok_or_else(|| FhError::EmbeddingUnavailable(format!("no vector for '{text}'")))
    }

    fn dims(&self) -> usize {
        self.dims
    }

    fn name(&self) -> &str {
        "table"
    }
}

/// Store wrapper counting how often each operation reaches the inner store.
pub struct CountingStore<S> {
    inner: S,
    label_queries: AtomicUsize,
    hydrations: AtomicUsize,
}

impl<S: TermStore> CountingStore<S> {
    pub const fn new(inner: S) -> Self {
        Self {
            inner,
            label_queries: AtomicUsize::new(0),
            hydrations: AtomicUsize::new(0),
        }
    }

    pub const fn inner(&self) -> &S {
        &self.inner
    }

    pub fn label_queries(&self) -> usize {
        self.label_queries.load(Ordering::SeqCst)
    }

    pub fn hydrations(&self) -> usize {
        self.hydrations.load(Ordering::SeqCst)
    }
}

impl<S: TermStore> TermStore for CountingStore<S> {
    fn find_by_labels(&self, keywords: &[String]) -> Result<Vec<GlossaryTerm>> {
        self.label_queries.fetch_add(1, Ordering::SeqCst);
        self.inner.find_by_labels(keywords)
    }

    fn hydrate(&self, ids: &[String]) -> Result<Vec<GlossaryTerm>> {
        self.hydrations.fetch_add(1, Ordering::SeqCst);
        self.inner.hydrate(ids)
    }
}

/// Store whose every call fails like an unreachable database.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingStore;

impl TermStore for FailingStore {
    fn find_by_labels(&self, _keywords: &[String]) -> Result<Vec<GlossaryTerm>> {
        Err(FhError::Database(rusqlite::Error::InvalidQuery))
    }

    fn hydrate(&self, _ids: &[String]) -> Result<Vec<GlossaryTerm>> {
        Err(FhError::Database(rusqlite::Error::InvalidQuery))
    }
}

/// Vector index returning a fixed neighbor list (truncated to `k`), or failing.
#[derive(Debug, Default)]
pub struct ScriptedVectorIndex {
    matches: Vec<VectorMatch>,
    fail: bool,
    calls: AtomicUsize,
    last_k: Mutex<Option<usize>>,
}

impl ScriptedVectorIndex {
    pub fn new(matches: Vec<VectorMatch>) -> Self {
        Self {
            matches,
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_k(&self) -> Option<usize> {
        *self.last_k.lock()
    }
}

impl VectorSearch for ScriptedVectorIndex {
    fn search(&self, _vector: &[f32], k: usize) -> Result<Vec<VectorMatch>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_k.lock() = Some(k);
        if self.fail {
            return Err(FhError::VectorSearch("scripted index failure".to_string()));
        }
        Ok(self.matches.iter().take(k).cloned().collect())
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
