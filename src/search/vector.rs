//! Vector neighbor search.
//!
//! [`VectorSearch`] is the capability the retriever consumes. The default
//! backend is a brute-force cosine index over embeddings stored in SQLite;
//! `pinecone` talks to a hosted index.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::config::VectorConfig;
use crate::error::{FhError, Result};
use crate::search::embeddings::{Embedder, cosine_similarity};
use crate::search::pinecone::PineconeIndex;
use crate::storage::Database;

/// One neighbor reported by a vector index. Higher score is better.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorMatch {
    pub id: String,
    pub score: f32,
}

impl VectorMatch {
    pub fn new(id: impl Into<String>, score: f32) -> Self {
        Self {
            id: id.into(),
            score,
        }
    }
}

/// Nearest-neighbor query capability.
pub trait VectorSearch: Send + Sync {
    /// Up to `k` neighbors ordered by descending score.
    fn search(&self, vector: &[f32], k: usize) -> Result<Vec<VectorMatch>>;

    fn name(&self) -> &str;
}

/// Build the configured vector backend.
///
/// The local index only loads vectors produced by `embedder`. A local index
/// that cannot be loaded becomes an [`UnavailableIndex`], so the failure
/// surfaces per query on the vector path instead of at startup.
pub fn build_vector_search(
    config: &VectorConfig,
    db: &Database,
    embedder: &dyn Embedder,
) -> Result<Box<dyn VectorSearch>> {
    match config.backend.trim().to_lowercase().as_str() {
        "" | "sqlite" => match VectorIndex::load(db, embedder.dims(), embedder.name()) {
            Ok(index) => Ok(Box::new(index)),
            Err(err) => {
                tracing::warn!(error = %err, "local vector index unavailable");
                Ok(Box::new(UnavailableIndex::new("sqlite", err.to_string())))
            }
        },
        "pinecone" => Ok(Box::new(PineconeIndex::from_config(config)?)),
        other => Err(FhError::Config(format!("unknown vector backend: {other}"))),
    }
}

/// In-memory vector index for semantic search
#[derive(Debug, Clone)]
pub struct VectorIndex {
    entries: Vec<(String, Vec<f32>)>,
    positions: HashMap<String, usize>,
    dims: usize,
}

impl VectorIndex {
    /// Create a new empty vector index
    pub fn new(dims: usize) -> Self {
        Self {
            entries: Vec::new(),
            positions: HashMap::new(),
            dims,
        }
    }

    /// Load every stored embedding written by `embedder_type` at `dims`.
    pub fn load(db: &Database, dims: usize, embedder_type: &str) -> Result<Self> {
        let mut index = Self::new(dims);
        for (term_id, embedding) in db.get_all_embeddings(dims, embedder_type)? {
            index.insert(term_id, embedding);
        }
        tracing::debug!(entries = index.len(), dims, embedder_type, "loaded vector index");
        Ok(index)
    }

    pub const fn dims(&self) -> usize {
        self.dims
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert or replace an embedding. Wrong-sized vectors are rejected.
    pub fn insert(&mut self, id: impl Into<String>, embedding: Vec<f32>) -> bool {
        if embedding.len() != self.dims {
            return false;
        }
        let id = id.into();
        if let Some(&pos) = self.positions.get(&id) {
            self.entries[pos].1 = embedding;
        } else {
            self.positions.insert(id.clone(), self.entries.len());
            self.entries.push((id, embedding));
        }
        true
    }
}

/// Stand-in for a backend that failed to come up; every query fails.
#[derive(Debug, Clone)]
pub struct UnavailableIndex {
    backend: &'static str,
    reason: String,
}

impl UnavailableIndex {
    pub fn new(backend: &'static str, reason: impl Into<String>) -> Self {
        Self {
            backend,
            reason: reason.into(),
        }
    }
}

impl VectorSearch for UnavailableIndex {
    fn search(&self, _vector: &[f32], _k: usize) -> Result<Vec<VectorMatch>> {
        Err(FhError::VectorSearch(format!(
            "{} index unavailable: {}",
            self.backend, self.reason
        )))
    }

    fn name(&self) -> &str {
        self.backend
    }
}

impl VectorSearch for VectorIndex {
    fn search(&self, vector: &[f32], k: usize) -> Result<Vec<VectorMatch>> {
        if vector.len() != self.dims {
            return Err(FhError::VectorSearch(format!(
                "query has {} dims, index has {}",
                vector.len(),
                self.dims
            )));
        }
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut scores: Vec<VectorMatch> = self
            .entries
            .iter()
            .map(|(id, emb)| VectorMatch::new(id.clone(), cosine_similarity(vector, emb)))
            .collect();

        scores.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        scores.truncate(k);
        Ok(scores)
    }

    fn name(&self) -> &str {
        "sqlite"
    }
}
