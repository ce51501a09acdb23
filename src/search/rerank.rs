//! Hybrid merge and rerank.
//!
//! Combines relational matches and vector neighbors into one deduplicated,
//! scored, descending list.
//!
//! ## Scoring
//!
//! ```text
//! relational: score = cosine(query, embed(label)) * relational_boost
//! vector:     score = index_score
//! ```
//!
//! The label cosine is computed for every candidate so both kinds sit on the
//! same semantic axis; vector candidates keep the index score as their final
//! score. Ties keep discovery order (relational first, then index rank).

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use rayon::prelude::*;
use serde::Serialize;

use crate::search::embeddings::{Embedder, cosine_similarity};
use crate::search::vector::VectorMatch;
use crate::storage::GlossaryTerm;

/// Default multiplier applied to relational label-cosine scores.
pub const DEFAULT_RELATIONAL_BOOST: f32 = 0.95;

/// Which retrieval path first produced a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum Provenance {
    Relational,
    Vector { index_score: f32 },
}

impl Provenance {
    #[must_use]
    pub const fn is_relational(&self) -> bool {
        matches!(self, Self::Relational)
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Relational => "relational",
            Self::Vector { .. } => "vector",
        }
    }
}

/// A term surviving the merge, before scoring.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub term: GlossaryTerm,
    pub provenance: Provenance,
}

impl Candidate {
    pub fn label(&self) -> &str {
        &self.term.term
    }
}

/// A scored candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    pub term: GlossaryTerm,
    pub provenance: Provenance,
    /// Cosine between the query and the label alone; `None` when the query
    /// itself could not be embedded.
    pub label_similarity: Option<f32>,
    pub score: f32,
}

#[derive(Debug, Clone)]
pub struct RerankConfig {
    pub relational_boost: f32,
    /// Cap on the merged list; `None` keeps every candidate.
    pub limit: Option<usize>,
    /// Embed candidate labels on the rayon pool.
    pub parallel: bool,
}

impl Default for RerankConfig {
    fn default() -> Self {
        Self {
            relational_boost: DEFAULT_RELATIONAL_BOOST,
            limit: None,
            parallel: true,
        }
    }
}

/// Merge both paths into discovery-ordered candidates, deduplicated by label.
///
/// Relational terms come first. Vector neighbors follow in index rank order;
/// neighbors whose id was not hydrated, or whose label is already present,
/// are skipped. A label found by both paths keeps relational provenance.
pub fn merge_candidates(
    relational: Vec<GlossaryTerm>,
    neighbors: &[VectorMatch],
    hydrated: Vec<GlossaryTerm>,
) -> Vec<Candidate> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut candidates = Vec::with_capacity(relational.len() + neighbors.len());

    for term in relational {
        if seen.insert(term.term.clone()) {
            candidates.push(Candidate {
                term,
                provenance: Provenance::Relational,
            });
        }
    }

    let mut by_id: HashMap<String, GlossaryTerm> = hydrated
        .into_iter()
        .map(|term| (term.id.clone(), term))
        .collect();

    for neighbor in neighbors {
        let Some(term) = by_id.remove(&neighbor.id) else {
            continue;
        };
        if !seen.insert(term.term.clone()) {
            tracing::trace!(term = %term.term, "vector neighbor already matched relationally");
            continue;
        }
        candidates.push(Candidate {
            term,
            provenance: Provenance::Vector {
                index_score: neighbor.score,
            },
        });
    }

    candidates
}

/// Score and order candidates.
///
/// A candidate whose label cannot be embedded is dropped. Without a query
/// embedding no label can be compared, so relational candidates score 0.
pub fn rerank(
    candidates: Vec<Candidate>,
    query_embedding: Option<&[f32]>,
    embedder: &dyn Embedder,
    config: &RerankConfig,
) -> Vec<ScoredCandidate> {
    let label_similarities: Vec<Option<Option<f32>>> = match query_embedding {
        Some(query) => {
            let similarity = |candidate: &Candidate| match embedder.embed(candidate.label()) {
                Ok(label_vec) => Some(Some(cosine_similarity(query, &label_vec))),
                Err(err) => {
                    tracing::warn!(
                        term = %candidate.label(),
                        error = %err,
                        "dropping candidate: label embedding failed"
                    );
                    None
                }
            };
            if config.parallel {
                candidates.par_iter().map(similarity).collect()
            } else {
                candidates.iter().map(similarity).collect()
            }
        }
        None => vec![Some(None); candidates.len()],
    };

    let mut scored: Vec<ScoredCandidate> = candidates
        .into_iter()
        .zip(label_similarities)
        .filter_map(|(candidate, label_similarity)| {
            let label_similarity = label_similarity?;
            let score = match candidate.provenance {
                Provenance::Relational => {
                    label_similarity.unwrap_or(0.0) * config.relational_boost
                }
                Provenance::Vector { index_score } => index_score,
            };
            if !score.is_finite() {
                tracing::warn!(term = %candidate.label(), "dropping candidate: non-finite score");
                return None;
            }
            Some(ScoredCandidate {
                term: candidate.term,
                provenance: candidate.provenance,
                label_similarity,
                score,
            })
        })
        .collect();

    // Stable: equal scores keep discovery order.
    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));

    if let Some(limit) = config.limit {
        scored.truncate(limit);
    }
    scored
}
