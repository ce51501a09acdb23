//! Term indexing: embed every active glossary term and store the vector.
//!
//! Each term is embedded as `term - definition - simplified explanation` and
//! written to `term_embeddings`, which the local vector index loads at
//! startup. A term whose embedding fails is skipped and counted.

use serde::Serialize;

use crate::error::Result;
use crate::search::embeddings::Embedder;
use crate::storage::{Database, EmbeddingRecord, GlossaryTerm};

#[derive(Debug, Clone, Copy, Default)]
pub struct IndexOptions {
    /// Leave terms alone that already carry a readable vector from the
    /// same embedder at the same width.
    pub missing_only: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IndexReport {
    pub indexed: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Text embedded for a term.
pub fn embedding_text(term: &GlossaryTerm) -> String {
    format!(
        "{} - {} - {}",
        term.term,
        term.definition,
        term.simplified_explanation.as_deref().unwrap_or_default()
    )
}

pub fn index_terms(
    db: &Database,
    embedder: &dyn Embedder,
    options: &IndexOptions,
) -> Result<IndexReport> {
    let count = usize::try_from(db.count_terms()?).unwrap_or(usize::MAX);
    let terms = db.list_terms(count, 0)?;
    tracing::info!(terms = terms.len(), embedder = embedder.name(), "indexing glossary terms");

    let mut report = IndexReport::default();
    for term in &terms {
        if options.missing_only && has_current_embedding(db, term, embedder) {
            report.skipped += 1;
            continue;
        }

        let embedding = match embedder.embed(&embedding_text(term)) {
            Ok(embedding) if embedding.len() == embedder.dims() => embedding,
            Ok(embedding) => {
                tracing::warn!(
                    term = %term.term,
                    got = embedding.len(),
                    expected = embedder.dims(),
                    "skipping term: embedding has wrong width"
                );
                report.failed += 1;
                continue;
            }
            Err(err) => {
                tracing::warn!(term = %term.term, error = %err, "skipping term: embedding failed");
                report.failed += 1;
                continue;
            }
        };

        db.upsert_embedding(&EmbeddingRecord {
            term_id: term.id.clone(),
            dims: embedding.len(),
            embedding,
            embedder_type: embedder.name().to_string(),
            computed_at: String::new(),
        })?;
        report.indexed += 1;
    }

    tracing::info!(
        indexed = report.indexed,
        skipped = report.skipped,
        failed = report.failed,
        "indexing complete"
    );
    Ok(report)
}

fn has_current_embedding(db: &Database, term: &GlossaryTerm, embedder: &dyn Embedder) -> bool {
    match db.get_embedding(&term.id) {
        Ok(Some(record)) => {
            record.embedder_type == embedder.name() && record.dims == embedder.dims()
        }
        Ok(None) => false,
        Err(err) => {
            tracing::debug!(term = %term.term, error = %err, "stored embedding unreadable; re-indexing");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::embeddings::HashEmbedder;
    use crate::search::vector::VectorIndex;
    use crate::test_utils::{FlakyEmbedder, sample_terms, seeded_database};

    #[test]
    fn embedding_text_joins_fields() {
        let hedging = sample_terms().remove(0);
        let text = embedding_text(&hedging);
        assert!(text.starts_with("Hedging - A risk management strategy"));
        assert!(text.ends_with(" - Buying insurance against a bad price move."));

        let bond = sample_terms().into_iter().find(|t| t.term == "Bond").unwrap();
        assert!(embedding_text(&bond).ends_with(" - "));
    }

    #[test]
    fn indexes_every_active_term() {
        let db = seeded_database();
        db.soft_delete_term("Liquidity").unwrap();
        let embedder = HashEmbedder::new(32);

        let report = index_terms(&db, &embedder, &IndexOptions::default()).unwrap();
        assert_eq!(report.indexed, sample_terms().len() - 1);
        assert_eq!(report.failed, 0);

        let index = VectorIndex::load(&db, 32, "hash").unwrap();
        assert_eq!(index.len(), report.indexed);
    }

    #[test]
    fn embedding_failure_skips_only_that_term() {
        let db = seeded_database();
        let bond = db.get_term_by_label("Bond").unwrap().unwrap();
        let embedder = FlakyEmbedder::new(16).fail_on(&embedding_text(&bond));

        let report = index_terms(&db, &embedder, &IndexOptions::default()).unwrap();
        assert_eq!(report.failed, 1);
        assert_eq!(report.indexed, sample_terms().len() - 1);
        assert!(db.get_embedding(&bond.id).unwrap().is_none());
    }

    #[test]
    fn missing_only_skips_current_vectors() {
        let db = seeded_database();
        let embedder = HashEmbedder::new(16);
        index_terms(&db, &embedder, &IndexOptions::default()).unwrap();

        let bond = db.get_term_by_label("Bond").unwrap().unwrap();
        db.conn()
            .execute(
                "UPDATE term_embeddings SET embedding = x'00' WHERE term_id = ?",
                [&bond.id],
            )
            .unwrap();

        let options = IndexOptions { missing_only: true };
        let report = index_terms(&db, &embedder, &options).unwrap();
        assert_eq!(report.indexed, 1);
        assert_eq!(report.skipped, sample_terms().len() - 1);
        assert_eq!(db.get_embedding(&bond.id).unwrap().unwrap().dims, 16);

        // A different embedder makes every stored vector stale.
        let wider = HashEmbedder::new(24);
        let report = index_terms(&db, &wider, &options).unwrap();
        assert_eq!(report.indexed, sample_terms().len());
    }
}
