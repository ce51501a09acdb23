use serde_json::json;

use crate::error::Result;
use crate::search::embeddings::Embedder;
use crate::search::indexing::{self, IndexOptions};
use crate::storage::{Database, GlossaryTerm};

/// Minimal active term with a fixed id.
pub fn term(id: &str, label: &str) -> GlossaryTerm {
    GlossaryTerm::new(label, format!("Definition of {label}.")).with_id(id)
}

/// A small financial glossary.
pub fn sample_terms() -> Vec<GlossaryTerm> {
    vec![
        GlossaryTerm::new(
            "Hedging",
            "A risk management strategy that offsets potential losses by taking an opposite position in a related asset.",
        )
        .with_id("term-hedging")
        .with_simplified_explanation("Buying insurance against a bad price move.")
        .with_contextual_examples(json!({
            "example": "An airline buys oil futures to hedge against rising fuel prices."
        })),
        GlossaryTerm::new(
            "Hedge Fund",
            "A pooled investment fund that uses varied strategies to earn active returns.",
        )
        .with_id("term-hedge-fund"),
        GlossaryTerm::new(
            "Derivative",
            "A financial contract whose value depends on an underlying asset, index or rate.",
        )
        .with_id("term-derivative")
        .with_simplified_explanation("A bet on the price of something else."),
        GlossaryTerm::new(
            "Bond",
            "A fixed-income instrument representing a loan made by an investor to a borrower.",
        )
        .with_id("term-bond"),
        GlossaryTerm::new(
            "Yield Curve",
            "A line plotting interest rates of bonds with equal credit quality but differing maturities.",
        )
        .with_id("term-yield-curve"),
        GlossaryTerm::new(
            "Liquidity",
            "The ease with which an asset can be converted into cash without affecting its price.",
        )
        .with_id("term-liquidity"),
    ]
}

/// In-memory database loaded with [`sample_terms`].
pub fn seeded_database() -> Database {
    let db = Database::open_in_memory().expect("open in-memory database");
    for term in sample_terms() {
        db.upsert_term(&term).expect("insert sample term");
    }
    db
}

/// Index every active term with `embedder`. Returns the number of terms
/// embedded.
pub fn index_terms(db: &Database, embedder: &dyn Embedder) -> Result<usize> {
    indexing::index_terms(db, embedder, &IndexOptions::default()).map(|report| report.indexed)
}
