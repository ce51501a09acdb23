use std::collections::HashSet;

use proptest::prelude::*;

use finhub::search::{
    HashEmbedder, Provenance, RerankConfig, VectorMatch, merge_candidates, rerank,
};
use finhub::storage::GlossaryTerm;
use finhub::test_utils::term;

const LABELS: [&str; 8] = [
    "Hedging",
    "Hedge Fund",
    "Derivative",
    "Bond",
    "Yield Curve",
    "Liquidity",
    "Short Selling",
    "Margin Call",
];

fn pooled(index: usize) -> GlossaryTerm {
    term(&format!("id-{index}"), LABELS[index])
}

fn arb_relational() -> impl Strategy<Value = Vec<GlossaryTerm>> {
    prop::collection::vec(0..LABELS.len(), 0..6)
        .prop_map(|indexes| indexes.into_iter().map(pooled).collect())
}

fn arb_neighbors() -> impl Strategy<Value = Vec<VectorMatch>> {
    prop::collection::vec((0..LABELS.len(), 0.0f32..1.0), 0..8).prop_map(|pairs| {
        pairs
            .into_iter()
            .map(|(index, score)| VectorMatch::new(format!("id-{index}"), score))
            .collect()
    })
}

fn hydrate(neighbors: &[VectorMatch]) -> Vec<GlossaryTerm> {
    let mut seen = HashSet::new();
    neighbors
        .iter()
        .filter(|m| seen.insert(m.id.clone()))
        .filter_map(|m| {
            let index: usize = m.id.trim_start_matches("id-").parse().ok()?;
            Some(pooled(index))
        })
        .collect()
}

fn config(parallel: bool) -> RerankConfig {
    RerankConfig {
        parallel,
        ..RerankConfig::default()
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn merged_labels_are_unique(relational in arb_relational(), neighbors in arb_neighbors()) {
        let hydrated = hydrate(&neighbors);
        let candidates = merge_candidates(relational, &neighbors, hydrated);
        let mut seen = HashSet::new();
        for candidate in &candidates {
            prop_assert!(seen.insert(candidate.label().to_string()));
        }
    }

    #[test]
    fn merge_covers_every_discovered_label(relational in arb_relational(), neighbors in arb_neighbors()) {
        let mut expected: HashSet<String> = relational.iter().map(|t| t.term.clone()).collect();
        expected.extend(hydrate(&neighbors).into_iter().map(|t| t.term));

        let candidates = merge_candidates(relational, &neighbors, hydrate(&neighbors));
        let labels: HashSet<String> = candidates.iter().map(|c| c.label().to_string()).collect();
        prop_assert_eq!(labels, expected);
    }

    #[test]
    fn relational_provenance_wins(relational in arb_relational(), neighbors in arb_neighbors()) {
        let relational_labels: HashSet<String> =
            relational.iter().map(|t| t.term.clone()).collect();
        let candidates = merge_candidates(relational, &neighbors, hydrate(&neighbors));
        for candidate in &candidates {
            prop_assert_eq!(
                candidate.provenance.is_relational(),
                relational_labels.contains(candidate.label())
            );
        }
    }

    #[test]
    fn reranked_scores_never_increase(
        relational in arb_relational(),
        neighbors in arb_neighbors(),
        query in "[a-z]{2,10}( [a-z]{2,10}){0,3}",
    ) {
        let embedder = HashEmbedder::new(64);
        let query_vec = embedder.embed_text(&query);
        let candidates = merge_candidates(relational, &neighbors, hydrate(&neighbors));
        let count = candidates.len();

        let scored = rerank(candidates, Some(&query_vec), &embedder, &config(true));
        prop_assert_eq!(scored.len(), count);
        prop_assert!(scored.windows(2).all(|pair| pair[0].score >= pair[1].score));
    }

    #[test]
    fn vector_scores_pass_through(neighbors in arb_neighbors()) {
        let embedder = HashEmbedder::new(32);
        let query_vec = embedder.embed_text("interest rate");
        let candidates = merge_candidates(Vec::new(), &neighbors, hydrate(&neighbors));

        for scored in rerank(candidates, Some(&query_vec), &embedder, &config(false)) {
            match scored.provenance {
                Provenance::Vector { index_score } => prop_assert_eq!(scored.score, index_score),
                Provenance::Relational => prop_assert!(false, "no relational input"),
            }
        }
    }

    #[test]
    fn ties_keep_discovery_order(relational in arb_relational(), neighbors in arb_neighbors()) {
        // Without a query embedding every relational candidate scores 0 and
        // every flattened neighbor 0.5, so each group is one long tie.
        let embedder = HashEmbedder::new(32);
        let flat: Vec<VectorMatch> = neighbors
            .iter()
            .map(|m| VectorMatch::new(m.id.clone(), 0.5))
            .collect();
        let candidates = merge_candidates(relational, &flat, hydrate(&flat));
        let (vector, relational): (Vec<_>, Vec<_>) = candidates
            .iter()
            .partition(|c| !c.provenance.is_relational());
        let expected: Vec<String> = vector
            .iter()
            .chain(relational.iter())
            .map(|c| c.label().to_string())
            .collect();

        let scored = rerank(candidates.clone(), None, &embedder, &config(true));
        let ordered: Vec<String> = scored.iter().map(|s| s.term.term.clone()).collect();
        prop_assert_eq!(ordered, expected);
    }

    #[test]
    fn parallel_matches_sequential(
        relational in arb_relational(),
        neighbors in arb_neighbors(),
        query in "[a-z]{2,10}( [a-z]{2,10}){0,3}",
    ) {
        let embedder = HashEmbedder::new(48);
        let query_vec = embedder.embed_text(&query);
        let run = |parallel| {
            let candidates = merge_candidates(relational.clone(), &neighbors, hydrate(&neighbors));
            rerank(candidates, Some(&query_vec), &embedder, &config(parallel))
        };
        prop_assert_eq!(run(true), run(false));
    }
}
