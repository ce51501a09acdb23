//! End-to-end retrieval over an on-disk glossary, including degraded
//! capability combinations.

use httpmock::prelude::*;
use tempfile::{TempDir, tempdir};

use finhub::config::VectorConfig;
use finhub::search::{
    ApiEmbedder, HashEmbedder, HybridRetriever, PineconeIndex, RakeExtractor, RetrievalConfig,
    VectorIndex, build_vector_search,
};
use finhub::storage::Database;
use finhub::test_utils::{
    FailingStore, FlakyEmbedder, ScriptedVectorIndex, index_terms, sample_terms,
};

const DIMS: usize = 128;

fn on_disk_glossary() -> (TempDir, Database) {
    let dir = tempdir().unwrap();
    let db = Database::open(dir.path().join("glossary.db")).unwrap();
    for term in sample_terms() {
        db.upsert_term(&term).unwrap();
    }
    index_terms(&db, &HashEmbedder::new(DIMS)).unwrap();
    (dir, db)
}

#[test]
fn full_stack_retrieval_over_stored_embeddings() {
    let (_dir, db) = on_disk_glossary();
    let embedder = HashEmbedder::new(DIMS);
    let index = VectorIndex::load(&db, DIMS, "hash").unwrap();
    assert_eq!(index.len(), sample_terms().len());

    let extractor = RakeExtractor::default();
    let retriever = HybridRetriever::new(&extractor, &db, &embedder, &index);
    let response = retriever.retrieve("What is a yield curve?", 3);

    assert_eq!(response.results[0].term, "Yield Curve");
    assert_eq!(response.results[0].source, "relational");
    // Relational hit plus up to three neighbors, minus the duplicate label.
    assert!(response.results.len() <= 4);
    let relational = response
        .results
        .iter()
        .filter(|hit| hit.source == "relational")
        .count();
    assert_eq!(relational, 1);
}

#[test]
fn reopened_database_serves_same_results() {
    let (dir, db) = on_disk_glossary();
    let embedder = HashEmbedder::new(DIMS);
    let extractor = RakeExtractor::default();

    let first = {
        let index = VectorIndex::load(&db, DIMS, "hash").unwrap();
        HybridRetriever::new(&extractor, &db, &embedder, &index).retrieve("bond liquidity", 4)
    };
    drop(db);

    let reopened = Database::open(dir.path().join("glossary.db")).unwrap();
    let index = VectorIndex::load(&reopened, DIMS, "hash").unwrap();
    let second =
        HybridRetriever::new(&extractor, &reopened, &embedder, &index).retrieve("bond liquidity", 4);

    assert_eq!(first, second);
}

#[test]
fn soft_deleted_terms_never_surface() {
    let (_dir, db) = on_disk_glossary();
    assert!(db.soft_delete_term("Bond").unwrap());

    let embedder = HashEmbedder::new(DIMS);
    let index = VectorIndex::load(&db, DIMS, "hash").unwrap();
    let extractor = RakeExtractor::default();
    let retriever = HybridRetriever::new(&extractor, &db, &embedder, &index);

    let response = retriever.retrieve("bond", sample_terms().len());
    assert!(response.results.iter().all(|hit| hit.term != "Bond"));
}

#[test]
fn corrupt_stored_vector_only_loses_that_neighbor() {
    let (_dir, db) = on_disk_glossary();
    let bond = db.get_term_by_label("Bond").unwrap().unwrap();
    db.conn()
        .execute(
            "UPDATE term_embeddings SET embedding = x'0000' WHERE term_id = ?",
            [&bond.id],
        )
        .unwrap();

    let embedder = HashEmbedder::new(DIMS);
    let index = build_vector_search(&VectorConfig::default(), &db, &embedder).unwrap();
    let extractor = RakeExtractor::default();
    let retriever = HybridRetriever::new(&extractor, &db, &embedder, index.as_ref());

    let response = retriever.retrieve("What is Hedging?", sample_terms().len());
    assert_eq!(response.results[0].term, "Hedging");
    assert!(response.results.iter().any(|hit| hit.source == "vector"));
    assert!(
        response
            .results
            .iter()
            .all(|hit| !(hit.term == "Bond" && hit.source == "vector"))
    );
}

#[test]
fn unreadable_embeddings_table_degrades_to_relational() {
    let (_dir, db) = on_disk_glossary();
    db.conn()
        .execute_batch("DROP TABLE term_embeddings;")
        .unwrap();

    let embedder = HashEmbedder::new(DIMS);
    let index = build_vector_search(&VectorConfig::default(), &db, &embedder).unwrap();
    let extractor = RakeExtractor::default();
    let retriever = HybridRetriever::new(&extractor, &db, &embedder, index.as_ref());

    let response = retriever.retrieve("What is Hedging?", 5);
    assert_eq!(response.results.len(), 1);
    assert_eq!(response.results[0].term, "Hedging");
    assert_eq!(response.results[0].source, "relational");
}

#[test]
fn vector_path_down_relational_still_answers() {
    let (_dir, db) = on_disk_glossary();
    let embedder = HashEmbedder::new(DIMS);
    let index = ScriptedVectorIndex::failing();
    let extractor = RakeExtractor::default();
    let retriever = HybridRetriever::new(&extractor, &db, &embedder, &index);

    let response = retriever.retrieve("hedge fund", 5);
    assert_eq!(index.calls(), 1);
    assert!(!response.is_empty());
    assert!(response.results.iter().all(|hit| hit.source == "relational"));
    assert!(response.results.iter().any(|hit| hit.term == "Hedge Fund"));
}

#[test]
fn embedder_down_for_query_relational_scores_zero() {
    let (_dir, db) = on_disk_glossary();
    let query = "liquidity";
    let embedder = FlakyEmbedder::new(DIMS).fail_on(query);
    let index = VectorIndex::load(&db, DIMS, "hash").unwrap();
    let extractor = RakeExtractor::default();
    let retriever = HybridRetriever::new(&extractor, &db, &embedder, &index);

    let response = retriever.retrieve(query, 5);
    assert_eq!(response.results.len(), 1);
    assert_eq!(response.results[0].term, "Liquidity");
    assert_eq!(response.results[0].score, 0.0);
    assert!(response.results[0].label_similarity.is_none());
}

#[test]
fn store_down_yields_empty_response_not_error() {
    let embedder = HashEmbedder::new(DIMS);
    let index = ScriptedVectorIndex::failing();
    let extractor = RakeExtractor::default();
    let retriever = HybridRetriever::new(&extractor, &FailingStore, &embedder, &index);

    let response = retriever.retrieve("derivative", 5);
    assert!(response.is_empty());
    assert_eq!(response.message.as_deref(), Some("No matches found."));
}

#[test]
fn remote_providers_failing_fall_back_to_relational() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/embeddings");
        then.status(503).body("overloaded");
    });
    let pinecone_mock = server.mock(|when, then| {
        when.method(POST).path("/query");
        then.status(500);
    });

    let (_dir, db) = on_disk_glossary();
    let embedder =
        ApiEmbedder::new(&server.url("/embeddings"), "test-model", None, DIMS, 5).unwrap();
    let index = PineconeIndex::new(&server.base_url(), "pc-key", None, 5).unwrap();
    let extractor = RakeExtractor::default();
    let retriever = HybridRetriever::new(&extractor, &db, &embedder, &index)
        .with_config(RetrievalConfig {
            parallel: false,
            ..RetrievalConfig::default()
        });

    let response = retriever.retrieve("derivative", 5);

    // Query embedding fails first, so the index is never consulted.
    pinecone_mock.assert_calls(0);
    assert_eq!(response.results.len(), 1);
    assert_eq!(response.results[0].term, "Derivative");
    assert_eq!(response.results[0].score, 0.0);
}

#[test]
fn remote_providers_happy_path() {
    let server = MockServer::start();
    let mut vector = vec![0.0_f32; DIMS];
    vector[0] = 1.0;
    server.mock(|when, then| {
        when.method(POST).path("/embeddings");
        then.status(200).json_body(serde_json::json!({
            "data": [{ "embedding": vector, "index": 0 }]
        }));
    });
    server.mock(|when, then| {
        when.method(POST).path("/query").header("api-key", "pc-key");
        then.status(200).json_body(serde_json::json!({
            "matches": [
                { "id": "term-derivative", "score": 0.82 },
                { "id": "term-unknown", "score": 0.61 },
                { "id": "term-bond", "score": 0.40 }
            ]
        }));
    });

    let (_dir, db) = on_disk_glossary();
    let embedder =
        ApiEmbedder::new(&server.url("/embeddings"), "test-model", None, DIMS, 5).unwrap();
    let index = PineconeIndex::new(&server.base_url(), "pc-key", None, 5).unwrap();
    let extractor = RakeExtractor::default();
    let retriever = HybridRetriever::new(&extractor, &db, &embedder, &index);

    let response = retriever.retrieve("what is the", 3);
    let terms: Vec<&str> = response.results.iter().map(|hit| hit.term.as_str()).collect();
    assert_eq!(terms, ["Derivative", "Bond"]);
    assert!(response.results.iter().all(|hit| hit.source == "vector"));
    assert_eq!(response.results[0].index_score, Some(0.82));
}
