//! Property tests for the merge and rerank engine.

mod rerank_properties;
