//! Hybrid glossary retrieval
//!
//! Keyword matching against the term store runs beside semantic neighbor
//! search; the two candidate sets are merged and reranked into one list.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                        Search Query                            │
//! └────────────────────────────────────────────────────────────────┘
//!            │                                       │
//!            ▼                                       ▼
//! ┌──────────────────────────┐        ┌──────────────────────────────┐
//! │  KeywordExtractor        │        │  Embedder (query vector)     │
//! │  (RAKE / stopwords)      │        └──────────────────────────────┘
//! └──────────────────────────┘                       │
//!            │                                       ▼
//!            ▼                        ┌──────────────────────────────┐
//! ┌──────────────────────────┐        │  VectorSearch (top_k)        │
//! │  TermStore::find_by_     │        │  + TermStore::hydrate        │
//! │  labels (substring OR)   │        └──────────────────────────────┘
//! └──────────────────────────┘                       │
//!            │                                       │
//!            └──────────────────┬────────────────────┘
//!                               ▼
//!               ┌───────────────────────────────┐
//!               │   Merge & rerank (rerank.rs)  │
//!               └───────────────────────────────┘
//!                               │
//!                               ▼
//!                      Ranked glossary terms
//! ```

pub mod embeddings;
pub mod embeddings_api;
pub mod indexing;
pub mod keywords;
pub mod pinecone;
pub mod relational;
pub mod rerank;
pub mod retrieval;
pub mod vector;

pub use embeddings::{Embedder, HashEmbedder, build_embedder, cosine_similarity};
pub use embeddings_api::ApiEmbedder;
pub use indexing::{IndexOptions, IndexReport, embedding_text, index_terms};
pub use keywords::{KeywordExtractor, RakeExtractor, StopwordExtractor, build_keyword_extractor};
pub use pinecone::PineconeIndex;
pub use relational::TermStore;
pub use rerank::{Candidate, Provenance, RerankConfig, ScoredCandidate, merge_candidates, rerank};
pub use retrieval::{HybridRetriever, RetrievalConfig, RetrievalResponse, SearchHit};
pub use vector::{UnavailableIndex, VectorIndex, VectorMatch, VectorSearch, build_vector_search};
