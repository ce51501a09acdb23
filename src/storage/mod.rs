//! Storage layer for finhub
//!
//! SQLite holds the glossary terms, their soft-delete markers and the stored
//! term embeddings used by the local vector index.

pub mod migrations;
pub mod sqlite;

pub use sqlite::{Database, EmbeddingRecord, GlossaryTerm, fold_label};
