//! SQLite database layer

use std::path::Path;

use half::f16;
use parking_lot::{Mutex, MutexGuard};
use rusqlite::{Connection, Row, params, params_from_iter};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use unicode_normalization::UnicodeNormalization;
use uuid::Uuid;

use crate::error::{FhError, Result};
use crate::storage::migrations;

const TERM_COLUMNS: &str = "id, term, definition, simplified_explanation, contextual_examples, \
                            created_at, updated_at, deleted_at";

/// SQLite database wrapper for the glossary.
///
/// The connection sits behind a mutex so one handle can serve both
/// retrieval paths when they run on different threads.
pub struct Database {
    conn: Mutex<Connection>,
    schema_version: u32,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("schema_version", &self.schema_version)
            .finish_non_exhaustive()
    }
}

/// A glossary entry.
///
/// `term` is the primary label; the store enforces its uniqueness. A non-null
/// `deleted_at` marks the row as soft-deleted and hides it from retrieval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlossaryTerm {
    pub id: String,
    pub term: String,
    pub definition: String,
    pub simplified_explanation: Option<String>,
    pub contextual_examples: Option<JsonValue>,
    pub created_at: String,
    pub updated_at: String,
    pub deleted_at: Option<String>,
}

impl GlossaryTerm {
    /// New active term with a random id and current timestamps.
    pub fn new(term: impl Into<String>, definition: impl Into<String>) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: Uuid::new_v4().to_string(),
            term: term.into(),
            definition: definition.into(),
            simplified_explanation: None,
            contextual_examples: None,
            created_at: now.clone(),
            updated_at: now,
            deleted_at: None,
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    #[must_use]
    pub fn with_simplified_explanation(mut self, text: impl Into<String>) -> Self {
        self.simplified_explanation = Some(text.into());
        self
    }

    #[must_use]
    pub fn with_contextual_examples(mut self, examples: JsonValue) -> Self {
        self.contextual_examples = Some(examples);
        self
    }

    #[must_use]
    pub const fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingRecord {
    pub term_id: String,
    pub embedding: Vec<f32>,
    pub dims: usize,
    pub embedder_type: String,
    pub computed_at: String,
}

impl Database {
    /// Open database at the given path
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        Self::configure_pragmas(&conn)?;
        Self::from_connection(conn)
    }

    /// Open a private in-memory database (tests, benchmarks).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        let schema_version = migrations::run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            schema_version,
        })
    }

    /// Lock the underlying connection.
    pub fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock()
    }

    /// Current schema version after migrations.
    pub const fn schema_version(&self) -> u32 {
        self.schema_version
    }

    pub fn upsert_term(&self, term: &GlossaryTerm) -> Result<()> {
        if term.term.trim().is_empty() {
            return Err(FhError::InvalidTerm("term label must not be empty".to_string()));
        }
        if term.definition.trim().is_empty() {
            return Err(FhError::InvalidTerm(format!(
                "definition for '{}' must not be empty",
                term.term
            )));
        }

        let examples = term
            .contextual_examples
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        self.conn().execute(
            "INSERT INTO glossary (
                id, term, term_folded, definition, simplified_explanation,
                contextual_examples, created_at, updated_at, deleted_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                term=excluded.term,
                term_folded=excluded.term_folded,
                definition=excluded.definition,
                simplified_explanation=excluded.simplified_explanation,
                contextual_examples=excluded.contextual_examples,
                updated_at=excluded.updated_at,
                deleted_at=excluded.deleted_at",
            params![
                term.id,
                term.term,
                fold_label(&term.term),
                term.definition,
                term.simplified_explanation,
                examples,
                term.created_at,
                term.updated_at,
                term.deleted_at,
            ],
        )?;
        Ok(())
    }

    /// Fetch a term by id, including soft-deleted rows.
    pub fn get_term(&self, id: &str) -> Result<Option<GlossaryTerm>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!("SELECT {TERM_COLUMNS} FROM glossary WHERE id = ?"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(term_from_row(row)?));
        }
        Ok(None)
    }

    /// Case-insensitive exact label lookup, including soft-deleted rows.
    pub fn get_term_by_label(&self, label: &str) -> Result<Option<GlossaryTerm>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {TERM_COLUMNS} FROM glossary WHERE term_folded = ? LIMIT 1"
        ))?;
        let mut rows = stmt.query([fold_label(label)])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(term_from_row(row)?));
        }
        Ok(None)
    }

    /// Active terms ordered by label.
    pub fn list_terms(&self, limit: usize, offset: usize) -> Result<Vec<GlossaryTerm>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {TERM_COLUMNS} FROM glossary WHERE deleted_at IS NULL \
             ORDER BY term LIMIT ? OFFSET ?"
        ))?;
        let rows = stmt.query_map(params![limit as i64, offset as i64], term_from_row)?;
        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    /// Number of active (not soft-deleted) terms.
    pub fn count_terms(&self) -> Result<u64> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM glossary WHERE deleted_at IS NULL",
            [],
            |row| row.get(0),
        )?;
        Ok(count.max(0) as u64)
    }

    /// Mark a term deleted. Returns false when no active term has that label.
    pub fn soft_delete_term(&self, label: &str) -> Result<bool> {
        let now = chrono::Utc::now().to_rfc3339();
        let changed = self.conn().execute(
            "UPDATE glossary SET deleted_at = ?, updated_at = ? \
             WHERE term_folded = ? AND deleted_at IS NULL",
            params![now, now, fold_label(label)],
        )?;
        Ok(changed > 0)
    }

    /// Clear the deletion marker. Returns false when no deleted term has that label.
    pub fn restore_term(&self, label: &str) -> Result<bool> {
        let now = chrono::Utc::now().to_rfc3339();
        let changed = self.conn().execute(
            "UPDATE glossary SET deleted_at = NULL, updated_at = ? \
             WHERE term_folded = ? AND deleted_at IS NOT NULL",
            params![now, fold_label(label)],
        )?;
        Ok(changed > 0)
    }

    /// Active terms whose label contains any keyword, case-insensitively.
    ///
    /// Blank keywords are ignored; with none left no query is issued.
    pub fn search_by_keywords(&self, keywords: &[String]) -> Result<Vec<GlossaryTerm>> {
        let folded: Vec<String> = keywords
            .iter()
            .map(|kw| fold_label(kw.trim()))
            .filter(|kw| !kw.is_empty())
            .collect();
        if folded.is_empty() {
            return Ok(Vec::new());
        }

        let predicate = vec!["instr(term_folded, ?) > 0"; folded.len()].join(" OR ");
        let sql = format!(
            "SELECT {TERM_COLUMNS} FROM glossary \
             WHERE deleted_at IS NULL AND ({predicate}) ORDER BY term"
        );

        let conn = self.conn();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(folded.iter()), term_from_row)?;
        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    /// Active terms for the given ids. Unknown and soft-deleted ids are omitted;
    /// result order is unspecified.
    pub fn get_terms_by_ids(&self, ids: &[String]) -> Result<Vec<GlossaryTerm>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!(
            "SELECT {TERM_COLUMNS} FROM glossary \
             WHERE deleted_at IS NULL AND id IN ({placeholders})"
        );

        let conn = self.conn();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(ids.iter()), term_from_row)?;
        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    pub fn upsert_embedding(&self, record: &EmbeddingRecord) -> Result<()> {
        if record.embedding.len() != record.dims {
            return Err(FhError::Serialization(format!(
                "embedding dims mismatch: expected {}, got {}",
                record.dims,
                record.embedding.len()
            )));
        }

        let encoded = encode_embedding_f16(&record.embedding);
        let computed_at = if record.computed_at.is_empty() {
            chrono::Utc::now().to_rfc3339()
        } else {
            record.computed_at.clone()
        };

        self.conn().execute(
            "INSERT INTO term_embeddings (term_id, embedding, dims, embedder_type, computed_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(term_id) DO UPDATE SET
                embedding=excluded.embedding,
                dims=excluded.dims,
                embedder_type=excluded.embedder_type,
                computed_at=excluded.computed_at",
            params![
                record.term_id,
                encoded,
                record.dims as i64,
                record.embedder_type,
                computed_at,
            ],
        )?;
        Ok(())
    }

    pub fn get_embedding(&self, term_id: &str) -> Result<Option<EmbeddingRecord>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT term_id, embedding, dims, embedder_type, computed_at
             FROM term_embeddings WHERE term_id = ?",
        )?;
        let mut rows = stmt.query([term_id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(embedding_from_row(row)?));
        }
        Ok(None)
    }

    /// Stored vectors from one embedder at the given dimensionality, keyed by
    /// term id. Rows whose blob does not decode are skipped with a warning.
    pub fn get_all_embeddings(
        &self,
        dims: usize,
        embedder_type: &str,
    ) -> Result<Vec<(String, Vec<f32>)>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT term_id, embedding, dims, embedder_type, computed_at
             FROM term_embeddings WHERE dims = ? AND embedder_type = ? ORDER BY term_id",
        )?;
        let mut rows = stmt.query(params![dims as i64, embedder_type])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            match embedding_from_row(row) {
                Ok(record) => out.push((record.term_id, record.embedding)),
                Err(err) => {
                    let term_id: String = row.get(0).unwrap_or_default();
                    tracing::warn!(
                        term_id = %term_id,
                        error = %err,
                        "skipping unreadable stored embedding"
                    );
                }
            }
        }
        Ok(out)
    }

    fn configure_pragmas(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA cache_size = -16000;
             PRAGMA temp_store = MEMORY;
             PRAGMA foreign_keys = ON;",
        )?;
        Ok(())
    }
}

/// Case folding used for label matching on both sides of the predicate.
pub fn fold_label(label: &str) -> String {
    label.nfkc().collect::<String>().to_lowercase()
}

fn term_from_row(row: &Row<'_>) -> rusqlite::Result<GlossaryTerm> {
    let examples: Option<String> = row.get(4)?;
    let contextual_examples = examples
        .map(|raw| serde_json::from_str::<JsonValue>(&raw))
        .transpose()
        .map_err(|err| {
            rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(err))
        })?;

    Ok(GlossaryTerm {
        id: row.get(0)?,
        term: row.get(1)?,
        definition: row.get(2)?,
        simplified_explanation: row.get(3)?,
        contextual_examples,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
        deleted_at: row.get(7)?,
    })
}

fn embedding_from_row(row: &Row<'_>) -> Result<EmbeddingRecord> {
    let term_id: String = row.get(0)?;
    let blob: Vec<u8> = row.get(1)?;
    let dims: i64 = row.get(2)?;
    let embedder_type: String = row.get(3)?;
    let computed_at: String = row.get(4)?;

    let dims = usize::try_from(dims).unwrap_or(0);
    let embedding = decode_embedding_f16(&blob, dims)?;

    Ok(EmbeddingRecord {
        term_id,
        embedding,
        dims,
        embedder_type,
        computed_at,
    })
}

fn encode_embedding_f16(values: &[f32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(values.len() * 2);
    for value in values {
        let bits = f16::from_f32(*value).to_bits();
        out.extend_from_slice(&bits.to_le_bytes());
    }
    out
}

fn decode_embedding_f16(bytes: &[u8], dims: usize) -> Result<Vec<f32>> {
    let expected = dims.saturating_mul(2);
    if bytes.len() != expected {
        return Err(FhError::Serialization(format!(
            "embedding blob length mismatch: expected {}, got {}",
            expected,
            bytes.len()
        )));
    }

    let mut out = Vec::with_capacity(dims);
    for chunk in bytes.chunks_exact(2) {
        let bits = u16::from_le_bytes([chunk[0], chunk[1]]);
        out.push(f16::from_bits(bits).to_f32());
    }
    Ok(out)
}
