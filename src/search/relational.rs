//! Relational keyword search over the term store.

use crate::error::Result;
use crate::storage::{Database, GlossaryTerm};

/// Read-only access to glossary terms needed by retrieval.
///
/// Both operations exclude soft-deleted rows. Errors propagate to the caller,
/// which decides how far a failure reaches.
pub trait TermStore: Send + Sync {
    /// Active terms whose label contains any keyword (case-insensitive substring).
    fn find_by_labels(&self, keywords: &[String]) -> Result<Vec<GlossaryTerm>>;

    /// Active terms for the given ids; unknown ids are silently omitted.
    fn hydrate(&self, ids: &[String]) -> Result<Vec<GlossaryTerm>>;
}

impl TermStore for Database {
    fn find_by_labels(&self, keywords: &[String]) -> Result<Vec<GlossaryTerm>> {
        self.search_by_keywords(keywords)
    }

    fn hydrate(&self, ids: &[String]) -> Result<Vec<GlossaryTerm>> {
        self.get_terms_by_ids(ids)
    }
}

/// Relational keyword search. No keywords means no query is issued.
pub fn search_by_keywords(store: &dyn TermStore, keywords: &[String]) -> Result<Vec<GlossaryTerm>> {
    if keywords.is_empty() {
        return Ok(Vec::new());
    }
    let rows = store.find_by_labels(keywords)?;
    tracing::debug!(keywords = keywords.len(), matches = rows.len(), "relational search");
    Ok(rows)
}
