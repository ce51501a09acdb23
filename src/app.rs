//! Application context shared by every CLI command.

use std::path::{Path, PathBuf};

use crate::cli::Cli;
use crate::config::Config;
use crate::error::{FhError, Result};
use crate::search::{
    Embedder, HybridRetriever, KeywordExtractor, RetrievalConfig, VectorSearch,
    build_embedder, build_keyword_extractor, build_vector_search,
};
use crate::storage::Database;

pub struct AppContext {
    pub root: PathBuf,
    pub config: Config,
    pub db: Database,
    pub robot_mode: bool,
    pub verbosity: u8,
}

/// Capabilities built from config; a retriever borrows them per request.
pub struct Capabilities {
    pub extractor: Box<dyn KeywordExtractor>,
    pub embedder: Box<dyn Embedder>,
    pub vector: Box<dyn VectorSearch>,
}

impl AppContext {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let root = resolve_root()?;
        let config = Config::load(cli.config.as_deref(), &root)?;
        Self::open(root, config, cli.robot, cli.verbose)
    }

    pub fn open(root: PathBuf, config: Config, robot_mode: bool, verbosity: u8) -> Result<Self> {
        let db_path = config.database_path(&root);
        let db = Database::open(&db_path)?;
        tracing::debug!(path = %db_path.display(), schema = db.schema_version(), "opened glossary database");
        Ok(Self {
            root,
            config,
            db,
            robot_mode,
            verbosity,
        })
    }

    /// Build the keyword extractor, embedder and vector backend from config.
    pub fn capabilities(&self) -> Result<Capabilities> {
        let extractor = build_keyword_extractor(
            &self.config.search.keyword_strategy,
            self.config.search.rake_max_phrase_words,
        )?;
        let embedder = build_embedder(&self.config.embedding)?;
        let vector = build_vector_search(&self.config.vector, &self.db, embedder.as_ref())?;
        Ok(Capabilities {
            extractor,
            embedder,
            vector,
        })
    }

    pub fn retriever<'a>(&'a self, caps: &'a Capabilities) -> HybridRetriever<'a> {
        HybridRetriever::new(
            caps.extractor.as_ref(),
            &self.db,
            caps.embedder.as_ref(),
            caps.vector.as_ref(),
        )
        .with_config(RetrievalConfig::from(&self.config.search))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Data root: `FINHUB_ROOT`, else the platform data dir.
fn resolve_root() -> Result<PathBuf> {
    if let Ok(root) = std::env::var("FINHUB_ROOT") {
        if !root.trim().is_empty() {
            return Ok(PathBuf::from(root));
        }
    }
    dirs::data_dir()
        .map(|dir| dir.join("finhub"))
        .ok_or_else(|| FhError::MissingConfig("FINHUB_ROOT".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn open_creates_database_under_root() {
        let dir = tempdir().unwrap();
        let ctx = AppContext::open(dir.path().to_path_buf(), Config::default(), false, 0).unwrap();
        assert!(dir.path().join("glossary.db").exists());
        assert_eq!(ctx.root(), dir.path());
    }

    #[test]
    fn capabilities_follow_config() {
        let dir = tempdir().unwrap();
        let mut config = Config::default();
        config.search.keyword_strategy = "stopwords".to_string();
        config.embedding.dims = 32;
        let ctx = AppContext::open(dir.path().to_path_buf(), config, false, 0).unwrap();

        let caps = ctx.capabilities().unwrap();
        assert_eq!(caps.extractor.name(), "stopwords");
        assert_eq!(caps.embedder.dims(), 32);
        assert_eq!(caps.vector.name(), "sqlite");

        let response = ctx.retriever(&caps).retrieve("anything", 3);
        assert!(response.is_empty());
    }
}
