//! finhub index - Embed glossary terms for vector search
//!
//! Writes one vector per active term to the local store. With the Pinecone
//! backend the stored vectors are also pushed to the hosted index.

use clap::Args;
use colored::Colorize;
use serde::Serialize;

use crate::app::AppContext;
use crate::cli::output::{self, HumanLayout};
use crate::error::Result;
use crate::search::{IndexOptions, IndexReport, PineconeIndex, build_embedder, index_terms};

#[derive(Args, Debug)]
pub struct IndexArgs {
    /// Only embed terms without a current vector from this embedder
    #[arg(long)]
    pub missing: bool,
}

#[derive(Debug, Serialize)]
struct IndexOutput {
    status: &'static str,
    embedder: String,
    dimensions: usize,
    #[serde(flatten)]
    report: IndexReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pushed: Option<usize>,
}

pub fn run(ctx: &AppContext, args: &IndexArgs) -> Result<()> {
    let embedder = build_embedder(&ctx.config.embedding)?;
    let options = IndexOptions {
        missing_only: args.missing,
    };
    let report = index_terms(&ctx.db, embedder.as_ref(), &options)?;

    let pushed = if ctx.config.vector.backend.trim().eq_ignore_ascii_case("pinecone") {
        let pinecone = PineconeIndex::from_config(&ctx.config.vector)?;
        let vectors = ctx.db.get_all_embeddings(embedder.dims(), embedder.name())?;
        Some(pinecone.upsert(&vectors)?)
    } else {
        None
    };

    let out = IndexOutput {
        status: "ok",
        embedder: embedder.name().to_string(),
        dimensions: embedder.dims(),
        report,
        pushed,
    };

    if ctx.robot_mode {
        output::emit_json(&out)
    } else {
        output::emit_human(render_human(&out));
        Ok(())
    }
}

fn render_human(out: &IndexOutput) -> HumanLayout {
    let mut layout = HumanLayout::new();
    layout.section("Index");
    layout.kv("Embedder", &format!("{} ({} dims)", out.embedder.cyan(), out.dimensions));
    layout.kv("Indexed", &out.report.indexed.to_string());
    if out.report.skipped > 0 {
        layout.kv("Up to date", &out.report.skipped.to_string());
    }
    if out.report.failed > 0 {
        layout.kv("Failed", &out.report.failed.to_string().red().to_string());
    }
    if let Some(pushed) = out.pushed {
        layout.kv("Pinecone", &pushed.to_string());
    }
    layout
}
