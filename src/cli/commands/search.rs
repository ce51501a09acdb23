//! finhub search - Hybrid glossary search
//!
//! Keyword lookup and vector search run side by side; the merged candidates
//! are reranked against the query embedding.

use clap::Args;
use colored::Colorize;

use crate::app::AppContext;
use crate::cli::output::{self, HumanLayout};
use crate::error::{FhError, Result};
use crate::search::RetrievalResponse;

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Free-text query
    pub query: String,

    /// Vector search fan-out (default: search.default_top_k)
    #[arg(long, short = 'k')]
    pub top_k: Option<usize>,

    /// Cap the merged result list at top-k
    #[arg(long)]
    pub truncate: bool,
}

pub fn run(ctx: &AppContext, args: &SearchArgs) -> Result<()> {
    let top_k = args.top_k.unwrap_or(ctx.config.search.default_top_k);
    if top_k == 0 {
        return Err(FhError::InvalidQuery(
            "--top-k must be greater than 0".to_string(),
        ));
    }

    let caps = ctx.capabilities()?;
    let mut retriever = ctx.retriever(&caps);
    if args.truncate {
        let mut config = retriever.config().clone();
        config.truncate_to_top_k = true;
        retriever = retriever.with_config(config);
    }

    let response = retriever.retrieve(&args.query, top_k);

    if ctx.robot_mode {
        output::emit_json(&response)
    } else {
        output::emit_human(render_human(&response));
        Ok(())
    }
}

fn render_human(response: &RetrievalResponse) -> HumanLayout {
    let mut layout = HumanLayout::new();
    if let Some(message) = &response.message {
        layout.push_line(message.yellow().to_string());
        return layout;
    }

    layout.title(&format!(
        "{} result(s) for \"{}\"",
        response.results.len(),
        response.query
    ));
    for (rank, hit) in response.results.iter().enumerate() {
        let source = if hit.source == "relational" {
            hit.source.green()
        } else {
            hit.source.cyan()
        };
        layout.push_line(format!(
            "{:>2}. {} {} {}",
            rank + 1,
            hit.term.bold(),
            format!("[{:.3}]", hit.score).dimmed(),
            source
        ));
        layout.push_line(format!("    {}", hit.definition));
        if let Some(simple) = &hit.simplified_explanation {
            layout.push_line(format!("    {} {simple}", "simply:".dimmed()));
        }
    }
    layout
}
