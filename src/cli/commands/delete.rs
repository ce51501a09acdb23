//! finhub delete - Soft-delete a glossary term

use clap::Args;
use colored::Colorize;

use crate::app::AppContext;
use crate::cli::output;
use crate::error::{FhError, Result};

#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Term label (case-insensitive)
    pub term: String,
}

pub fn run(ctx: &AppContext, args: &DeleteArgs) -> Result<()> {
    if !ctx.db.soft_delete_term(&args.term)? {
        return Err(FhError::TermNotFound(args.term.clone()));
    }
    tracing::info!(term = %args.term, "term soft-deleted");

    if ctx.robot_mode {
        output::emit_json(&serde_json::json!({
            "status": "ok",
            "term": args.term,
            "deleted": true,
        }))
    } else {
        println!("{} Deleted '{}'", "✓".green(), args.term);
        Ok(())
    }
}
