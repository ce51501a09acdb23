//! finhub restore - Undo a soft delete

use clap::Args;
use colored::Colorize;

use crate::app::AppContext;
use crate::cli::output;
use crate::error::{FhError, Result};

#[derive(Args, Debug)]
pub struct RestoreArgs {
    /// Term label (case-insensitive)
    pub term: String,
}

pub fn run(ctx: &AppContext, args: &RestoreArgs) -> Result<()> {
    if !ctx.db.restore_term(&args.term)? {
        return Err(FhError::TermNotFound(args.term.clone()));
    }
    tracing::info!(term = %args.term, "term restored");

    if ctx.robot_mode {
        output::emit_json(&serde_json::json!({
            "status": "ok",
            "term": args.term,
            "deleted": false,
        }))
    } else {
        println!("{} Restored '{}'", "✓".green(), args.term);
        Ok(())
    }
}
