//! finhub show - Show one glossary term

use clap::Args;
use colored::Colorize;

use crate::app::AppContext;
use crate::cli::output::{self, HumanLayout};
use crate::error::{FhError, Result};
use crate::storage::GlossaryTerm;

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Term label (case-insensitive)
    pub term: String,
}

pub fn run(ctx: &AppContext, args: &ShowArgs) -> Result<()> {
    let term = ctx
        .db
        .get_term_by_label(&args.term)?
        .filter(|term| !term.is_deleted())
        .ok_or_else(|| FhError::TermNotFound(args.term.clone()))?;

    if ctx.robot_mode {
        output::emit_json(&term)
    } else {
        output::emit_human(render_human(&term));
        Ok(())
    }
}

fn render_human(term: &GlossaryTerm) -> HumanLayout {
    let mut layout = HumanLayout::new();
    layout.title(&term.term);
    layout.kv("ID", &term.id);
    layout.kv("Updated", &term.updated_at);
    layout.blank();
    layout.section("Definition");
    layout.push_line(term.definition.clone());

    if let Some(simple) = &term.simplified_explanation {
        layout.blank();
        layout.section("In plain words");
        layout.push_line(simple.clone());
    }

    if let Some(examples) = &term.contextual_examples {
        layout.blank();
        layout.section("Examples");
        match examples {
            serde_json::Value::Object(map) => {
                for (key, value) in map {
                    let text = value.as_str().map_or_else(|| value.to_string(), String::from);
                    layout.push_line(format!("  {} {text}", format!("{key}:").dimmed()));
                }
            }
            other => {
                layout.push_line(format!("  {other}"));
            }
        }
    }
    layout
}
