//! CLI module - Command-line interface definitions and handlers
//!
//! Uses clap v4 with derive macros for argument parsing.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub mod commands;
pub mod output;

/// finhub - Financial glossary search with hybrid keyword + semantic retrieval
#[derive(Parser, Debug)]
#[command(name = "finhub")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable JSON output for machine consumption
    #[arg(long, short = 'm', visible_alias = "machine", global = true)]
    pub robot: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress log output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file path (default: ~/.config/finhub/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Search the glossary (keyword + semantic, reranked)
    Search(commands::search::SearchArgs),

    /// Show one glossary term
    Show(commands::show::ShowArgs),

    /// Soft-delete a term so retrieval no longer returns it
    Delete(commands::delete::DeleteArgs),

    /// Restore a soft-deleted term
    Restore(commands::restore::RestoreArgs),

    /// Embed every glossary term for vector search
    Index(commands::index::IndexArgs),

    /// Embed text with the configured backend
    Embed(commands::embed::EmbedArgs),

    /// Show the effective configuration
    Config(commands::config::ConfigArgs),
}
